//! Event identifiers.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;

/// Opaque, globally unique identifier of one stored event.
///
/// Freshly generated ids are UUIDv7 strings (time-ordered), but the store
/// treats the value as opaque: ids written by older deployments are accepted
/// as long as they are non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    /// Create a new identifier.
    ///
    /// Uses UUIDv7. Prefer an injected [`crate::IdGenerator`] in tests for
    /// determinism.
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for EventId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Uuid> for EventId {
    fn from(value: Uuid) -> Self {
        Self(value.to_string())
    }
}

impl FromStr for EventId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(CoreError::invalid_id("EventId: empty"));
        }
        Ok(Self(trimmed.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_distinct() {
        let a = EventId::new();
        let b = EventId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn parse_rejects_blank() {
        assert!("  ".parse::<EventId>().is_err());
        assert_eq!("abc".parse::<EventId>().unwrap().as_str(), "abc");
    }

    #[test]
    fn serializes_as_plain_string() {
        let id: EventId = "evt-1".parse().unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"evt-1\"");
    }
}
