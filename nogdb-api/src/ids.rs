//! Identifier types shared across the schema catalog, relation index, and data-record store.

use std::fmt;
use std::str::FromStr;

/// Unique, never-reused identifier for a class (vertex or edge type).
///
/// `ClassId::MAX_ALLOCATABLE` reserves the top value the way the original
/// engine reserves `UINT16_MAX - 1`; id `u16::MAX` is never handed out.
pub type ClassId = u16;

/// Unique identifier for a property, shared across the whole database (not per-class).
pub type PropertyId = u16;

/// Unique identifier for a secondary index.
pub type IndexId = u32;

/// Monotonic, per-class identifier for a stored record.
pub type PositionId = u32;

/// Monotonic transaction counter.
pub type TxnId = u64;

/// Monotonic commit-version counter.
pub type VersionId = u64;

/// Upper bound on allocatable class ids. `u16::MAX` itself is reserved and never assigned.
pub const MAX_CLASS_ID: ClassId = ClassId::MAX - 1;

/// Position ids wrap at `u32::MAX`; the allocator refuses to hand out a position beyond this.
pub const MAX_POSITION_ID: PositionId = PositionId::MAX;

/// The persistent identity of a single vertex or edge record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordId {
    pub class_id: ClassId,
    pub position_id: PositionId,
}

impl RecordId {
    pub fn new(class_id: ClassId, position_id: PositionId) -> Self {
        RecordId {
            class_id,
            position_id,
        }
    }

    /// Parses the `"<classId>:<positionId>"` textual form.
    ///
    /// Mirrors the original engine's leniency: a key that does not split into
    /// exactly two parts is not an error here, it yields the default
    /// (zero, zero) record id rather than failing. Callers that need strict
    /// validation should check the result against `RecordId::default()`.
    pub fn parse(s: &str) -> RecordId {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 2 {
            return RecordId::default();
        }
        let class_id = match parts[0].parse::<ClassId>() {
            Ok(v) => v,
            Err(_) => return RecordId::default(),
        };
        let position_id = match parts[1].parse::<PositionId>() {
            Ok(v) => v,
            Err(_) => return RecordId::default(),
        };
        RecordId::new(class_id, position_id)
    }
}

impl Default for RecordId {
    fn default() -> Self {
        RecordId {
            class_id: 0,
            position_id: 0,
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.class_id, self.position_id)
    }
}

impl FromStr for RecordId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(RecordId::parse(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_id_round_trips_through_text() {
        let rid = RecordId::new(12, 345);
        assert_eq!(rid.to_string(), "12:345");
        assert_eq!(RecordId::parse("12:345"), rid);
    }

    #[test]
    fn malformed_key_falls_back_to_default() {
        assert_eq!(RecordId::parse("not-a-rid"), RecordId::default());
        assert_eq!(RecordId::parse("1:2:3"), RecordId::default());
        assert_eq!(RecordId::parse(""), RecordId::default());
    }
}
