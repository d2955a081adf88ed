use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::EntityId;

/// One membership spell of an entity in an index.
///
/// An entity may join, leave and rejoin, so `entity_id` is not unique across
/// events. `left_date == None` means the entity is still a member as of the
/// data snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MembershipEvent {
    pub entity_id: EntityId,
    pub joined_date: Option<NaiveDate>,
    pub left_date: Option<NaiveDate>,
}

impl MembershipEvent {
    pub fn new(
        entity_id: impl Into<EntityId>,
        joined_date: Option<NaiveDate>,
        left_date: Option<NaiveDate>,
    ) -> Self {
        Self {
            entity_id: entity_id.into(),
            joined_date,
            left_date,
        }
    }

    /// Open-ended membership: no recorded exit.
    pub fn is_open_ended(&self) -> bool {
        self.left_date.is_none()
    }

    /// `joined_date <= left_date` whenever both are present.
    pub fn is_well_formed(&self) -> bool {
        match (self.joined_date, self.left_date) {
            (Some(joined), Some(left)) => joined <= left,
            _ => true,
        }
    }

    /// Same spell dates, ignoring the key.
    pub fn same_spell(&self, other: &MembershipEvent) -> bool {
        self.joined_date == other.joined_date && self.left_date == other.left_date
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, day)
    }

    #[test]
    fn open_ended_when_no_exit() {
        let e = MembershipEvent::new("001690", d(1982, 8, 31), None);
        assert!(e.is_open_ended());
        assert!(e.is_well_formed());
    }

    #[test]
    fn inverted_spell_is_not_well_formed() {
        let e = MembershipEvent::new("001690", d(2010, 1, 1), d(2000, 1, 1));
        assert!(!e.is_well_formed());
    }

    #[test]
    fn same_spell_ignores_key() {
        let a = MembershipEvent::new("A", d(2000, 1, 1), None);
        let b = MembershipEvent::new("B", d(2000, 1, 1), None);
        assert!(a.same_spell(&b));
        assert_ne!(a, b);
    }
}
