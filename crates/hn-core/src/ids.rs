use core::fmt;
use core::num::NonZeroU32;

/// Arena slot of an item inside a network.
///
/// - `u32` keeps connection maps small
/// - `NonZero` lets `Option<ItemId>` stay the size of `ItemId`
///
/// Slots are never reused, so a stale id can only miss, never alias.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(NonZeroU32);

impl ItemId {
    /// Create an id from a 0-based slot index by storing index+1.
    pub fn from_index(index: u32) -> Self {
        Self(NonZeroU32::MIN.saturating_add(index))
    }

    /// Recover the 0-based slot index.
    pub fn index(self) -> u32 {
        self.0.get() - 1
    }
}

impl fmt::Debug for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ItemId({})", self.index())
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index())
    }
}

/// Persistent item identity as stored in case and record files.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ItemKey(pub i32);

impl ItemKey {
    /// Sentinel for an item that has not been given a key yet.
    pub const UNASSIGNED: ItemKey = ItemKey(-999);

    pub fn is_assigned(self) -> bool {
        self != Self::UNASSIGNED
    }

    pub fn value(self) -> i32 {
        self.0
    }
}

impl Default for ItemKey {
    fn default() -> Self {
        Self::UNASSIGNED
    }
}

impl fmt::Debug for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ItemKey({})", self.0)
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for ItemKey {
    fn from(v: i32) -> Self {
        Self(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_id_round_trip_index() {
        for i in [0_u32, 1, 2, 42, 10_000] {
            let id = ItemId::from_index(i);
            assert_eq!(id.index(), i);
        }
    }

    #[test]
    fn option_item_id_is_small() {
        assert_eq!(
            core::mem::size_of::<ItemId>(),
            core::mem::size_of::<Option<ItemId>>()
        );
    }

    #[test]
    fn default_key_is_unassigned() {
        let key = ItemKey::default();
        assert_eq!(key.value(), -999);
        assert!(!key.is_assigned());
        assert!(ItemKey(7).is_assigned());
    }
}
