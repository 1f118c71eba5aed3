//! ID types for entities.

use serde::{Deserialize, Serialize};

/// Unique identifier for an entity taking part in combat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    /// Creates an entity ID from a raw value (for deserialization).
    #[must_use]
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Null/invalid entity ID.
    pub const NULL: Self = Self(0);

    /// Checks if this is a valid (non-null) entity ID.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Monotonic entity ID allocator.
///
/// Owned by the simulation rather than a process-wide counter so that two
/// simulations fed the same inputs hand out the same IDs, and so the counter
/// travels with a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdAllocator {
    next: u64,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl IdAllocator {
    /// Creates a new allocator starting at the first valid ID.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates the next unused ID.
    pub fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next += 1;
        id
    }

    /// Returns the ID the next call to [`allocate`](Self::allocate) will yield.
    #[must_use]
    pub const fn peek(&self) -> EntityId {
        EntityId(self.next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocator_is_sequential() {
        let mut ids = IdAllocator::new();
        let a = ids.allocate();
        let b = ids.allocate();
        assert!(a.is_valid());
        assert_eq!(b.raw(), a.raw() + 1);
        assert_eq!(ids.peek().raw(), b.raw() + 1);
    }

    #[test]
    fn test_null_id_invalid() {
        assert!(!EntityId::NULL.is_valid());
        assert_eq!(EntityId::from_raw(7).to_string(), "#7");
    }
}
