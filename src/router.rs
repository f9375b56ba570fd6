//! Assigns obstacle ids to a bounded pool of output slots in first-seen order.

use std::collections::HashMap;

pub const DEFAULT_CAPACITY: usize = 25;

/// Index into the sink pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SinkSlot(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub slot: SinkSlot,
    /// True the first time this id is routed; the caller opens the sink then.
    pub is_new: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityExceeded {
    pub id: i32,
    pub capacity: usize,
}

/// What to do with a sample whose id does not fit in the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum CapacityPolicy {
    /// Skip the sample, count it, keep scanning.
    #[default]
    Drop,
    /// Stop the run.
    Abort,
}

#[derive(Debug, Clone)]
pub struct EntityRouter {
    capacity: usize,
    slots: HashMap<i32, SinkSlot>,
    order: Vec<i32>,
}

impl EntityRouter {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            slots: HashMap::with_capacity(capacity),
            order: Vec::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Slot of `id`, assigning the next free one on first sight.
    /// A full pool leaves the existing mapping untouched.
    pub fn route(&mut self, id: i32) -> Result<Route, CapacityExceeded> {
        if let Some(&slot) = self.slots.get(&id) {
            return Ok(Route { slot, is_new: false });
        }
        if self.order.len() >= self.capacity {
            return Err(CapacityExceeded {
                id,
                capacity: self.capacity,
            });
        }
        let slot = SinkSlot(self.order.len());
        self.slots.insert(id, slot);
        self.order.push(id);
        Ok(Route { slot, is_new: true })
    }

    pub fn slot_of(&self, id: i32) -> Option<SinkSlot> {
        self.slots.get(&id).copied()
    }

    /// Ids in first-seen order; position is the slot index.
    pub fn ids(&self) -> &[i32] {
        &self.order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_seen_order() {
        let mut router = EntityRouter::new(3);
        assert_eq!(router.route(42).unwrap(), Route { slot: SinkSlot(0), is_new: true });
        assert_eq!(router.route(7).unwrap(), Route { slot: SinkSlot(1), is_new: true });
        assert_eq!(router.route(42).unwrap(), Route { slot: SinkSlot(0), is_new: false });
        assert_eq!(router.route(-1).unwrap(), Route { slot: SinkSlot(2), is_new: true });
        assert_eq!(router.ids(), &[42, 7, -1]);
    }

    #[test]
    fn test_overflow_keeps_existing_mapping() {
        let mut router = EntityRouter::new(2);
        router.route(1).unwrap();
        router.route(2).unwrap();

        let err = router.route(3).unwrap_err();
        assert_eq!(err, CapacityExceeded { id: 3, capacity: 2 });
        // still rejected, never half-inserted
        assert!(router.route(3).is_err());
        assert_eq!(router.slot_of(3), None);

        assert_eq!(router.route(1).unwrap().slot, SinkSlot(0));
        assert_eq!(router.route(2).unwrap().slot, SinkSlot(1));
        assert_eq!(router.len(), 2);
    }

    #[test]
    fn test_default_capacity() {
        let mut router = EntityRouter::new(DEFAULT_CAPACITY);
        for id in 0..DEFAULT_CAPACITY as i32 {
            assert!(router.route(id * 10).unwrap().is_new);
        }
        assert!(router.route(-5).is_err());
        assert_eq!(router.slot_of(240), Some(SinkSlot(24)));
    }
}
