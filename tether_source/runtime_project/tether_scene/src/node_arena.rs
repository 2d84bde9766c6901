use tether_constraints::TargetLookup;
use tether_ids::NodeID;
use tether_structs::Transform3D;

use crate::node_3d::Node3D;

/// Why [`NodeArena::insert_at`] refused a handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsertAtError {
    /// Index 0 never names a slot (nil, or a zero index with a generation).
    InvalidId,
    Occupied,
}

/// Slot backing `id`, `None` for index 0 whatever the generation.
fn slot_index(id: NodeID) -> Option<usize> {
    match id.index() {
        0 => None,
        index => Some((index - 1) as usize),
    }
}

struct Slot {
    generation: u32,
    node: Option<Node3D>,
}

/// Generational arena for scene nodes.
/// Slot `i` backs NodeID index `i + 1` (index 0 is nil). Removing a node bumps
/// the slot's generation, so handles to the removed node stop resolving even
/// after the slot is reused.
#[derive(Default)]
pub struct NodeArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: u32,
}

impl NodeArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node into a free slot (or a new one) and return its handle.
    pub fn insert(&mut self, node: Node3D) -> NodeID {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[(index - 1) as usize];
            slot.node = Some(node);
            self.live += 1;
            return NodeID::from_parts(index, slot.generation);
        }

        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        self.live += 1;
        NodeID::from_parts(self.slots.len() as u32, 0)
    }

    /// Insert at a specific handle (scene loading). Slots below the handle's
    /// index that do not exist yet are opened empty and go on the free list, so
    /// callers loading untrusted ids bound the index first.
    pub fn insert_at(&mut self, id: NodeID, node: Node3D) -> Result<(), InsertAtError> {
        let idx = slot_index(id).ok_or(InsertAtError::InvalidId)?;
        if idx >= self.slots.len() {
            let first_new = self.slots.len() as u32 + 1;
            self.slots.resize_with(idx + 1, || Slot {
                generation: 0,
                node: None,
            });
            // Slots opened as padding are free for later inserts.
            self.free.extend(first_new..id.index());
        }

        let slot = &mut self.slots[idx];
        if slot.node.is_some() {
            return Err(InsertAtError::Occupied);
        }
        slot.generation = id.generation();
        slot.node = Some(node);
        self.free.retain(|&i| i != id.index());
        self.live += 1;
        Ok(())
    }

    #[inline]
    pub fn get(&self, id: NodeID) -> Option<&Node3D> {
        let slot = self.slot(id)?;
        slot.node.as_ref()
    }

    #[inline]
    pub fn get_mut(&mut self, id: NodeID) -> Option<&mut Node3D> {
        let slot = self.slots.get_mut(slot_index(id)?)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.node.as_mut()
    }

    pub fn contains(&self, id: NodeID) -> bool {
        self.get(id).is_some()
    }

    /// Remove a node; its handle (and every copy of it) becomes stale.
    pub fn remove(&mut self, id: NodeID) -> Option<Node3D> {
        let slot = self.slots.get_mut(slot_index(id)?)?;
        if slot.generation != id.generation() {
            return None;
        }
        let out = slot.node.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index());
        self.live -= 1;
        Some(out)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.live as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Live nodes in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeID, &Node3D)> {
        self.slots.iter().enumerate().filter_map(|(idx, slot)| {
            slot.node
                .as_ref()
                .map(|node| (NodeID::from_parts(idx as u32 + 1, slot.generation), node))
        })
    }

    /// Live handles in slot order.
    pub fn ids(&self) -> Vec<NodeID> {
        self.iter().map(|(id, _)| id).collect()
    }

    fn slot(&self, id: NodeID) -> Option<&Slot> {
        let slot = self.slots.get(slot_index(id)?)?;
        (slot.generation == id.generation()).then_some(slot)
    }
}

impl TargetLookup for NodeArena {
    fn target_transform(&self, id: NodeID) -> Option<Transform3D> {
        self.get(id).map(|node| node.transform)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str) -> Node3D {
        Node3D::new(name)
    }

    #[test]
    fn insert_and_get() {
        let mut arena = NodeArena::new();
        let a = arena.insert(named("a"));
        let b = arena.insert(named("b"));
        assert_eq!(a, NodeID::from_parts(1, 0));
        assert_eq!(b, NodeID::from_parts(2, 0));
        assert_eq!(arena.get(b).unwrap().name, "b");
        assert_eq!(arena.len(), 2);
        assert!(arena.get(NodeID::nil()).is_none());
    }

    #[test]
    fn removed_handle_goes_stale_after_reuse() {
        let mut arena = NodeArena::new();
        let a = arena.insert(named("a"));
        assert_eq!(arena.remove(a).unwrap().name, "a");
        assert!(arena.get(a).is_none());
        assert!(arena.remove(a).is_none());

        let reused = arena.insert(named("c"));
        assert_eq!(reused.index(), a.index());
        assert_ne!(reused, a);
        assert!(arena.get(a).is_none());
        assert_eq!(arena.get(reused).unwrap().name, "c");
    }

    #[test]
    fn insert_at_pads_and_rejects_occupied() {
        let mut arena = NodeArena::new();
        let id = NodeID::from_parts(3, 2);
        assert_eq!(arena.insert_at(id, named("x")), Ok(()));
        assert_eq!(arena.insert_at(id, named("y")), Err(InsertAtError::Occupied));
        assert_eq!(
            arena.insert_at(NodeID::nil(), named("z")),
            Err(InsertAtError::InvalidId)
        );
        assert_eq!(arena.get(id).unwrap().name, "x");
        assert!(arena.get(NodeID::from_parts(3, 0)).is_none());

        // Padding slots 1 and 2 are handed out next.
        let next = arena.insert(named("p"));
        assert!(next.index() < 3);
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn iter_in_slot_order() {
        let mut arena = NodeArena::new();
        let a = arena.insert(named("a"));
        let b = arena.insert(named("b"));
        let c = arena.insert(named("c"));
        arena.remove(b);
        assert_eq!(arena.ids(), vec![a, c]);
    }

    #[test]
    fn lookup_reads_transform() {
        let mut arena = NodeArena::new();
        let mut node = named("t");
        node.transform.position.x = 4.0;
        let id = arena.insert(node);
        assert_eq!(arena.target_transform(id).unwrap().position.x, 4.0);
        arena.remove(id);
        assert!(arena.target_transform(id).is_none());
    }

    #[test]
    fn zero_index_with_generation_never_resolves() {
        let mut arena = NodeArena::new();
        arena.insert(named("a"));
        let zero = NodeID::from_parts(0, 1);
        assert!(!zero.is_nil());

        assert!(arena.get(zero).is_none());
        assert!(arena.get_mut(zero).is_none());
        assert!(!arena.contains(zero));
        assert!(arena.target_transform(zero).is_none());
        assert!(arena.remove(zero).is_none());
        assert_eq!(arena.insert_at(zero, named("z")), Err(InsertAtError::InvalidId));
        assert_eq!(arena.len(), 1);
    }
}
