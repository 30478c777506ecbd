//! Slab arena for parse tree nodes
//!
//! Nodes are plain `Copy` records addressed by [`NodeId`]. They are never
//! freed individually: rolling back a production truncates the arena to the
//! [`ArenaMark`] taken before its node was allocated. Slabs stay allocated
//! across rollbacks, so resetting the write position costs O(1) per slab.

use ahash::RandomState;
use hashbrown::HashMap;

/// Index of a node inside its tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeId(u32);

impl NodeId {
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub(crate) const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }
}

/// The node is a token; otherwise a production
pub(crate) const TOKEN: u8 = 1 << 0;
/// `link` points to the parent instead of the next sibling
pub(crate) const LINK_PARENT: u8 = 1 << 1;
/// The end is kept in the side table, not as an extent
pub(crate) const FULL_END: u8 = 1 << 2;
/// `link` is meaningful; unset for the root and for unlinked nodes
pub(crate) const HAS_LINK: u8 = 1 << 3;
/// A production with at least one child, which is the next node
pub(crate) const HAS_CHILDREN: u8 = 1 << 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RawNode {
    pub link: u32,
    pub flags: u8,
    /// Production id or raw token kind
    pub kind: u32,
    pub begin: usize,
    pub extent: u32,
}

impl RawNode {
    pub const fn new(flags: u8, kind: u32, begin: usize) -> Self {
        Self {
            link: 0,
            flags,
            kind,
            begin,
            extent: 0,
        }
    }

    pub const fn has(&self, flag: u8) -> bool {
        self.flags & flag != 0
    }
}

/// Write position of an [`Arena`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArenaMark {
    nodes: usize,
    ends: usize,
}

impl ArenaMark {
    /// Number of nodes allocated when the mark was taken
    #[must_use]
    pub const fn nodes(&self) -> usize {
        self.nodes
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Arena {
    slabs: Vec<Vec<RawNode>>,
    slab_capacity: usize,
    len: usize,
    ends: HashMap<u32, usize, RandomState>,
    /// Ids with a side-table end, in insertion order
    end_log: Vec<u32>,
}

impl Arena {
    pub fn new(slab_capacity: usize) -> Self {
        Self {
            slabs: Vec::new(),
            slab_capacity: slab_capacity.max(1),
            len: 0,
            ends: HashMap::default(),
            end_log: Vec::new(),
        }
    }

    pub const fn len(&self) -> usize {
        self.len
    }

    #[cfg(test)]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Slabs currently allocated, in use or not
    #[cfg(test)]
    pub fn slab_count(&self) -> usize {
        self.slabs.len()
    }

    pub fn push(&mut self, node: RawNode) -> NodeId {
        let slab = self.len / self.slab_capacity;
        if slab == self.slabs.len() {
            self.slabs.push(Vec::with_capacity(self.slab_capacity));
        }
        self.slabs[slab].push(node);
        let id = NodeId(self.len as u32);
        self.len += 1;
        id
    }

    pub fn get(&self, id: NodeId) -> Option<&RawNode> {
        let index = id.index();
        self.slabs
            .get(index / self.slab_capacity)?
            .get(index % self.slab_capacity)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut RawNode> {
        let index = id.index();
        self.slabs
            .get_mut(index / self.slab_capacity)?
            .get_mut(index % self.slab_capacity)
    }

    /// Record where `id` ends, compactly if allowed and possible
    pub fn set_end(&mut self, id: NodeId, end: usize, compact: bool) {
        let Some(node) = self.get_mut(id) else {
            return;
        };
        let extent = end.saturating_sub(node.begin);
        match u32::try_from(extent) {
            Ok(extent) if compact => {
                node.extent = extent;
                node.flags &= !FULL_END;
            }
            _ => {
                node.flags |= FULL_END;
                if self.ends.insert(id.0, end).is_none() {
                    self.end_log.push(id.0);
                }
            }
        }
    }

    pub fn end(&self, id: NodeId) -> Option<usize> {
        let node = self.get(id)?;
        if node.has(FULL_END) {
            self.ends.get(&id.0).copied()
        } else {
            Some(node.begin + node.extent as usize)
        }
    }

    pub fn mark(&self) -> ArenaMark {
        ArenaMark {
            nodes: self.len,
            ends: self.end_log.len(),
        }
    }

    /// Drop everything allocated after `mark`.
    ///
    /// Unwinding to the same mark twice is a no-op the second time.
    pub fn unwind(&mut self, mark: ArenaMark) {
        if mark.nodes >= self.len {
            return;
        }
        let keep = mark.nodes / self.slab_capacity;
        if let Some(slab) = self.slabs.get_mut(keep) {
            slab.truncate(mark.nodes % self.slab_capacity);
        }
        for slab in self.slabs.iter_mut().skip(keep + 1) {
            slab.clear();
        }
        self.len = mark.nodes;

        while self.end_log.len() > mark.ends {
            if let Some(id) = self.end_log.pop() {
                self.ends.remove(&id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(begin: usize) -> RawNode {
        RawNode::new(TOKEN, 0, begin)
    }

    #[test]
    fn test_push_spans_slabs() {
        let mut arena = Arena::new(2);
        for begin in 0..5 {
            arena.push(token(begin));
        }
        assert_eq!(arena.len(), 5);
        assert_eq!(arena.slab_count(), 3);
        assert_eq!(arena.get(NodeId(4)).map(|node| node.begin), Some(4));
        assert!(arena.get(NodeId(5)).is_none());
    }

    #[test]
    fn test_unwind_keeps_slabs() {
        let mut arena = Arena::new(2);
        arena.push(token(0));
        let mark = arena.mark();
        for begin in 1..6 {
            arena.push(token(begin));
        }
        arena.unwind(mark);
        assert_eq!(arena.len(), 1);
        assert_eq!(arena.slab_count(), 3);

        let id = arena.push(token(9));
        assert_eq!(id, NodeId(1));
        assert_eq!(arena.get(id).map(|node| node.begin), Some(9));
    }

    #[test]
    fn test_unwind_is_idempotent() {
        let mut arena = Arena::new(4);
        arena.push(token(0));
        let mark = arena.mark();
        arena.push(token(1));
        arena.unwind(mark);
        arena.unwind(mark);
        assert_eq!(arena.mark(), mark);
    }

    #[test]
    fn test_full_end_rolls_back() {
        let mut arena = Arena::new(4);
        let kept = arena.push(token(0));
        arena.set_end(kept, 3, false);
        let mark = arena.mark();
        let dropped = arena.push(token(3));
        arena.set_end(dropped, 7, false);
        assert_eq!(arena.end(dropped), Some(7));

        arena.unwind(mark);
        assert_eq!(arena.end(kept), Some(3));
        let reused = arena.push(token(3));
        arena.set_end(reused, 4, true);
        assert_eq!(arena.end(reused), Some(4));
    }
}
