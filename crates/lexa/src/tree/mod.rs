//! # Parse Tree
//!
//! Lossless tree of productions and tokens recorded during a parse.
//!
//! ## Overview
//!
//! Nodes live in a slab arena and are addressed by [`NodeId`]. Each node
//! has exactly one outgoing link: to its next sibling, or, for the last
//! child, back to its parent. A production's first child is always the
//! node allocated right after it, so no child pointers are stored.
//!
//! [`NodeRef`] is the read handle. Walking siblings is O(1) per step;
//! [`NodeRef::parent`] walks to the end of the sibling list first.
//!
//! ```rust
//! use lexa::dsl::*;
//! use lexa::grammar::GrammarBuilder;
//! use lexa::input::Reader;
//! use lexa::tree::TraverseEvent;
//!
//! let mut builder = GrammarBuilder::<u8>::new();
//! builder.production("pair", seq![lit("("), lit(")")]);
//! let grammar = builder.build().unwrap();
//!
//! let result = grammar.parse_tree(Reader::from_str("()"));
//! let tree = result.value().unwrap();
//! let events: Vec<_> = tree.traverse().map(|(event, _)| event).collect();
//! assert_eq!(
//!     events,
//!     [TraverseEvent::Enter, TraverseEvent::Leaf, TraverseEvent::Leaf, TraverseEvent::Exit]
//! );
//! ```

mod arena;
mod builder;

pub use arena::{ArenaMark, NodeId};
pub use builder::ParseTreeBuilder;

use crate::grammar::ProductionId;
use crate::input::{CodeUnit, Span};
use crate::rule::TokenKind;
use arena::{Arena, HAS_CHILDREN, HAS_LINK, LINK_PARENT, RawNode, TOKEN};
use compact_str::CompactString;
use std::fmt;
use thiserror::Error;

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// Errors from tree construction and lookups
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "diagnostics", derive(miette::Diagnostic))]
pub enum TreeError {
    #[error("node {id} does not exist (tree has {len} nodes)")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(tree::node_out_of_range)))]
    NodeOutOfRange { id: u32, len: usize },

    #[error("{open} productions are still open")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(tree::unclosed_productions)))]
    UnclosedProductions { open: usize },
}

/// What a node stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub enum NodeKind {
    Production(ProductionId),
    Token(TokenKind),
}

/// Step of a depth-first walk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub enum TraverseEvent {
    /// Before the children of a production
    Enter,
    /// After the children of a production
    Exit,
    /// A token
    Leaf,
}

/// Tree produced by [`ParseTreeBuilder`]
#[derive(Debug, Clone)]
pub struct ParseTree {
    arena: Arena,
    names: Vec<CompactString>,
    root: Option<NodeId>,
}

impl ParseTree {
    /// The entry production's node, if the parse got that far
    #[must_use]
    pub fn root(&self) -> Option<NodeRef<'_>> {
        self.root.map(|id| NodeRef { tree: self, id })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Look a node up by id.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::NodeOutOfRange`] if no such node exists.
    pub fn node(&self, id: NodeId) -> Result<NodeRef<'_>, TreeError> {
        if id.index() < self.arena.len() {
            Ok(NodeRef { tree: self, id })
        } else {
            Err(TreeError::NodeOutOfRange {
                id: id.raw(),
                len: self.arena.len(),
            })
        }
    }

    #[must_use]
    pub const fn node_count(&self) -> usize {
        self.arena.len()
    }

    /// Largest number of nested productions on any path from the root
    #[must_use]
    pub fn depth(&self) -> usize {
        let mut current = 0usize;
        let mut deepest = 0usize;
        for (event, _) in self.traverse() {
            match event {
                TraverseEvent::Enter => {
                    current += 1;
                    deepest = deepest.max(current);
                }
                TraverseEvent::Exit => current = current.saturating_sub(1),
                TraverseEvent::Leaf => {}
            }
        }
        deepest
    }

    /// Walk the whole tree depth-first
    #[must_use]
    pub fn traverse(&self) -> Traverse<'_> {
        Traverse {
            tree: self,
            start: self.root,
            state: self.root.map(Step::Visit),
        }
    }

    fn raw(&self, id: NodeId) -> RawNode {
        self.arena
            .get(id)
            .copied()
            .unwrap_or_else(|| RawNode::new(TOKEN, TokenKind::Error.to_raw(), 0))
    }

    /// Next sibling, or `None` for the last child
    fn next_sibling_id(&self, id: NodeId) -> Option<NodeId> {
        let node = self.raw(id);
        (node.has(HAS_LINK) && !node.has(LINK_PARENT)).then(|| NodeId::from_raw(node.link))
    }

    fn first_child_id(&self, id: NodeId) -> Option<NodeId> {
        let node = self.raw(id);
        (!node.has(TOKEN) && node.has(HAS_CHILDREN)).then(|| NodeId::from_raw(id.raw() + 1))
    }

    fn parent_id(&self, id: NodeId) -> Option<NodeId> {
        let mut current = id;
        loop {
            let node = self.raw(current);
            if !node.has(HAS_LINK) {
                return None;
            }
            if node.has(LINK_PARENT) {
                return Some(NodeId::from_raw(node.link));
            }
            current = NodeId::from_raw(node.link);
        }
    }
}

/// Borrowed view of one node
#[derive(Clone, Copy)]
pub struct NodeRef<'t> {
    tree: &'t ParseTree,
    id: NodeId,
}

impl<'t> NodeRef<'t> {
    #[must_use]
    pub const fn id(&self) -> NodeId {
        self.id
    }

    #[must_use]
    pub fn kind(&self) -> NodeKind {
        let node = self.tree.raw(self.id);
        if node.has(TOKEN) {
            NodeKind::Token(TokenKind::from_raw(node.kind))
        } else {
            NodeKind::Production(ProductionId::from_raw(node.kind))
        }
    }

    #[must_use]
    pub fn is_token(&self) -> bool {
        self.tree.raw(self.id).has(TOKEN)
    }

    #[must_use]
    pub fn is_production(&self) -> bool {
        !self.is_token()
    }

    /// Name of the production; `None` for tokens
    #[must_use]
    pub fn production_name(&self) -> Option<&'t str> {
        match self.kind() {
            NodeKind::Production(id) => self.tree.names.get(id.index()).map(CompactString::as_str),
            NodeKind::Token(_) => None,
        }
    }

    #[must_use]
    pub fn token_kind(&self) -> Option<TokenKind> {
        match self.kind() {
            NodeKind::Token(kind) => Some(kind),
            NodeKind::Production(_) => None,
        }
    }

    #[must_use]
    pub fn span(&self) -> Span {
        let begin = self.tree.raw(self.id).begin;
        let end = self.tree.arena.end(self.id).unwrap_or(begin);
        Span::new(begin, end)
    }

    /// Units of `source` the node covers
    #[must_use]
    pub fn lexeme<'s, U: CodeUnit>(&self, source: &'s [U]) -> &'s [U] {
        source.get(self.span().range()).unwrap_or(&[])
    }

    #[must_use]
    pub fn first_child(&self) -> Option<Self> {
        self.tree.first_child_id(self.id).map(|id| self.with(id))
    }

    #[must_use]
    pub fn next_sibling(&self) -> Option<Self> {
        self.tree.next_sibling_id(self.id).map(|id| self.with(id))
    }

    #[must_use]
    pub fn is_last_child(&self) -> bool {
        self.tree.raw(self.id).has(LINK_PARENT)
    }

    /// Parent production; `None` for the root
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        self.tree.parent_id(self.id).map(|id| self.with(id))
    }

    #[must_use]
    pub fn children(&self) -> Children<'t> {
        Children {
            tree: self.tree,
            next: self.tree.first_child_id(self.id),
        }
    }

    /// The other children of the parent, starting after this node and
    /// wrapping around
    #[must_use]
    pub fn siblings(&self) -> Siblings<'t> {
        Siblings {
            tree: self.tree,
            origin: self.id,
            next: self.parent().and_then(|_| self.wrap_next(self.id)),
        }
    }

    /// Walk the subtree rooted here depth-first
    #[must_use]
    pub fn traverse(&self) -> Traverse<'t> {
        Traverse {
            tree: self.tree,
            start: Some(self.id),
            state: Some(Step::Visit(self.id)),
        }
    }

    const fn with(&self, id: NodeId) -> Self {
        Self { tree: self.tree, id }
    }

    fn wrap_next(&self, id: NodeId) -> Option<NodeId> {
        let node = self.tree.raw(id);
        if !node.has(HAS_LINK) {
            return None;
        }
        if node.has(LINK_PARENT) {
            self.tree.first_child_id(NodeId::from_raw(node.link))
        } else {
            Some(NodeId::from_raw(node.link))
        }
    }
}

impl PartialEq for NodeRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}

impl Eq for NodeRef<'_> {}

impl fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            NodeKind::Production(_) => write!(f, "{}@{}", self.production_name().unwrap_or("?"), self.span()),
            NodeKind::Token(kind) => write!(f, "{kind}@{}", self.span()),
        }
    }
}

/// Direct children of a production
#[derive(Debug, Clone)]
pub struct Children<'t> {
    tree: &'t ParseTree,
    next: Option<NodeId>,
}

impl<'t> Iterator for Children<'t> {
    type Item = NodeRef<'t>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        self.next = self.tree.next_sibling_id(id);
        Some(NodeRef { tree: self.tree, id })
    }
}

/// Iterator returned by [`NodeRef::siblings`]
#[derive(Debug, Clone)]
pub struct Siblings<'t> {
    tree: &'t ParseTree,
    origin: NodeId,
    next: Option<NodeId>,
}

impl<'t> Iterator for Siblings<'t> {
    type Item = NodeRef<'t>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next.filter(|id| *id != self.origin)?;
        let node = NodeRef { tree: self.tree, id };
        self.next = node.wrap_next(id);
        Some(node)
    }
}

#[derive(Debug, Clone, Copy)]
enum Step {
    Visit(NodeId),
    Exit(NodeId),
}

/// Depth-first walk yielding [`TraverseEvent`]s
#[derive(Debug, Clone)]
pub struct Traverse<'t> {
    tree: &'t ParseTree,
    start: Option<NodeId>,
    state: Option<Step>,
}

impl Traverse<'_> {
    /// Where to go once `id` and its subtree are done
    fn after(&self, id: NodeId) -> Option<Step> {
        if Some(id) == self.start {
            return None;
        }
        let node = self.tree.raw(id);
        if !node.has(HAS_LINK) {
            None
        } else if node.has(LINK_PARENT) {
            Some(Step::Exit(NodeId::from_raw(node.link)))
        } else {
            Some(Step::Visit(NodeId::from_raw(node.link)))
        }
    }
}

impl<'t> Iterator for Traverse<'t> {
    type Item = (TraverseEvent, NodeRef<'t>);

    fn next(&mut self) -> Option<Self::Item> {
        let (event, id) = match self.state? {
            Step::Visit(id) => {
                let node = self.tree.raw(id);
                if node.has(TOKEN) {
                    self.state = self.after(id);
                    (TraverseEvent::Leaf, id)
                } else {
                    self.state = Some(match self.tree.first_child_id(id) {
                        Some(child) => Step::Visit(child),
                        None => Step::Exit(id),
                    });
                    (TraverseEvent::Enter, id)
                }
            }
            Step::Exit(id) => {
                self.state = self.after(id);
                (TraverseEvent::Exit, id)
            }
        };
        Some((event, NodeRef { tree: self.tree, id }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Handler;
    use crate::grammar::ProductionInfo;

    fn info(id: u32, name: &str) -> ProductionInfo {
        ProductionInfo {
            id: ProductionId::from_raw(id),
            name: name.into(),
            token: false,
            transparent: false,
        }
    }

    /// root(a, inner(b, c), d)
    fn sample() -> ParseTree {
        let root = info(0, "root");
        let inner = info(1, "inner");
        let mut builder = ParseTreeBuilder::default();
        let outer = builder.start_production(&root, 0);
        builder.token(TokenKind::Literal, 0, 1);
        let marker = builder.start_production(&inner, 1);
        builder.token(TokenKind::Literal, 1, 2);
        builder.token(TokenKind::Literal, 2, 3);
        builder.finish_production(&inner, marker, Vec::new(), 3);
        builder.token(TokenKind::Literal, 3, 4);
        builder.finish_production(&root, outer, Vec::new(), 4);
        builder.finish().unwrap().0
    }

    #[test]
    fn test_navigation() {
        let tree = sample();
        let root = tree.root().unwrap();
        assert_eq!(root.production_name(), Some("root"));
        assert_eq!(root.span(), Span::new(0, 4));
        assert!(root.parent().is_none());

        let children: Vec<_> = root.children().collect();
        assert_eq!(children.len(), 3);
        assert_eq!(children[1].production_name(), Some("inner"));
        assert_eq!(children[1].parent(), Some(root));
        assert!(children[2].is_last_child());
        assert_eq!(children[0].next_sibling(), Some(children[1]));
        assert!(children[2].next_sibling().is_none());
    }

    #[test]
    fn test_siblings_wrap_around() {
        let tree = sample();
        let children: Vec<_> = tree.root().unwrap().children().collect();
        let siblings: Vec<_> = children[1].siblings().collect();
        assert_eq!(siblings, vec![children[2], children[0]]);
        assert_eq!(tree.root().unwrap().siblings().count(), 0);
    }

    #[test]
    fn test_traverse_and_depth() {
        let tree = sample();
        let events: Vec<_> = tree.traverse().map(|(event, node)| (event, node.span().range())).collect();
        assert_eq!(
            events,
            vec![
                (TraverseEvent::Enter, 0..4),
                (TraverseEvent::Leaf, 0..1),
                (TraverseEvent::Enter, 1..3),
                (TraverseEvent::Leaf, 1..2),
                (TraverseEvent::Leaf, 2..3),
                (TraverseEvent::Exit, 1..3),
                (TraverseEvent::Leaf, 3..4),
                (TraverseEvent::Exit, 0..4),
            ]
        );
        assert_eq!(tree.depth(), 2);
        assert_eq!(tree.node_count(), 6);
    }

    #[test]
    fn test_subtree_traverse_stops_at_start() {
        let tree = sample();
        let inner = tree.root().unwrap().children().nth(1).unwrap();
        assert_eq!(inner.traverse().count(), 4);
    }

    #[test]
    fn test_lookup_out_of_range() {
        let tree = sample();
        assert!(tree.node(NodeId::from_raw(5)).is_ok());
        assert_eq!(
            tree.node(NodeId::from_raw(9)).unwrap_err(),
            TreeError::NodeOutOfRange { id: 9, len: 6 }
        );
    }

    #[test]
    fn test_lexeme() {
        let tree = sample();
        let inner = tree.root().unwrap().children().nth(1).unwrap();
        assert_eq!(inner.lexeme(b"abcd".as_slice()), b"bc");
    }
}
