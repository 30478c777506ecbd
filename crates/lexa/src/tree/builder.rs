use super::arena::{Arena, ArenaMark, HAS_CHILDREN, HAS_LINK, LINK_PARENT, NodeId, RawNode, TOKEN};
use super::{ParseTree, TreeError};
use crate::config::TreeConfig;
use crate::context::{Handler, ProductionMarker};
use crate::error::Error;
use crate::grammar::ProductionInfo;
use crate::rule::TokenKind;
use crate::value::{NullSink, Sink, Value};
use compact_str::CompactString;
use log::trace;
use smallvec::SmallVec;

/// Child list of an open production
#[derive(Debug, Clone, Copy, Default)]
struct Children {
    last: Option<NodeId>,
    count: u32,
}

#[derive(Debug)]
struct Open {
    /// `None` for a transparent production
    node: Option<NodeId>,
    children: Children,
    /// Child list of the enclosing node when this production started
    outer: Children,
    mark: ArenaMark,
    token: bool,
}

/// Handler that records a parse tree.
///
/// Production nodes are allocated when the production starts and linked
/// into their parent when it finishes; a backtracked production unwinds the
/// arena to where it started. A canceled production keeps whatever it
/// parsed, so the tree of a failed parse shows how far it got.
#[derive(Debug)]
pub struct ParseTreeBuilder {
    arena: Arena,
    config: TreeConfig,
    stack: SmallVec<[Open; 16]>,
    names: Vec<CompactString>,
    root: Option<NodeId>,
    errors: Vec<Error>,
}

impl Default for ParseTreeBuilder {
    fn default() -> Self {
        Self::new(TreeConfig::default())
    }
}

impl ParseTreeBuilder {
    #[must_use]
    pub fn new(config: TreeConfig) -> Self {
        Self {
            arena: Arena::new(config.effective_slab_capacity()),
            config,
            stack: SmallVec::new(),
            names: Vec::new(),
            root: None,
            errors: Vec::new(),
        }
    }

    /// Errors reported while building
    #[must_use]
    pub fn errors(&self) -> &[Error] {
        &self.errors
    }

    /// Nodes allocated so far
    #[must_use]
    pub const fn node_count(&self) -> usize {
        self.arena.len()
    }

    /// Finish building.
    ///
    /// # Errors
    ///
    /// Returns an error if a production is still open.
    pub fn finish(self) -> Result<(ParseTree, Vec<Error>), TreeError> {
        if !self.stack.is_empty() {
            return Err(TreeError::UnclosedProductions {
                open: self.stack.len(),
            });
        }
        let tree = ParseTree {
            arena: self.arena,
            names: self.names,
            root: self.root,
        };
        Ok((tree, self.errors))
    }

    fn remember_name(&mut self, info: &ProductionInfo) {
        let index = info.id.index();
        if self.names.len() <= index {
            self.names.resize(index + 1, CompactString::default());
        }
        if self.names[index].is_empty() {
            self.names[index].clone_from(&info.name);
        }
    }

    /// Child list new children currently join
    fn owner(&mut self) -> Option<&mut Children> {
        self.stack
            .iter_mut()
            .rev()
            .find(|open| open.node.is_some())
            .map(|open| &mut open.children)
    }

    fn owner_state(&self) -> Children {
        self.stack
            .iter()
            .rev()
            .find(|open| open.node.is_some())
            .map(|open| open.children)
            .unwrap_or_default()
    }

    fn append(&mut self, id: NodeId) {
        let Some(children) = self.owner() else {
            return;
        };
        let previous = children.last.replace(id);
        children.count += 1;
        if let Some(previous) = previous
            && let Some(node) = self.arena.get_mut(previous)
        {
            node.link = id.raw();
            node.flags = (node.flags | HAS_LINK) & !LINK_PARENT;
        }
    }

    /// Extend the last token of the innermost token production instead of
    /// adding a new one
    fn merge(&mut self, kind: TokenKind, begin: usize, end: usize) -> bool {
        let Some(open) = self.stack.last() else {
            return false;
        };
        if !open.token {
            return false;
        }
        let since = open.mark.nodes();
        let Some(last) = self.owner_state().last else {
            return false;
        };
        if last.index() < since {
            return false;
        }
        let mergeable = self.arena.get(last).is_some_and(|node| {
            node.has(TOKEN) && node.kind == kind.to_raw()
        }) && self.arena.end(last) == Some(begin);
        if mergeable {
            self.arena.set_end(last, end, self.config.compact_tokens);
        }
        mergeable
    }

    fn close(&mut self, open: &Open, end: usize) {
        let Some(id) = open.node else {
            return;
        };
        self.arena.set_end(id, end, true);
        if let Some(last) = open.children.last
            && let Some(child) = self.arena.get_mut(last)
        {
            child.link = id.raw();
            child.flags |= HAS_LINK | LINK_PARENT;
        }
        if open.children.count > 0
            && let Some(node) = self.arena.get_mut(id)
        {
            node.flags |= HAS_CHILDREN;
        }
        if self.stack.is_empty() {
            self.root = Some(id);
        } else {
            self.append(id);
        }
    }

    fn pop(&mut self, marker: ProductionMarker) -> Option<Open> {
        if self.stack.len() != marker.state + 1 {
            trace!("tree builder out of step: depth {} for marker {}", self.stack.len(), marker.state);
        }
        self.stack.pop()
    }
}

impl Handler for ParseTreeBuilder {
    fn start_production(&mut self, info: &ProductionInfo, position: usize) -> ProductionMarker {
        self.remember_name(info);
        let state = self.stack.len();
        let mark = self.arena.mark();
        let outer = self.owner_state();
        let node = if info.transparent && !self.stack.is_empty() {
            None
        } else {
            Some(self.arena.push(RawNode::new(0, info.id.raw(), position)))
        };
        self.stack.push(Open {
            node,
            children: Children::default(),
            outer,
            mark,
            token: info.token,
        });
        ProductionMarker { begin: position, state }
    }

    fn token(&mut self, kind: TokenKind, begin: usize, end: usize) {
        if self.stack.is_empty() || self.merge(kind, begin, end) {
            return;
        }
        let id = self.arena.push(RawNode::new(TOKEN, kind.to_raw(), begin));
        self.arena.set_end(id, end, self.config.compact_tokens);
        self.append(id);
    }

    fn finish_production(
        &mut self,
        _info: &ProductionInfo,
        marker: ProductionMarker,
        _values: Vec<Value>,
        position: usize,
    ) -> Value {
        if let Some(open) = self.pop(marker) {
            self.close(&open, position);
        }
        Value::Nothing
    }

    fn backtrack_production(&mut self, info: &ProductionInfo, marker: ProductionMarker) {
        let Some(open) = self.pop(marker) else {
            return;
        };
        trace!("unwinding {} to node {}", info.name, open.mark.nodes());
        self.arena.unwind(open.mark);
        if let Some(children) = self.owner() {
            *children = open.outer;
        }
    }

    fn cancel_production(&mut self, _info: &ProductionInfo, marker: ProductionMarker, position: usize) {
        if let Some(open) = self.pop(marker) {
            self.close(&open, position);
        }
    }

    fn error(&mut self, _info: &ProductionInfo, error: Error) {
        self.errors.push(error);
    }

    fn get_sink(&mut self, _info: &ProductionInfo) -> Box<dyn Sink> {
        Box::new(NullSink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::ProductionId;

    fn info(id: u32, name: &str) -> ProductionInfo {
        ProductionInfo {
            id: ProductionId::from_raw(id),
            name: name.into(),
            token: false,
            transparent: false,
        }
    }

    #[test]
    fn test_backtrack_restores_mark() {
        let root = info(0, "root");
        let inner = info(1, "inner");
        let mut builder = ParseTreeBuilder::default();

        let outer = builder.start_production(&root, 0);
        builder.token(TokenKind::Literal, 0, 1);
        let before = builder.arena.mark();

        let marker = builder.start_production(&inner, 1);
        builder.token(TokenKind::Literal, 1, 2);
        builder.token(TokenKind::Literal, 2, 3);
        builder.backtrack_production(&inner, marker);
        assert_eq!(builder.arena.mark(), before);

        builder.finish_production(&root, outer, Vec::new(), 1);
        let (tree, errors) = builder.finish().unwrap();
        assert!(errors.is_empty());
        assert_eq!(tree.node_count(), 2);
    }

    #[test]
    fn test_transparent_children_join_parent() {
        let root = info(0, "root");
        let mut hidden = info(1, "hidden");
        hidden.transparent = true;
        let mut builder = ParseTreeBuilder::default();

        let outer = builder.start_production(&root, 0);
        let marker = builder.start_production(&hidden, 0);
        builder.token(TokenKind::Literal, 0, 1);
        builder.finish_production(&hidden, marker, Vec::new(), 1);
        builder.token(TokenKind::Literal, 1, 2);
        builder.finish_production(&root, outer, Vec::new(), 2);

        let (tree, _) = builder.finish().unwrap();
        let root = tree.root().unwrap();
        assert_eq!(root.children().count(), 2);
        assert!(root.children().all(|child| child.is_token()));
    }

    #[test]
    fn test_token_production_merges_tokens() {
        let root = info(0, "root");
        let mut word = info(1, "word");
        word.token = true;
        let mut builder = ParseTreeBuilder::default();

        let outer = builder.start_production(&root, 0);
        let marker = builder.start_production(&word, 0);
        builder.token(TokenKind::Any, 0, 1);
        builder.token(TokenKind::Any, 1, 2);
        builder.token(TokenKind::Literal, 2, 3);
        builder.finish_production(&word, marker, Vec::new(), 3);
        builder.finish_production(&root, outer, Vec::new(), 3);

        let (tree, _) = builder.finish().unwrap();
        let word = tree.root().unwrap().first_child().unwrap();
        let spans: Vec<_> = word.children().map(|child| child.span().range()).collect();
        assert_eq!(spans, vec![0..2, 2..3]);
    }

    #[test]
    fn test_finish_with_open_production_fails() {
        let mut builder = ParseTreeBuilder::default();
        builder.start_production(&info(0, "root"), 0);
        assert!(matches!(
            builder.finish(),
            Err(TreeError::UnclosedProductions { open: 1 })
        ));
    }
}
