use super::{EngineError, Matcher, ValueParser};
use crate::error::GrammarError;
use crate::input::{CodeUnit, Reader, units_to_string};
use smallvec::SmallVec;

/// Node index inside a trie
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct NodeIndex(u32);

#[derive(Debug, Clone)]
struct TrieNode<U> {
    /// Value reported when a match ends on this node
    accept: Option<u32>,
    /// Outgoing edges, sorted by unit for binary search
    transitions: SmallVec<[(U, NodeIndex); 4]>,
}

impl<U: CodeUnit> TrieNode<U> {
    fn new() -> Self {
        Self {
            accept: None,
            transitions: SmallVec::new(),
        }
    }

    fn find_transition(&self, unit: U) -> Option<NodeIndex> {
        self.transitions
            .binary_search_by(|(key, _)| key.cmp(&unit))
            .ok()
            .map(|idx| self.transitions[idx].1)
    }
}

/// Automaton over a fixed set of unit strings.
///
/// Every accepting node carries the value given to [`TrieBuilder::insert`].
/// Matching walks the input for as long as a transition exists and reports
/// the value of the deepest accepting node it passed, so `"<="` wins over
/// `"<"` regardless of insertion order.
#[derive(Debug, Clone)]
pub struct Trie<U> {
    nodes: Vec<TrieNode<U>>,
    len: usize,
}

impl<U: CodeUnit> Trie<U> {
    /// Build a trie from strings, using the index of each string as its value
    ///
    /// # Errors
    ///
    /// Fails on an empty or duplicate string.
    pub fn from_strings<'s>(strings: impl IntoIterator<Item = &'s str>) -> Result<Self, GrammarError> {
        let mut builder = TrieBuilder::new();
        for (index, text) in strings.into_iter().enumerate() {
            builder.insert(&U::encode(text), index as u32)?;
        }
        Ok(builder.build())
    }

    /// Number of strings in the trie
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Longest accepting match at the reader's position.
    ///
    /// On success the reader is left after the matched string. On failure it
    /// is left where it started.
    pub fn longest_match(&self, reader: &mut Reader<'_, U>) -> Option<u32> {
        let mut node = &self.nodes[0];
        let mut cursor = *reader;
        let mut best = None;

        loop {
            if let Some(value) = node.accept {
                best = Some((value, cursor));
            }
            let Some(unit) = cursor.peek() else { break };
            let Some(next) = node.find_transition(unit) else { break };
            cursor.bump();
            node = &self.nodes[next.0 as usize];
        }

        let (value, end) = best?;
        *reader = end;
        Some(value)
    }

    /// Value of a string that is exactly in the trie
    #[must_use]
    pub fn lookup(&self, units: &[U]) -> Option<u32> {
        let mut node = &self.nodes[0];
        for &unit in units {
            node = &self.nodes[node.find_transition(unit)?.0 as usize];
        }
        node.accept
    }
}

impl<U: CodeUnit> Matcher<U> for Trie<U> {
    fn matches(&self, reader: &mut Reader<'_, U>) -> Result<(), EngineError> {
        self.longest_match(reader).map(|_| ()).ok_or(EngineError::Mismatch)
    }
}

impl<U: CodeUnit> ValueParser<U> for Trie<U> {
    type Output = u32;

    fn parse(&self, reader: &mut Reader<'_, U>) -> Result<u32, EngineError> {
        self.longest_match(reader).ok_or(EngineError::Mismatch)
    }
}

/// Incremental construction of a [`Trie`]
#[derive(Debug, Clone)]
pub struct TrieBuilder<U> {
    nodes: Vec<TrieNode<U>>,
    len: usize,
}

impl<U: CodeUnit> Default for TrieBuilder<U> {
    fn default() -> Self {
        Self::new()
    }
}

impl<U: CodeUnit> TrieBuilder<U> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![TrieNode::new()],
            len: 0,
        }
    }

    /// Add a string with the value reported when it matches
    ///
    /// # Errors
    ///
    /// Returns [`GrammarError::EmptyLiteral`] for an empty string and
    /// [`GrammarError::DuplicateString`] if the string was inserted before.
    pub fn insert(&mut self, string: &[U], value: u32) -> Result<(), GrammarError> {
        if string.is_empty() {
            return Err(GrammarError::EmptyLiteral);
        }

        let mut current = 0usize;
        for &unit in string {
            current = match self.nodes[current].find_transition(unit) {
                Some(next) => next.0 as usize,
                None => {
                    let next = NodeIndex(self.nodes.len() as u32);
                    self.nodes.push(TrieNode::new());
                    let transitions = &mut self.nodes[current].transitions;
                    let at = transitions.partition_point(|(key, _)| *key < unit);
                    transitions.insert(at, (unit, next));
                    next.0 as usize
                }
            };
        }

        let node = &mut self.nodes[current];
        if node.accept.is_some() {
            return Err(GrammarError::DuplicateString {
                text: units_to_string(string).into(),
            });
        }
        node.accept = Some(value);
        self.len += 1;
        Ok(())
    }

    #[must_use]
    pub fn build(self) -> Trie<U> {
        Trie {
            nodes: self.nodes,
            len: self.len,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_longest_match_beats_declaration_order() {
        let trie = Trie::<u8>::from_strings(["<", "<=", "<<="]).unwrap();
        let mut reader = Reader::from_str("<<=x");
        assert_eq!(trie.longest_match(&mut reader), Some(2));
        assert_eq!(reader.position(), 3);

        let mut reader = Reader::from_str("<=");
        assert_eq!(trie.longest_match(&mut reader), Some(1));
        assert_eq!(reader.position(), 2);
    }

    #[test]
    fn test_falls_back_to_shorter_accept() {
        let trie = Trie::<u8>::from_strings(["a", "abc"]).unwrap();
        let mut reader = Reader::from_str("abx");
        assert_eq!(trie.longest_match(&mut reader), Some(0));
        assert_eq!(reader.position(), 1);
    }

    #[test]
    fn test_no_match_leaves_reader() {
        let trie = Trie::<u8>::from_strings(["if", "in"]).unwrap();
        let mut reader = Reader::from_str("ix");
        assert_eq!(trie.longest_match(&mut reader), None);
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut builder = TrieBuilder::<u8>::new();
        builder.insert(b"let", 0).unwrap();
        assert_eq!(
            builder.insert(b"let", 1),
            Err(GrammarError::DuplicateString { text: "let".into() })
        );
        assert_eq!(builder.insert(b"", 2), Err(GrammarError::EmptyLiteral));
    }

    #[test]
    fn test_lookup_exact() {
        let trie = Trie::<char>::from_strings(["true", "false"]).unwrap();
        assert_eq!(trie.lookup(&['t', 'r', 'u', 'e']), Some(0));
        assert_eq!(trie.lookup(&['t', 'r', 'u']), None);
        assert_eq!(trie.len(), 2);
    }
}
