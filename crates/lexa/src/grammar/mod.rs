//! # Grammar
//!
//! Productions and the builder that assembles them.
//!
//! ## Overview
//!
//! A [`Grammar`] is an immutable set of named productions plus an entry
//! production and an optional whitespace rule. Rules refer to productions by
//! [`ProductionId`], so recursive grammars are built by declaring a
//! production first and defining its rule afterwards:
//!
//! ```rust
//! use lexa::dsl::*;
//! use lexa::grammar::GrammarBuilder;
//! use lexa::input::Reader;
//!
//! let mut builder = GrammarBuilder::<u8>::new();
//! let list = builder.declare("list");
//! builder.define(list, seq![lit("("), opt(p(list)), lit(")")]);
//! let grammar = builder.build().unwrap();
//!
//! let mut errors = Vec::new();
//! let result = grammar.validate(Reader::from_str("(())"), &mut errors);
//! assert!(result.is_success());
//! ```
//!
//! Once built, a grammar is `Send + Sync` and can run any number of parses,
//! on any number of threads.

use crate::error::GrammarError;
use crate::input::CodeUnit;
use crate::rule::{IntoRule, RuleRef};
use crate::value::{Callback, SinkFactory};
use compact_str::CompactString;
use hashbrown::HashMap;
use log::debug;
use std::fmt;

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// Index of a production inside its grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct ProductionId(u32);

impl ProductionId {
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

/// Static description of a production, as handlers see it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductionInfo {
    pub id: ProductionId,
    pub name: CompactString,
    /// Token production: whitespace-opaque, and adjacent tree tokens of the
    /// same kind merge
    pub token: bool,
    /// Creates no tree node; children join the enclosing production
    pub transparent: bool,
}

impl ProductionInfo {
    /// Placeholder for events that happen outside any production
    #[must_use]
    pub fn detached() -> Self {
        Self {
            id: ProductionId(u32::MAX),
            name: CompactString::default(),
            token: false,
            transparent: false,
        }
    }
}

/// One production of a built grammar
pub struct Production<U: CodeUnit> {
    info: ProductionInfo,
    rule: RuleRef<U>,
    whitespace: Option<RuleRef<U>>,
    callback: Option<Callback<U>>,
    sink: Option<SinkFactory>,
}

impl<U: CodeUnit> Production<U> {
    #[must_use]
    pub const fn info(&self) -> &ProductionInfo {
        &self.info
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.info.name
    }

    #[must_use]
    pub const fn rule(&self) -> &RuleRef<U> {
        &self.rule
    }

    /// Whitespace rule overriding the inherited one
    #[must_use]
    pub const fn whitespace(&self) -> Option<&RuleRef<U>> {
        self.whitespace.as_ref()
    }

    #[must_use]
    pub const fn callback(&self) -> Option<&Callback<U>> {
        self.callback.as_ref()
    }

    #[must_use]
    pub const fn sink(&self) -> Option<&SinkFactory> {
        self.sink.as_ref()
    }
}

impl<U: CodeUnit> fmt::Debug for Production<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Production")
            .field("info", &self.info)
            .field("rule", &self.rule)
            .field("whitespace", &self.whitespace.is_some())
            .field("callback", &self.callback.is_some())
            .finish_non_exhaustive()
    }
}

/// Immutable set of productions with an entry point
pub struct Grammar<U: CodeUnit> {
    productions: Vec<Production<U>>,
    names: HashMap<CompactString, ProductionId, ahash::RandomState>,
    whitespace: Option<RuleRef<U>>,
    entry: ProductionId,
}

impl<U: CodeUnit> Grammar<U> {
    #[must_use]
    pub fn builder() -> GrammarBuilder<U> {
        GrammarBuilder::new()
    }

    #[must_use]
    pub fn production(&self, id: ProductionId) -> Option<&Production<U>> {
        self.productions.get(id.index())
    }

    /// Id of the production called `name`
    #[must_use]
    pub fn find(&self, name: &str) -> Option<ProductionId> {
        self.names.get(name).copied()
    }

    #[must_use]
    pub const fn entry(&self) -> ProductionId {
        self.entry
    }

    /// Grammar-wide whitespace rule
    #[must_use]
    pub const fn whitespace(&self) -> Option<&RuleRef<U>> {
        self.whitespace.as_ref()
    }

    /// Production names indexed by id
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.productions.iter().map(Production::name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.productions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.productions.is_empty()
    }
}

impl<U: CodeUnit> fmt::Debug for Grammar<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Grammar")
            .field("productions", &self.productions)
            .field("entry", &self.entry)
            .finish_non_exhaustive()
    }
}

struct Declaration<U: CodeUnit> {
    name: CompactString,
    rule: Option<RuleRef<U>>,
    token: bool,
    transparent: bool,
    whitespace: Option<RuleRef<U>>,
    callback: Option<Callback<U>>,
    sink: Option<SinkFactory>,
}

/// Builder for a [`Grammar`].
///
/// Problems found while declaring (duplicate names, unknown ids) are kept
/// and the first one is returned from [`build`](Self::build).
pub struct GrammarBuilder<U: CodeUnit> {
    declarations: Vec<Declaration<U>>,
    names: HashMap<CompactString, ProductionId, ahash::RandomState>,
    whitespace: Option<RuleRef<U>>,
    entry: Option<ProductionId>,
    errors: Vec<GrammarError>,
}

impl<U: CodeUnit> Default for GrammarBuilder<U> {
    fn default() -> Self {
        Self::new()
    }
}

impl<U: CodeUnit> GrammarBuilder<U> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            declarations: Vec::new(),
            names: HashMap::with_hasher(ahash::RandomState::new()),
            whitespace: None,
            entry: None,
            errors: Vec::new(),
        }
    }

    /// Declare a production to be defined later
    pub fn declare(&mut self, name: impl Into<CompactString>) -> ProductionId {
        let name = name.into();
        if let Some(&id) = self.names.get(&name) {
            self.errors.push(GrammarError::DuplicateProduction { name });
            return id;
        }
        let id = ProductionId(self.declarations.len() as u32);
        self.names.insert(name.clone(), id);
        self.declarations.push(Declaration {
            name,
            rule: None,
            token: false,
            transparent: false,
            whitespace: None,
            callback: None,
            sink: None,
        });
        id
    }

    /// Set the rule of a declared production
    pub fn define(&mut self, id: ProductionId, rule: impl IntoRule<U>) -> ProductionOptions<'_, U> {
        let rule = rule.into_rule();
        match self.declarations.get_mut(id.index()) {
            Some(declaration) => {
                declaration.rule = Some(rule);
                ProductionOptions {
                    declaration: Some(declaration),
                }
            }
            None => {
                self.errors.push(GrammarError::UnknownProduction { id: id.raw() });
                ProductionOptions { declaration: None }
            }
        }
    }

    /// Declare and define in one step
    pub fn production(&mut self, name: impl Into<CompactString>, rule: impl IntoRule<U>) -> ProductionId {
        let id = self.declare(name);
        self.define(id, rule);
        id
    }

    /// Options of an already declared production
    pub fn options(&mut self, id: ProductionId) -> ProductionOptions<'_, U> {
        match self.declarations.get_mut(id.index()) {
            Some(declaration) => ProductionOptions {
                declaration: Some(declaration),
            },
            None => {
                self.errors.push(GrammarError::UnknownProduction { id: id.raw() });
                ProductionOptions { declaration: None }
            }
        }
    }

    /// Whitespace rule for the whole grammar
    pub fn whitespace(&mut self, rule: impl IntoRule<U>) -> &mut Self {
        self.whitespace = Some(rule.into_rule());
        self
    }

    /// Entry production; defaults to the first declared one
    pub fn entry(&mut self, id: ProductionId) -> &mut Self {
        self.entry = Some(id);
        self
    }

    /// Finish the grammar.
    ///
    /// # Errors
    ///
    /// Returns the first problem recorded while declaring, then checks that
    /// every declared production has a rule and that an entry exists.
    pub fn build(mut self) -> Result<Grammar<U>, GrammarError> {
        if !self.errors.is_empty() {
            return Err(self.errors.swap_remove(0));
        }

        let entry = match self.entry {
            Some(id) if id.index() < self.declarations.len() => id,
            Some(id) => return Err(GrammarError::UnknownProduction { id: id.raw() }),
            None if !self.declarations.is_empty() => ProductionId(0),
            None => return Err(GrammarError::MissingEntry),
        };

        let mut productions = Vec::with_capacity(self.declarations.len());
        for (index, declaration) in self.declarations.into_iter().enumerate() {
            let Some(rule) = declaration.rule else {
                return Err(GrammarError::UndefinedProduction {
                    name: declaration.name,
                });
            };
            productions.push(Production {
                info: ProductionInfo {
                    id: ProductionId(index as u32),
                    name: declaration.name,
                    token: declaration.token,
                    // the root always gets a node
                    transparent: declaration.transparent && index != entry.index(),
                },
                rule,
                whitespace: declaration.whitespace,
                callback: declaration.callback,
                sink: declaration.sink,
            });
        }

        debug!(
            "built grammar with {} productions, entry '{}'",
            productions.len(),
            productions[entry.index()].info.name
        );

        Ok(Grammar {
            productions,
            names: self.names,
            whitespace: self.whitespace,
            entry,
        })
    }
}

/// Per-production options, returned by [`GrammarBuilder::define`]
pub struct ProductionOptions<'b, U: CodeUnit> {
    declaration: Option<&'b mut Declaration<U>>,
}

impl<U: CodeUnit> ProductionOptions<'_, U> {
    /// Make this a token production
    pub fn token(mut self) -> Self {
        if let Some(declaration) = self.declaration.as_deref_mut() {
            declaration.token = true;
        }
        self
    }

    /// Create no tree node for this production
    pub fn transparent(mut self) -> Self {
        if let Some(declaration) = self.declaration.as_deref_mut() {
            declaration.transparent = true;
        }
        self
    }

    /// Override the inherited whitespace rule
    pub fn whitespace(mut self, rule: impl IntoRule<U>) -> Self {
        if let Some(declaration) = self.declaration.as_deref_mut() {
            declaration.whitespace = Some(rule.into_rule());
        }
        self
    }

    /// Callback computing the production's value
    pub fn callback(mut self, callback: Callback<U>) -> Self {
        if let Some(declaration) = self.declaration.as_deref_mut() {
            declaration.callback = Some(callback);
        }
        self
    }

    /// Sink used by lists and loops inside the production
    pub fn sink(mut self, factory: SinkFactory) -> Self {
        if let Some(declaration) = self.declaration.as_deref_mut() {
            declaration.sink = Some(factory);
        }
        self
    }
}
