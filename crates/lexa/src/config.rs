/// Options for running a grammar.
///
/// # Example
///
/// ```rust
/// use lexa::ParseConfig;
///
/// let config = ParseConfig {
///     skip_leading_whitespace: false,
///     max_errors: 10,
/// };
/// assert!(ParseConfig::default().skip_leading_whitespace);
/// # let _ = config;
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseConfig {
    /// Skip whitespace before the root production's first rule
    pub skip_leading_whitespace: bool,

    /// Maximum number of errors forwarded to the handler.
    ///
    /// Errors past the limit are still counted and still make the outcome a
    /// recovered failure.
    pub max_errors: usize,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            skip_leading_whitespace: true,
            max_errors: 100,
        }
    }
}

/// Options for the parse tree builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeConfig {
    /// Nodes per arena slab
    pub slab_capacity: usize,

    /// Store token ends as a `u32` extent next to the begin position.
    ///
    /// When disabled, or when an extent does not fit, the end is kept in a
    /// side table instead.
    pub compact_tokens: bool,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            slab_capacity: 1024,
            compact_tokens: true,
        }
    }
}

impl TreeConfig {
    /// Slab capacity clamped to at least one node
    #[must_use]
    pub const fn effective_slab_capacity(&self) -> usize {
        if self.slab_capacity == 0 { 1 } else { self.slab_capacity }
    }
}
