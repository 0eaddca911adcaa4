//! Parser limits.

/// Default maximum nesting depth (2^19 containers).
///
/// Request bodies are capped at 16 MiB by the HTTP layer and every container
/// costs at least two bytes, so this only binds for inputs built to be deep.
pub const DEFAULT_MAX_DEPTH: usize = 524_288;

/// Configuration for [`parse`](crate::parse).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserConfig {
    /// Maximum number of simultaneously open containers. `{}` has depth 1.
    pub max_depth: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ParserConfig {
    /// Create a configuration with the given depth limit.
    #[must_use]
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self { max_depth }
    }
}
