use std::path::PathBuf;

pub const DEFAULT_CELLS: usize = 8192;
pub const DEFAULT_MAX_DEPTH: usize = 400;
pub const DEFAULT_STORAGE: &str = "workspace.lisp";

/// Native stack left before a recursive step moves to a fresh segment.
pub(crate) const STACK_RED_ZONE: usize = 128 * 1024;
/// Size of each fresh stack segment.
pub(crate) const STACK_GROW_SIZE: usize = 4 * 1024 * 1024;

/// Interpreter settings fixed at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Arena capacity in cells.
    pub cells: usize,
    /// Closure-call nesting allowed before evaluation aborts.
    pub max_depth: usize,
    /// File used by `:SAVE` and `:LOAD`.
    pub storage: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            cells: DEFAULT_CELLS,
            max_depth: DEFAULT_MAX_DEPTH,
            storage: PathBuf::from(DEFAULT_STORAGE),
        }
    }
}
