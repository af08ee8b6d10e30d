pub mod config;
pub mod error;
pub mod eval;
pub mod globals;
pub mod heap;
pub mod primitives;
pub mod printer;
pub mod reader;
pub mod storage;
pub mod symbol;
pub mod value;

pub use config::Config;
pub use error::{LispError, LispResult};
pub use eval::{Cycle, Machine, Scope};
pub use storage::{FileStorage, MemoryStorage, Storage};
pub use value::{Tag, Value};
