pub mod ast;
pub mod error;
pub mod loader;
pub mod parser;
pub mod pest_parser;

// Re-export commonly used items
pub use ast::{Expr, File, Import, ModuleGraph, Pos, Stmt};
pub use error::ParseError;
pub use loader::{FsLoader, MemoryLoader, SourceLoader};
pub use pest_parser::{parse, parse_file};
