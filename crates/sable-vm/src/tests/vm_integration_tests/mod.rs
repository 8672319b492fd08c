pub mod helpers;

pub mod classes;
pub mod closures;
pub mod control_flow;
pub mod eval;
pub mod exceptions;
pub mod expressions;
pub mod functions;
pub mod limits;
pub mod modules;
pub mod natives;
pub mod optional_chaining;
