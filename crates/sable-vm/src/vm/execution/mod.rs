//! Instruction execution handlers

mod arithmetic;
mod collections;
mod comparison;
mod control;
mod exceptions;
mod functions;
mod properties;
mod variables;
