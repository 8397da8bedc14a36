//! Local persistence of Statements and envelopes.

pub mod filesystem;

pub use filesystem::{persist, read_statement};
