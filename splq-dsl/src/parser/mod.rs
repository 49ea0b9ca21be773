//! Grammar-driven parser for SPLQ statements

pub mod parser;

pub use parser::*;
