//! Parser for the robot infrastructure configuration document

pub mod ast;
mod document;

pub use ast::*;
pub use document::parse;
