//! Shared data model for dstext dialogue databases.
//!
//! The importer writes into a [`DialogueDatabase`]; host tools load, inspect
//! and validate the same structures.

pub mod defs;
pub mod validate;

pub use defs::*;
pub use validate::{ValidationError, validate_database};
