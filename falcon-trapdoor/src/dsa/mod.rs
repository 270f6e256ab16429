//! Digital signature schemes supported by default in this crate.

pub mod falcon;
