//! Ref names and revision expressions

pub mod branch_name;
pub mod revision;
