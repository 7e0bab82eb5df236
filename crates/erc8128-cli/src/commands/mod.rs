//! Subcommand implementations.

pub mod base;
pub mod digest;
pub mod inspect;
pub mod keyid;
