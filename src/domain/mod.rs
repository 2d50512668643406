//! Domain layer types and invariants.

pub mod blocks;
pub mod comments;
pub mod entities;
pub mod error;
