//! Application services: page generation, export, comment intake.

pub mod comments;
pub mod content;
pub mod error;
pub mod export;
pub mod form;
pub mod generator;
