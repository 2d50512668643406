//! Lectern: statically rendered article pages over a hosted document store,
//! with reader comments held for editorial approval.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
pub mod util;
