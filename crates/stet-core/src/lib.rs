//! Core types and trait definitions for the Stet moderation engine.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

pub mod actor;
pub mod annotation;
pub mod book;
pub mod error;
pub mod policy;
pub mod report;
pub mod reputation;
pub mod sanction;
pub mod similarity;
pub mod store;
pub mod vote;

pub use error::{Error, Result};
