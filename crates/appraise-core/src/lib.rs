//! appraise-core: code review metadata stored in git notes.
//!
//! This crate owns the record formats, the bulk notes reader, comment thread
//! reconstruction, resolution aggregation, and the service layer that ties
//! them to a repository.

pub mod config;
pub mod core;
pub mod review;
pub mod scm;
