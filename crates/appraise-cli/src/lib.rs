//! appraise - distributed code review stored in git notes

pub mod cli;
pub mod logging;
pub mod output;
