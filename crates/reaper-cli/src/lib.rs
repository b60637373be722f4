//! reaper-cli
//!
//! Config file handling and terminal rendering for the `reaper` binary.

pub mod config;
pub mod output;
