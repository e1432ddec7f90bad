//! Output module
//!
//! Turns run and check reports into text for the terminal or for log
//! collectors.
//!
//! # Overview
//!
//! This module provides:
//! - `render_pretty` / `render_check_pretty` - human-readable summaries
//! - `render_json` - single-line JSON for any report
//! - `render_state_summary` - what a validated document contains

mod report;

pub use report::{render_check_pretty, render_json, render_pretty, render_state_summary};

#[cfg(test)]
mod tests;
