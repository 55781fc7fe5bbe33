//! Output generation for parsed pages.
//!
//! # Submodules
//!
//! - [`message`]: Escaped chat messages for schedules, records and site status
//! - [`json`]: Writes a parsed `Schedule` to a JSON file

pub mod json;
pub mod message;
