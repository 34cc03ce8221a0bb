//! Data models for the MANP backend.

mod report;

pub use report::*;
