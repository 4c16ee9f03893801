//! CSV output for list exports.

pub mod export;
