//! Utilities module aggregator.

pub mod path;
