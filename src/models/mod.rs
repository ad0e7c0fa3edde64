//! Data models for the memo archive.
//!
//! Models are defined in the `memo-models` crate and re-exported here.

pub use memo_models::*;
