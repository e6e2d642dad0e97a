//! Utility modules shared by the dataset, index and review code
//!
//! - Names: lookup normalization and title-casing

pub mod names;

pub use names::{normalize_name, title_case};
