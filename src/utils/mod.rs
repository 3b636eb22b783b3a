//! Utility modules for common functionality
//!
//! Tag decoding helpers, byte serialization for the writer, predictors,
//! logging setup and progress reporting.

pub mod logger;
pub mod progress;
pub(crate) mod tag_utils;
pub(crate) mod write_utils;
pub(crate) mod predictor_utils;
