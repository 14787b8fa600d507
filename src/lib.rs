//! This crate provides approximate quantiles over data streams in a bounded
//! amount of memory.
//!
//! Exact order statistics need the whole stream. The summary here keeps a
//! compressed, rank-annotated sample of it instead and answers quantile
//! queries within a per-quantile error chosen by the caller. Two layers are
//! provided:
//!
//! * [`ckms::CKMS`], the summary itself, for use from a single thread.
//! * [`IngestionBuffer`], a lock-free front end that lets many producer
//!   threads feed one summary without waiting on each other.
#![deny(missing_docs, missing_copy_implementations, missing_debug_implementations,
        unstable_features, unused_import_braces)]

pub mod buffer;
pub mod ckms;
pub mod config;
pub mod error;

pub use buffer::IngestionBuffer;
pub use ckms::CKMS;
pub use config::Config;
pub use error::{Error, Result};
