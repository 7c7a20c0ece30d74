#![forbid(unsafe_code)]
//! chronicle-core library.
//!
//! Catalog model and the record-level stages of the pipeline: text
//! normalization, country canonicalization, and consistency validation, plus
//! the file plumbing (load, atomic persist, advisory lock).
//!
//! # Conventions
//!
//! - **Errors**: one `thiserror` enum per concern, each mapping to an
//!   [`error::ErrorCode`].
//! - **Logging**: `tracing` macros (`info!` per stage, `debug!` per record
//!   change, `warn!` for skipped input).

pub mod canonicalize;
pub mod config;
pub mod error;
pub mod identity;
pub mod lock;
pub mod model;
pub mod normalize;
pub mod store;
pub mod timing;
pub mod validate;
