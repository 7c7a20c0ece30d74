#![forbid(unsafe_code)]
//! chronicle-dedup library.
//!
//! Duplicate detection and resolution over a canonicalized catalog: title
//! similarity metrics, the ordered rule cascade, `(country, year)` bucketing
//! with union-find grouping, survivor ranking and lossless merging, plus the
//! [`pipeline::Pipeline`] that runs every stage in order.

pub mod disjoint;
pub mod grouping;
pub mod merge;
pub mod pipeline;
pub mod review;
pub mod rules;
pub mod similarity;

pub use pipeline::{Pipeline, PipelineReport};
