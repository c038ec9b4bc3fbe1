//! Core pipeline orchestration for Underwriter.
//!
//! This crate ties together prompt composition, the model gateway and response
//! segmentation into one analyze invocation, and provides a client for a
//! remote `/api/analyze` server.

pub mod pipeline;
pub mod remote;

pub use pipeline::{AnalysisProgress, SilentProgress, analyze, build_report, request_analysis};
pub use remote::AnalyzeClient;
