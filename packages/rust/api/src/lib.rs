//! Inbound HTTP API for Underwriter.
//!
//! `POST /api/analyze` accepts the intake form fields plus optional
//! attachments and answers `{response}` or `{error}`.

pub mod error;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use router::{AppState, router};
pub use server::{ServerHandle, start};
