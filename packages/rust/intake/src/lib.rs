//! Case intake: attachment encoding and prompt composition.
//!
//! This crate provides:
//! - [`attachment`] — size-checked base64 encoding of user files into an ordered list
//! - [`compose`] — the fixed-schema narrative plus multi-modal content parts

pub mod attachment;
pub mod compose;

pub use attachment::{AttachmentEncoder, AttachmentList, BatchOutcome, RejectedFile, strip_data_uri};
pub use compose::{ComposedPrompt, compose};
