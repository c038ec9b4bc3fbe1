//! Shared types, error model, and configuration for Underwriter.
//!
//! This crate is the foundation depended on by all other Underwriter crates.
//! It provides:
//! - [`UnderwriterError`] — the unified error type
//! - Domain types ([`IntakeForm`], [`Attachment`], [`ContentPart`], [`AnalysisSection`])
//! - Configuration ([`AppConfig`], config loading, credential resolution)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AnthropicConfig, AppConfig, AttachmentsConfig, DEFAULT_MAX_ATTACHMENT_BYTES, PromptConfig,
    ServerConfig, config_dir, config_file_path, init_config, load_config, load_config_from,
    load_system_prompt, resolve_api_key,
};
pub use error::{EMPTY_RESULT_MESSAGE, Result, UnderwriterError};
pub use types::{
    AnalysisReport, AnalysisSection, AnalyzeRequest, Attachment, ContentPart, IntakeForm,
    RepresentationStatus, Verdict, format_currency,
};
