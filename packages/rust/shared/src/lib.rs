//! Shared types, error model, and configuration for Outreach.
//!
//! This crate is the foundation depended on by all other Outreach crates.
//! It provides:
//! - [`OutreachError`] and [`GatewayError`], the unified error types
//! - The research field schema ([`ResearchField`])
//! - Domain types ([`Prospect`], [`ResearchRecord`], [`ProcessingResult`], [`RunId`])
//! - Configuration ([`AppConfig`], [`PipelineConfig`], config loading)

pub mod config;
pub mod error;
pub mod schema;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, GatewayConfig, OutputConfig, PipelineConfig, PipelineSection, SenderProfile,
    config_dir, config_file_path, init_config, load_config, load_config_from, resolve_api_key,
    validate_api_key,
};
pub use error::{GatewayError, OutreachError, Result, RetryFailure};
pub use schema::{FieldSpec, RESEARCH_FIELD_COUNT, ResearchField};
pub use types::{
    EmailRecord, MISSING, MatchReport, PipelineFailure, ProcessingResult, ProcessingStatus,
    Prospect, ResearchRecord, RunId, input_fingerprint,
};
