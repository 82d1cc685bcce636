//! Shared types, error model, and configuration for rosterscrape.
//!
//! This crate is the foundation depended on by all other rosterscrape crates.
//! It provides:
//! - [`RosterError`]: the unified error type
//! - Domain types ([`PersonRecord`], [`RunId`], the schema label vocabulary)
//! - Configuration ([`AppConfig`], [`HarvestConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, BrowserConfig, DEFAULT_DESCRIPTION_MIN_CHARS, DEFAULT_PANEL_MAX_CHARS,
    DEFAULT_PANEL_MIN_CHARS, DiscoveryConfig, DiscoveryStrategy, ExtractorConfig, HarvestConfig,
    LocatorConfig, OutputConfig, TargetConfig, TimingConfig, WaitPolicy, config_dir,
    config_file_path, init_config, load_config, load_config_from, validate_config,
};
pub use error::{Result, RosterError};
pub use types::{
    LABEL_CENTER_OF_EXCELLENCE, LABEL_INVESTMENT_STRATEGY, LABEL_NAME, LABEL_REGION, LABEL_TEAM,
    PersonRecord, RunId, SCHEMA_LABELS, is_schema_label,
};
