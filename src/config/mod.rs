//! Configuration module for Framefind.
//!
//! Handles loading and managing application settings.

mod settings;

pub use settings::{
    EncoderSettings, GeneralSettings, IngestSettings, KeyframeSettings, ServerSettings,
    Settings, TextSearchSettings, VectorSearchSettings,
};
