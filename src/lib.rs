//! Framefind - Video moment search
//!
//! Finds moments in a video collection by visual description and by spoken
//! words, and resolves every hit to a playback position.
//!
//! # Overview
//!
//! Two independently built indexes share one identity, the pair
//! `(video_id, keyframe_index)`:
//!
//! - a vector index with one embedding per extracted keyframe
//! - a full-text index of transcript segments, each attached at ingest time
//!   to the keyframe nearest its start
//!
//! At query time each modality returns hits keyed by that pair, the
//! [`resolver`] maps every keyframe back to a playback time and frame
//! number, and [`search::intersect`] keeps the moments found by all of them.
//!
//! # Architecture
//!
//! - `config` - Configuration management
//! - `keyframe` - Keyframe maps, their cache, nearest-time matching, frame rates
//! - `resolver` - Keyframe to playback-time resolution
//! - `search` - Collaborator clients, result fusion and the search engine
//! - `ingest` - Transcript parsing and indexing
//! - `cli` - Command-line interface and HTTP server
//!
//! # Example
//!
//! ```rust,no_run
//! use framefind::config::Settings;
//! use framefind::keyframe::{FrameRateTable, KeyframeMapCache};
//! use framefind::resolver::FrameResolver;
//! use std::sync::Arc;
//!
//! fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let maps = KeyframeMapCache::from_dir(settings.maps_dir(), 1024);
//!     let rates = FrameRateTable::load(&settings.frame_rates_path(), 25.0)?;
//!     let resolver = FrameResolver::new(Arc::new(maps), Arc::new(rates));
//!
//!     let frame = resolver.resolve("L01_V001", 42);
//!     println!("{:.2}s, frame {}", frame.timestamp_seconds, frame.original_frame);
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod http;
pub mod ingest;
pub mod keyframe;
pub mod resolver;
pub mod search;

pub use error::{FramefindError, Result};
