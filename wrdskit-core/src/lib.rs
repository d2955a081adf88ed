//! wrdskit core: index membership resolution and Compustat dataset builders.
//!
//! This crate contains:
//! - Domain types (membership events, observation windows)
//! - The membership resolver over typed events and polars frames
//! - Table sources (exported files, in-memory) and a fetch-once table cache
//! - The Compustat session: S&P 500 constituents, identifiers, industry
//!   classifiers and industry filtering
//! - TOML configuration

pub mod compustat;
pub mod config;
pub mod data;
pub mod domain;
pub mod industry;
pub mod resolver;

pub use compustat::{CompustatSession, DatasetError, Sp500Options};
pub use config::{ConfigError, WrdsConfig};
pub use domain::{MembershipEvent, ObservationWindow};
pub use industry::ClassificationSystem;
pub use resolver::{resolve, resolve_frame, resolve_with, DuplicatePolicy, ResolveError};
