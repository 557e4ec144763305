//! extsync core library — extension catalog, discovery, configuration, errors.
//!
//! - [`types`] — newtypes, [`Channel`], [`Extension`]
//! - [`catalog`] — content index parsing, reference pattern, on-disk layout
//! - [`extension_set`] — [`ExtensionSet`]
//! - [`discovery`] — current extensions from host instance metadata
//! - [`config`] — YAML config with environment overrides
//! - [`error`] — [`CoreError`]

pub mod catalog;
pub mod config;
pub mod discovery;
pub mod error;
pub mod extension_set;
pub mod types;

pub use catalog::{ContentLayout, ReferencePattern};
pub use config::{BackendConfig, Config};
pub use discovery::Discovery;
pub use error::CoreError;
pub use extension_set::ExtensionSet;
pub use types::{
    Channel, ChannelId, Commit, Extension, ExtensionName, ExtensionRecord, ExtensionRef, NodeId,
};
