//! sppub - Core Library
//!
//! Endpoint construction, error classification, folder creation and the
//! per-file publishing protocol for SharePoint-style REST document servers.
//! Network access goes through the [`RequestClient`] trait.

pub mod batch;
pub mod client;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod error_codes;
pub mod folders;
pub mod publisher;
pub mod sources;
pub mod types;

#[cfg(test)]
mod testing;

pub use batch::publish_all;
pub use client::*;
pub use config::*;
pub use endpoints::SiteEndpoints;
pub use error::*;
pub use error_codes::{classify, ServerErrorCode};
pub use folders::{FolderEnsurer, HierarchyEnsurer};
pub use publisher::{Publisher, MAX_ATTEMPTS, RETRY_DELAY};
pub use sources::{resolve, FileSource};
pub use types::*;
