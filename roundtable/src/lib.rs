//! Roundtable: an iterative multi-reviewer document refinement engine.
//!
//! A caller supplies a document and a set of reviewer/moderator/
//! meta-planner agents; the engine drives rounds of parallel review
//! followed by moderator synthesis until a convergence rule says to
//! stop. See `SPEC_FULL.md` for the full component design.
//!
//! ```ignore
//! use roundtable::{Config, RoundtableEngine};
//! use roundtable::runtime::AgentSet;
//! use roundtable::store::FsStore;
//! use std::sync::Arc;
//!
//! let store = Arc::new(FsStore::new("./roundtable-data"));
//! let engine = RoundtableEngine::new(store, agents);
//! let config = Config::new("draft document text", 8)?;
//! let handle = engine.start(config).await?;
//! let session = handle.join().await?;
//! ```

#![allow(clippy::uninlined_format_args)]

pub mod agents;
pub mod config;
pub mod convergence;
pub mod entry;
pub mod error;
pub mod events;
pub mod llm;
pub mod model;
pub mod runtime;
pub mod store;

pub use config::Config;
pub use entry::RoundtableEngine;
pub use error::{RoundtableError, RoundtableResult};
