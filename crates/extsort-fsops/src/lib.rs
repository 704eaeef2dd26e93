#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]

//! Concurrent sorting of a directory tree into per-extension folders.
//!
//! Layout: `classify.rs` (extension classifier), `resolver.rs` (per-key
//! destination directories), `copy.rs` (copy executor), `service.rs`
//! (`SortService` traversal orchestrator), `model` (entries, keys, summaries),
//! `error.rs` (`SortError`).

pub mod classify;
pub mod copy;
pub mod error;
pub mod model;
pub mod resolver;
pub mod service;

pub use classify::classify;
pub use copy::copy_file;
pub use error::{SortError, SortResult};
pub use model::{
    ClassificationKey, CopyFailure, CopyOutcome, FileEntry, NO_EXTENSION, RunState, SortRequest,
    SortSummary,
};
pub use resolver::DestinationResolver;
pub use service::SortService;
