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

//! Validated run settings for the extsort workspace.
//!
//! Layout: `model.rs` (raw and validated settings), `validate.rs`
//! (validation/parsing helpers), `defaults.rs` (default values), `error.rs`
//! (`ConfigError`).

pub mod defaults;
pub mod error;
pub mod model;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use model::{LoggingSettings, RawSettings, SortSettings};
