//! PostgreSQL data access for the seedguard policy engine.
//!
//! `safety.rs` holds the row projections and the [`SafetyStore`] implementing
//! the core repository traits; `error.rs` the typed data-layer errors. The
//! engine reads settings and HR cases through the trait seams only — it never
//! mutates HR state, so this layer needs no transactional discipline beyond
//! single-statement upserts for settings and the risk-mode row.

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
#![allow(clippy::module_name_repetitions, clippy::multiple_crate_versions)]

pub mod error;
pub mod safety;

pub use error::{DataError, Result};
pub use safety::{SafetyStore, run_migrations};
