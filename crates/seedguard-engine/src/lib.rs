//! Decision core of the seedguard policy engine.
//!
//! `engine` hosts the [`SafetyPolicyEngine`] that judges lifecycle actions
//! against HR state and the layered settings; `orchestrator` composes the
//! engine with the risk-mode presets into the surface callers wire up.

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

pub mod engine;
pub mod orchestrator;

pub use engine::SafetyPolicyEngine;
pub use orchestrator::PolicyOrchestrator;
