//! Pure rule evaluation for the seedguard policy engine.
//!
//! Everything in this crate is a deterministic function over value objects:
//! HR-policy and quality filtering of release candidates (`quality`), the
//! static risk-mode presets (`profile`), and the file-move behaviour
//! resolver (`behavior`). No I/O happens here; the engine and orchestrator
//! wire these functions to stored state.

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

pub mod behavior;
pub mod profile;
pub mod quality;

pub use behavior::resolve_move_behavior;
pub use profile::{ModeProfileInfo, mode_profile, mode_profiles, mode_warnings};
pub use quality::{QualityRule, apply_quality_rules, filter_by_hr_policy, quality_rejection};
