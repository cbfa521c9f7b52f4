//! Core seeding-safety domain types and repository interfaces.
//!
//! Layout follows the workspace convention: `model` holds the pure data
//! carriers (HR cases, settings layers, contexts, decisions, candidates),
//! `service` holds the async trait seams implemented by storage adapters.

pub mod model;
pub mod service;

pub use model::{
    AudioLangPolicy, Candidate, CodecPolicy, EffectiveSafetySettings, ExtraFeaturePolicy,
    FileMoveBehavior, GlobalSafetySettings, HdrPolicy, HrCase, HrCaseStatus, HrPolicy,
    HrSensitivity, ReasonCode, ResolutionPolicy, ResolutionTier, RiskMode, RiskModeProfile,
    SafetyAction, SafetyContext, SafetyDecision, SiteSafetySettings, SourceQualityPolicy,
    SubscriptionSafetySettings, SubtitlePolicy, TriggerSource, Verdict, Versioned,
};
pub use service::{
    FEATURE_SAFETY_ENGINE, FeatureFlagProvider, HrCaseRepository, RiskModeStore,
    SettingsRepository,
};
