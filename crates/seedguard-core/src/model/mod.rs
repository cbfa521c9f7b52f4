//! Safety-domain data carriers shared across the workspace.

use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::str::FromStr;
use uuid::Uuid;

/// A value loaded from a backing store together with its row timestamp,
/// used by the settings resolver for staleness comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Versioned<T> {
    /// The stored value.
    pub value: T,
    /// Timestamp the row was last written.
    pub updated_at: DateTime<Utc>,
}

impl<T> Versioned<T> {
    /// Wrap a value with its store timestamp.
    #[must_use]
    pub const fn new(value: T, updated_at: DateTime<Utc>) -> Self {
        Self { value, updated_at }
    }
}

/// Hit-and-Run obligation state tracked per (site, torrent).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HrCaseStatus {
    /// No HR rule applies to the torrent.
    None,
    /// The mandatory seeding obligation has been fulfilled.
    Safe,
    /// The torrent is inside its mandatory seeding window.
    Active,
}

impl HrCaseStatus {
    /// Render the status as its stored string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Safe => "SAFE",
            Self::Active => "ACTIVE",
        }
    }
}

impl FromStr for HrCaseStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NONE" => Ok(Self::None),
            "SAFE" => Ok(Self::Safe),
            "ACTIVE" => Ok(Self::Active),
            other => Err(anyhow!("invalid hr case status '{other}'")),
        }
    }
}

/// One Hit-and-Run case row, read-only to the policy engine. The external
/// tracking job owns the lifecycle; absence of a row means "no HR data".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HrCase {
    /// Site the obligation belongs to.
    pub site_key: String,
    /// Torrent identifier on that site.
    pub torrent_id: String,
    /// Current obligation state.
    pub status: HrCaseStatus,
    /// End of the mandatory seeding window, when known.
    pub deadline: Option<DateTime<Utc>>,
    /// Hours seeded so far, as reported by client telemetry.
    pub seeded_hours: Option<f64>,
    /// Current share ratio, as reported by client telemetry.
    pub current_ratio: Option<f64>,
    /// Hours the site requires before the obligation clears.
    pub requirement_hours: Option<f64>,
}

impl HrCase {
    /// Build the audit snapshot attached to decisions; optional fields are
    /// only present when the telemetry is known.
    #[must_use]
    pub fn snapshot(&self) -> Value {
        let mut map = Map::new();
        map.insert("status".into(), json!(self.status.as_str()));
        map.insert("torrent_id".into(), json!(self.torrent_id));
        if let Some(deadline) = self.deadline {
            map.insert("deadline".into(), json!(deadline.to_rfc3339()));
        }
        if let Some(seeded) = self.seeded_hours {
            map.insert("seeded_hours".into(), json!(seeded));
        }
        if let Some(ratio) = self.current_ratio {
            map.insert("current_ratio".into(), json!(ratio));
        }
        if let Some(required) = self.requirement_hours {
            map.insert("requirement_hours".into(), json!(required));
        }
        Value::Object(map)
    }
}

/// Installation-wide safety settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GlobalSafetySettings {
    /// Whether HR protection blocks apply at all.
    pub enable_hr_protection: bool,
    /// Minimum share ratio before a delete goes through unchallenged.
    pub min_ratio_for_delete: f64,
    /// Minimum hours a torrent should be kept seeding.
    pub min_keep_hours: f64,
    /// Whether HR-affecting moves should suggest a copy instead of denying.
    pub prefer_copy_on_move_for_hr: bool,
    /// Hours after which a pending confirmation may auto-approve.
    pub auto_approve_hours: f64,
}

impl Default for GlobalSafetySettings {
    fn default() -> Self {
        Self {
            enable_hr_protection: true,
            min_ratio_for_delete: 0.8,
            min_keep_hours: 24.0,
            prefer_copy_on_move_for_hr: true,
            auto_approve_hours: 2.0,
        }
    }
}

/// How strictly a tracker is known to enforce HR rules.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum HrSensitivity {
    /// Standard enforcement.
    #[default]
    Normal,
    /// Tracker is known to penalise aggressively; confirm risky downloads.
    HighlySensitive,
}

/// Per-site overrides layered over the global settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SiteSafetySettings {
    /// Site the overrides apply to.
    pub site_key: String,
    /// Enforcement sensitivity of the site.
    pub hr_sensitivity: HrSensitivity,
    /// Optional override for the minimum keep ratio.
    pub min_keep_ratio: Option<f64>,
    /// Optional override for the minimum keep time.
    pub min_keep_time_hours: Option<f64>,
}

/// Per-subscription overrides layered over the global settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubscriptionSafetySettings {
    /// Subscription the overrides apply to.
    pub subscription_id: Uuid,
    /// Whether the subscription accepts HR-encumbered releases at all.
    pub allow_hr: bool,
}

/// Fully merged settings view used by the evaluators. Site and subscription
/// values take precedence only for the fields they define; everything else
/// falls back to the global layer.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveSafetySettings {
    /// Whether HR protection blocks apply.
    pub enable_hr_protection: bool,
    /// Effective minimum ratio gating deletes.
    pub min_ratio_for_delete: f64,
    /// Effective minimum keep time in hours.
    pub min_keep_hours: f64,
    /// Whether HR-affecting moves suggest a copy instead of denying.
    pub prefer_copy_on_move_for_hr: bool,
    /// Hours until a pending confirmation may auto-approve.
    pub auto_approve_hours: f64,
    /// Enforcement sensitivity of the site (normal when no site layer).
    pub hr_sensitivity: HrSensitivity,
    /// Whether the subscription accepts HR releases (true when no layer).
    pub allow_hr: bool,
    /// Whether a subscription layer was present at all.
    pub has_subscription_layer: bool,
}

impl EffectiveSafetySettings {
    /// Merge the three settings layers into one effective view.
    #[must_use]
    pub fn merge(
        global: &GlobalSafetySettings,
        site: Option<&SiteSafetySettings>,
        subscription: Option<&SubscriptionSafetySettings>,
    ) -> Self {
        Self {
            enable_hr_protection: global.enable_hr_protection,
            min_ratio_for_delete: site
                .and_then(|s| s.min_keep_ratio)
                .unwrap_or(global.min_ratio_for_delete),
            min_keep_hours: site
                .and_then(|s| s.min_keep_time_hours)
                .unwrap_or(global.min_keep_hours),
            prefer_copy_on_move_for_hr: global.prefer_copy_on_move_for_hr,
            auto_approve_hours: global.auto_approve_hours,
            hr_sensitivity: site.map(|s| s.hr_sensitivity).unwrap_or_default(),
            allow_hr: subscription.is_none_or(|s| s.allow_hr),
            has_subscription_layer: subscription.is_some(),
        }
    }
}

/// Lifecycle action the caller wants to apply to a torrent.
///
/// The `Unknown` catch-all absorbs action names introduced by newer callers;
/// the engine fails open on it rather than refusing to deserialize.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SafetyAction {
    /// Admit a new torrent for download.
    Download,
    /// Delete the downloaded source files.
    Delete,
    /// Move or relocate the downloaded files.
    Move,
    /// Unattended cleanup of completed uploads.
    UploadCleanup,
    /// Generate a remote-play stub file.
    GenerateStrm,
    /// Action name this engine version does not know.
    #[serde(other)]
    Unknown,
}

impl SafetyAction {
    /// Render the action as its wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Download => "download",
            Self::Delete => "delete",
            Self::Move => "move",
            Self::UploadCleanup => "upload_cleanup",
            Self::GenerateStrm => "generate_strm",
            Self::Unknown => "unknown",
        }
    }
}

/// What initiated the evaluation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TriggerSource {
    /// An interactive user request from the web surface.
    #[default]
    UserWeb,
    /// An automated job (scheduler, cleanup runner).
    Auto,
}

/// Input describing one lifecycle action to be judged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyContext {
    /// The action being requested.
    pub action: SafetyAction,
    /// Site the torrent belongs to, when known.
    pub site_key: Option<String>,
    /// Torrent identifier on that site, when known.
    pub torrent_id: Option<String>,
    /// Subscription the request originated from, when any.
    pub subscription_id: Option<Uuid>,
    /// What initiated the evaluation.
    #[serde(default)]
    pub trigger: TriggerSource,
    /// Whether the operation would relocate the actively seeded path.
    #[serde(default)]
    pub changes_seeding_path: bool,
    /// Free-form caller metadata carried through for audit purposes.
    #[serde(default)]
    pub metadata: Value,
    /// Pre-fetched HR case, when the caller already looked it up.
    #[serde(skip)]
    pub hr_case: Option<HrCase>,
}

impl SafetyContext {
    /// Construct a context for the given action with everything else unset.
    #[must_use]
    pub const fn new(action: SafetyAction) -> Self {
        Self {
            action,
            site_key: None,
            torrent_id: None,
            subscription_id: None,
            trigger: TriggerSource::UserWeb,
            changes_seeding_path: false,
            metadata: Value::Null,
            hr_case: None,
        }
    }
}

/// Outcome class of a safety evaluation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    /// The action may proceed.
    Allow,
    /// The action is blocked.
    Deny,
    /// The action needs user confirmation (or the auto-approve timer).
    RequireConfirm,
}

impl Verdict {
    /// Render the verdict as its wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Allow => "ALLOW",
            Self::Deny => "DENY",
            Self::RequireConfirm => "REQUIRE_CONFIRM",
        }
    }
}

/// Why a decision came out the way it did.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    /// No rule objected.
    Safe,
    /// The HR obligation is already fulfilled.
    HrSafe,
    /// The safety engine feature flag is off.
    SettingsDisabled,
    /// Download blocked: torrent is inside its HR window.
    HrActiveDownload,
    /// Delete blocked: torrent is inside its HR window.
    HrActiveDelete,
    /// Move blocked: relocation would break active seeding.
    HrActiveMove,
    /// Automated cleanup skipped an HR-active torrent.
    HrActiveCleanup,
    /// Move would break seeding; a copy is suggested instead.
    HrMoveSuggestCopy,
    /// Subscription refuses HR releases; user must confirm.
    SubscriptionNoHr,
    /// Site penalises aggressively; user must confirm.
    SiteHighlySensitive,
    /// Share ratio is below the effective minimum; user must confirm.
    LowRatioWarning,
    /// Action name unknown to this engine version; failed open.
    UnknownAction,
    /// Evaluation failed internally; failed open with reduced confidence.
    ErrorOccurred,
}

impl ReasonCode {
    /// Render the reason as its wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Safe => "SAFE",
            Self::HrSafe => "HR_SAFE",
            Self::SettingsDisabled => "SETTINGS_DISABLED",
            Self::HrActiveDownload => "HR_ACTIVE_DOWNLOAD",
            Self::HrActiveDelete => "HR_ACTIVE_DELETE",
            Self::HrActiveMove => "HR_ACTIVE_MOVE",
            Self::HrActiveCleanup => "HR_ACTIVE_CLEANUP",
            Self::HrMoveSuggestCopy => "HR_MOVE_SUGGEST_COPY",
            Self::SubscriptionNoHr => "SUBSCRIPTION_NO_HR",
            Self::SiteHighlySensitive => "SITE_HIGHLY_SENSITIVE",
            Self::LowRatioWarning => "LOW_RATIO_WARNING",
            Self::UnknownAction => "UNKNOWN_ACTION",
            Self::ErrorOccurred => "ERROR_OCCURRED",
        }
    }

    /// The only verdict this reason may legally pair with.
    #[must_use]
    pub const fn expected_verdict(self) -> Verdict {
        match self {
            Self::Safe
            | Self::HrSafe
            | Self::SettingsDisabled
            | Self::UnknownAction
            | Self::ErrorOccurred => Verdict::Allow,
            Self::HrActiveDownload
            | Self::HrActiveDelete
            | Self::HrActiveMove
            | Self::HrActiveCleanup => Verdict::Deny,
            Self::HrMoveSuggestCopy
            | Self::SubscriptionNoHr
            | Self::SiteHighlySensitive
            | Self::LowRatioWarning => Verdict::RequireConfirm,
        }
    }
}

/// Result of one safety evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyDecision {
    /// Outcome class.
    pub verdict: Verdict,
    /// Why the decision came out this way.
    pub reason_code: ReasonCode,
    /// Human-readable explanation rendered to the user.
    pub message: String,
    /// Machine-readable alternative the caller may offer (e.g. `copy`).
    pub suggested_alternative: Option<String>,
    /// HR state captured at decision time, for audit.
    pub hr_status_snapshot: Option<Value>,
    /// 1.0 for deterministic outcomes; lowered only on degraded paths.
    pub confidence: f64,
    /// Whether an interactive confirmation is pending.
    pub requires_user_action: bool,
    /// Instant after which the caller may treat the confirm as approved.
    pub auto_approve_after: Option<DateTime<Utc>>,
    /// Wall-clock evaluation time, stamped by the engine.
    pub processing_time_ms: f64,
}

impl SafetyDecision {
    /// An `ALLOW` decision with full confidence.
    #[must_use]
    pub fn allow(reason_code: ReasonCode, message: impl Into<String>) -> Self {
        Self {
            verdict: Verdict::Allow,
            reason_code,
            message: message.into(),
            suggested_alternative: None,
            hr_status_snapshot: None,
            confidence: 1.0,
            requires_user_action: false,
            auto_approve_after: None,
            processing_time_ms: 0.0,
        }
    }

    /// A `DENY` decision with full confidence.
    #[must_use]
    pub fn deny(reason_code: ReasonCode, message: impl Into<String>) -> Self {
        Self {
            verdict: Verdict::Deny,
            ..Self::allow(reason_code, message)
        }
    }

    /// A `REQUIRE_CONFIRM` decision; always carries the auto-approve instant
    /// and flags that user action is pending.
    #[must_use]
    pub fn require_confirm(
        reason_code: ReasonCode,
        message: impl Into<String>,
        auto_approve_after: DateTime<Utc>,
    ) -> Self {
        Self {
            verdict: Verdict::RequireConfirm,
            requires_user_action: true,
            auto_approve_after: Some(auto_approve_after),
            ..Self::allow(reason_code, message)
        }
    }

    /// Attach an HR audit snapshot.
    #[must_use]
    pub fn with_snapshot(mut self, snapshot: Value) -> Self {
        self.hr_status_snapshot = Some(snapshot);
        self
    }

    /// Attach a suggested alternative operation.
    #[must_use]
    pub fn with_alternative(mut self, alternative: impl Into<String>) -> Self {
        self.suggested_alternative = Some(alternative.into());
        self
    }

    /// Override the confidence value (degraded paths only).
    #[must_use]
    pub const fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    /// Whether the decision honours the reason/verdict and auto-approve
    /// invariants.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.reason_code.expected_verdict() == self.verdict
            && (self.auto_approve_after.is_some() == (self.verdict == Verdict::RequireConfirm))
    }
}

/// A release candidate subject to HR and quality filtering.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Candidate {
    /// Release title as listed on the site.
    pub title: String,
    /// HR marker parsed from the listing (`NONE`, `HR`, `H&R`, `H3`, ...).
    #[serde(default)]
    pub hr_level: String,
    /// Source quality marker (`REMUX`, `WEB-DL`, `CAM`, ...).
    #[serde(default)]
    pub source_quality: String,
    /// Resolution marker (`2160p`, `1080p`, ...).
    #[serde(default)]
    pub resolution: String,
    /// HDR marker (`HDR10`, `Dolby Vision`, empty for SDR).
    #[serde(default)]
    pub hdr: String,
    /// Codec marker (`x265`, `H.264`, ...).
    #[serde(default)]
    pub codec: String,
    /// Languages of the embedded or bundled subtitle tracks.
    #[serde(default)]
    pub subtitle_langs: Vec<String>,
    /// Languages of the audio tracks.
    #[serde(default)]
    pub audio_langs: Vec<String>,
}

/// HR exposure policy applied when filtering candidates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HrPolicy {
    /// Pass every candidate through.
    Ignore,
    /// Drop candidates carrying an explicit HR marker.
    SafeSkip,
    /// Additionally drop graded and unknown HR markers.
    StrictSkip,
}

/// Named risk preset, most conservative first.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RiskMode {
    /// Seed-safety mode: strict filters, no seeding-breaking moves.
    #[serde(rename = "A_SAFE")]
    ASafe,
    /// Balanced defaults.
    #[serde(rename = "B_BALANCED")]
    BBalanced,
    /// Unlocked selection, but moves are forcibly downgraded.
    #[serde(rename = "C_PRO")]
    CPro,
}

impl RiskMode {
    /// Render the mode as its stored representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ASafe => "A_SAFE",
            Self::BBalanced => "B_BALANCED",
            Self::CPro => "C_PRO",
        }
    }
}

impl FromStr for RiskMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A_SAFE" => Ok(Self::ASafe),
            "B_BALANCED" => Ok(Self::BBalanced),
            "C_PRO" => Ok(Self::CPro),
            other => Err(anyhow!("invalid risk mode '{other}'")),
        }
    }
}

/// How the resolution tier constrains candidates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResolutionPolicy {
    /// Accept the tier and everything below it.
    Auto,
    /// Reject anything above the tier only.
    MaxTier,
    /// Require an exact tier match.
    FixedTier,
}

/// Resolution tiers recognised by the quality rules.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum ResolutionTier {
    /// Up to 720p.
    #[serde(rename = "LOW_720P")]
    Low720p,
    /// Up to 1080p.
    #[serde(rename = "MID_1080P")]
    Mid1080p,
    /// Up to 4K/2160p.
    #[serde(rename = "HIGH_4K")]
    High4k,
}

/// Source quality gate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceQualityPolicy {
    /// No source gate.
    Any,
    /// Reject obvious low-quality captures (CAM/TS/TC/workprint).
    NoTrash,
    /// Require REMUX/Blu-ray/UHD or high-bitrate WEB-DL.
    HighOnly,
}

/// HDR gate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HdrPolicy {
    /// No HDR gate.
    Any,
    /// Prefer HDR but never reject.
    HdrPreferred,
    /// Reject any HDR or Dolby Vision marker.
    SdrOnly,
}

/// Codec preference. Never rejects; recorded for ranking only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CodecPolicy {
    /// No preference.
    Any,
    /// Prefer HEVC releases.
    PreferH265,
    /// Prefer AVC releases.
    PreferH264,
}

/// Subtitle requirement.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubtitlePolicy {
    /// No subtitle gate.
    Any,
    /// Require a Chinese-language subtitle track.
    RequireZh,
}

/// Audio language gate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AudioLangPolicy {
    /// No audio gate.
    Any,
    /// Prefer original language with multiple tracks; never rejects.
    OriginalPreferred,
    /// Reject releases whose only audio track is a Mandarin dub.
    AvoidMandarinOnly,
}

/// 3D gate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExtraFeaturePolicy {
    /// Accept 3D releases.
    Allow3d,
    /// Reject titles carrying 3D/SBS/OU markers.
    Forbid3d,
}

/// Concrete file-operation mode used by the transfer executor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FileMoveBehavior {
    /// Relocate the payload, removing the source.
    Move,
    /// Duplicate the payload, keeping the source seeding.
    Copy,
    /// Hard-link into the library; source keeps seeding.
    Hardlink,
    /// Soft-link into the library; source keeps seeding.
    Softlink,
    /// Only produce a remote-play stub; no payload bytes touched.
    StrmOnly,
}

impl FileMoveBehavior {
    /// Render the behaviour as its stored representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Move => "move",
            Self::Copy => "copy",
            Self::Hardlink => "hardlink",
            Self::Softlink => "softlink",
            Self::StrmOnly => "strm_only",
        }
    }
}

/// Static preset bundled under a risk mode.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RiskModeProfile {
    /// The mode this profile belongs to.
    pub mode: RiskMode,
    /// HR exposure policy.
    pub hr_policy: HrPolicy,
    /// Resolution constraint policy.
    pub resolution_policy: ResolutionPolicy,
    /// Resolution tier the policy operates on.
    pub resolution_tier: ResolutionTier,
    /// Source quality gate.
    pub source_quality_policy: SourceQualityPolicy,
    /// HDR gate.
    pub hdr_policy: HdrPolicy,
    /// Codec preference.
    pub codec_policy: CodecPolicy,
    /// Subtitle requirement.
    pub subtitle_policy: SubtitlePolicy,
    /// Audio language gate.
    pub audio_lang_policy: AudioLangPolicy,
    /// 3D gate.
    pub extra_feature_policy: ExtraFeaturePolicy,
}
