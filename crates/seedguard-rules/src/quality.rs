//! HR-policy and quality filtering of release candidates.
//!
//! Each check is an independent boolean predicate; a candidate is kept only
//! when every check passes, and the first failing check names the rejection.
//! Check order therefore affects logging only, never the accepted set.

use once_cell::sync::Lazy;
use regex::Regex;
use seedguard_core::model::{
    AudioLangPolicy, Candidate, ExtraFeaturePolicy, HdrPolicy, HrPolicy, ResolutionPolicy,
    ResolutionTier, RiskModeProfile, SourceQualityPolicy, SubtitlePolicy,
};
use tracing::info;

/// HR markers dropped by `SAFE_SKIP`.
const HR_MARKERS: &[&str] = &["H&R", "HR"];
/// Additional markers dropped by `STRICT_SKIP` (graded and unknown rules).
const STRICT_MARKERS: &[&str] = &["H3", "H5", "UNKNOWN"];

const TRASH_SOURCES: &[&str] = &["cam", "ts", "tc", "workprint", "wp"];
const HIGH_SOURCES: &[&str] = &["remux", "bluray", "bd", "uhd", "web-dl", "webrip"];

/// Word-boundary 3D markers; bare substring matching would reject every
/// title containing "ou".
static THREE_D_MARKERS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(3d|h?sbs|h?ou)\b").expect("static 3d marker pattern"));

/// Which quality check rejected a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityRule {
    /// Source-quality gate.
    SourceQuality,
    /// Resolution-tier gate.
    Resolution,
    /// HDR gate.
    Hdr,
    /// Subtitle requirement.
    Subtitle,
    /// Audio-language gate.
    AudioLang,
    /// 3D gate.
    ExtraFeature,
}

impl QualityRule {
    /// Metric/log label for the rule.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SourceQuality => "source_quality",
            Self::Resolution => "resolution",
            Self::Hdr => "hdr",
            Self::Subtitle => "subtitle",
            Self::AudioLang => "audio_lang",
            Self::ExtraFeature => "extra_feature",
        }
    }
}

/// Filter a candidate list by HR exposure policy.
///
/// `IGNORE` passes everything; `SAFE_SKIP` drops explicit HR markers;
/// `STRICT_SKIP` additionally drops graded and unknown markers. Idempotent:
/// filtering an already-filtered list yields the same list.
#[must_use]
pub fn filter_by_hr_policy(candidates: Vec<Candidate>, policy: HrPolicy) -> Vec<Candidate> {
    if policy == HrPolicy::Ignore {
        return candidates;
    }

    let before = candidates.len();
    let kept: Vec<Candidate> = candidates
        .into_iter()
        .filter(|candidate| {
            let level = candidate.hr_level.as_str();
            let mut skip = HR_MARKERS.contains(&level);
            if policy == HrPolicy::StrictSkip {
                skip = skip || STRICT_MARKERS.contains(&level);
            }
            !skip
        })
        .collect();

    info!(
        policy = ?policy,
        skipped = before - kept.len(),
        kept = kept.len(),
        "hr policy filter applied"
    );
    kept
}

/// Return the first quality rule a candidate fails under the profile, or
/// `None` when the candidate passes every check.
#[must_use]
pub fn quality_rejection(candidate: &Candidate, profile: &RiskModeProfile) -> Option<QualityRule> {
    if !check_source_quality(candidate, profile.source_quality_policy) {
        return Some(QualityRule::SourceQuality);
    }
    if !check_resolution(
        candidate,
        profile.resolution_policy,
        profile.resolution_tier,
    ) {
        return Some(QualityRule::Resolution);
    }
    if !check_hdr(candidate, profile.hdr_policy) {
        return Some(QualityRule::Hdr);
    }
    // Codec policy is a preference, never a filter.
    if !check_subtitle(candidate, profile.subtitle_policy) {
        return Some(QualityRule::Subtitle);
    }
    if !check_audio_lang(candidate, profile.audio_lang_policy) {
        return Some(QualityRule::AudioLang);
    }
    if !check_3d(candidate, profile.extra_feature_policy) {
        return Some(QualityRule::ExtraFeature);
    }
    None
}

/// Apply the full quality rule chain of a profile, keeping the survivors.
#[must_use]
pub fn apply_quality_rules(candidates: Vec<Candidate>, profile: &RiskModeProfile) -> Vec<Candidate> {
    let before = candidates.len();
    let kept: Vec<Candidate> = candidates
        .into_iter()
        .filter(|candidate| quality_rejection(candidate, profile).is_none())
        .collect();

    info!(
        mode = profile.mode.as_str(),
        skipped = before - kept.len(),
        kept = kept.len(),
        "quality rules applied"
    );
    kept
}

fn check_source_quality(candidate: &Candidate, policy: SourceQualityPolicy) -> bool {
    let quality = candidate.source_quality.to_lowercase();
    match policy {
        SourceQualityPolicy::Any => true,
        SourceQualityPolicy::NoTrash => !TRASH_SOURCES.iter().any(|trash| quality.contains(trash)),
        SourceQualityPolicy::HighOnly => HIGH_SOURCES.iter().any(|high| quality.contains(high)),
    }
}

fn check_resolution(candidate: &Candidate, policy: ResolutionPolicy, tier: ResolutionTier) -> bool {
    let resolution = candidate.resolution.to_lowercase();
    let is_4k = resolution.contains("4k") || resolution.contains("2160p");
    let is_1080 = resolution.contains("1080p");
    let is_720_or_less = resolution.contains("720p") || resolution.contains("480p");

    match policy {
        // The tier and everything below it.
        ResolutionPolicy::Auto => match tier {
            ResolutionTier::Low720p => is_720_or_less,
            ResolutionTier::Mid1080p => is_1080 || is_720_or_less,
            ResolutionTier::High4k => is_4k || is_1080,
        },
        // Only rejects what is above the tier.
        ResolutionPolicy::MaxTier => match tier {
            ResolutionTier::Low720p => !(is_1080 || is_4k),
            ResolutionTier::Mid1080p => !is_4k,
            ResolutionTier::High4k => true,
        },
        // Exact tier match.
        ResolutionPolicy::FixedTier => match tier {
            ResolutionTier::Low720p => is_720_or_less,
            ResolutionTier::Mid1080p => is_1080,
            ResolutionTier::High4k => is_4k,
        },
    }
}

fn check_hdr(candidate: &Candidate, policy: HdrPolicy) -> bool {
    match policy {
        HdrPolicy::Any | HdrPolicy::HdrPreferred => true,
        HdrPolicy::SdrOnly => {
            let hdr = candidate.hdr.to_lowercase();
            !(hdr.contains("hdr") || hdr.contains("dolby vision") || hdr.contains("dv"))
        }
    }
}

fn check_subtitle(candidate: &Candidate, policy: SubtitlePolicy) -> bool {
    match policy {
        SubtitlePolicy::Any => true,
        SubtitlePolicy::RequireZh => candidate.subtitle_langs.iter().any(|lang| {
            let lang = lang.to_lowercase();
            lang.contains("zh") || lang.contains("chinese") || lang.contains('中')
        }),
    }
}

fn check_audio_lang(candidate: &Candidate, policy: AudioLangPolicy) -> bool {
    match policy {
        AudioLangPolicy::Any | AudioLangPolicy::OriginalPreferred => true,
        AudioLangPolicy::AvoidMandarinOnly => {
            if let [only] = candidate.audio_langs.as_slice() {
                let lang = only.to_lowercase();
                !(lang.contains("mandarin") || lang.contains("国语") || lang.contains("中文"))
            } else {
                true
            }
        }
    }
}

fn check_3d(candidate: &Candidate, policy: ExtraFeaturePolicy) -> bool {
    match policy {
        ExtraFeaturePolicy::Allow3d => true,
        ExtraFeaturePolicy::Forbid3d => !THREE_D_MARKERS.is_match(&candidate.title),
    }
}
