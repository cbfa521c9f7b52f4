//! Static risk-mode presets and their user-facing descriptions.

use seedguard_core::model::{
    AudioLangPolicy, CodecPolicy, ExtraFeaturePolicy, HdrPolicy, HrPolicy, ResolutionPolicy,
    ResolutionTier, RiskMode, RiskModeProfile, SourceQualityPolicy, SubtitlePolicy,
};
use serde::Serialize;

/// Resolve the static preset for a risk mode.
#[must_use]
pub const fn mode_profile(mode: RiskMode) -> RiskModeProfile {
    match mode {
        RiskMode::ASafe => RiskModeProfile {
            mode,
            hr_policy: HrPolicy::StrictSkip,
            resolution_policy: ResolutionPolicy::MaxTier,
            resolution_tier: ResolutionTier::Mid1080p,
            source_quality_policy: SourceQualityPolicy::NoTrash,
            hdr_policy: HdrPolicy::SdrOnly,
            codec_policy: CodecPolicy::Any,
            subtitle_policy: SubtitlePolicy::Any,
            audio_lang_policy: AudioLangPolicy::Any,
            extra_feature_policy: ExtraFeaturePolicy::Forbid3d,
        },
        RiskMode::BBalanced => RiskModeProfile {
            mode,
            hr_policy: HrPolicy::SafeSkip,
            resolution_policy: ResolutionPolicy::Auto,
            resolution_tier: ResolutionTier::High4k,
            source_quality_policy: SourceQualityPolicy::NoTrash,
            hdr_policy: HdrPolicy::Any,
            codec_policy: CodecPolicy::Any,
            subtitle_policy: SubtitlePolicy::Any,
            audio_lang_policy: AudioLangPolicy::Any,
            extra_feature_policy: ExtraFeaturePolicy::Forbid3d,
        },
        RiskMode::CPro => RiskModeProfile {
            mode,
            hr_policy: HrPolicy::Ignore,
            resolution_policy: ResolutionPolicy::Auto,
            resolution_tier: ResolutionTier::High4k,
            source_quality_policy: SourceQualityPolicy::Any,
            hdr_policy: HdrPolicy::HdrPreferred,
            codec_policy: CodecPolicy::Any,
            subtitle_policy: SubtitlePolicy::Any,
            audio_lang_policy: AudioLangPolicy::OriginalPreferred,
            extra_feature_policy: ExtraFeaturePolicy::Forbid3d,
        },
    }
}

/// User-facing caveats shown when a mode is selected.
#[must_use]
pub fn mode_warnings(mode: RiskMode) -> Vec<&'static str> {
    match mode {
        RiskMode::ASafe => vec![
            "Stub generation is allowed",
            "Local transfers are limited to copy and hardlink",
            "Cloud move-uploads are blocked",
        ],
        RiskMode::BBalanced => vec![
            "Stub generation is allowed",
            "Local moves are allowed",
            "Cloud moves are allowed",
        ],
        RiskMode::CPro => vec![
            "Move-based tidying is force-disabled in this mode so relocations cannot break active seeding; use with care",
            "Stub generation is allowed",
            "Local moves are downgraded to copy or hardlink",
            "Cloud moves are downgraded to copy",
        ],
    }
}

/// Short display name for the mode.
#[must_use]
pub const fn mode_name(mode: RiskMode) -> &'static str {
    match mode {
        RiskMode::ASafe => "A - seed safe",
        RiskMode::BBalanced => "B - balanced",
        RiskMode::CPro => "C - pro",
    }
}

/// One-line description of what the mode trades off.
#[must_use]
pub const fn mode_description(mode: RiskMode) -> &'static str {
    match mode {
        RiskMode::ASafe => {
            "Strict HR skipping, 1080p cap, no 3D, transfers default to copy/hardlink"
        }
        RiskMode::BBalanced => "Balanced defaults: 4K allowed, move-based tidying kept",
        RiskMode::CPro => {
            "Unlocked release selection, but moves are force-downgraded to protect seeding"
        }
    }
}

/// Display bundle for the configuration UI.
#[derive(Debug, Clone, Serialize)]
pub struct ModeProfileInfo {
    /// The mode described.
    pub mode: RiskMode,
    /// Short display name.
    pub name: &'static str,
    /// One-line description.
    pub description: &'static str,
    /// The concrete preset.
    pub profile: RiskModeProfile,
    /// User-facing caveats.
    pub warnings: Vec<&'static str>,
}

/// All modes with their presets and caveats, most conservative first.
#[must_use]
pub fn mode_profiles() -> Vec<ModeProfileInfo> {
    [RiskMode::ASafe, RiskMode::BBalanced, RiskMode::CPro]
        .into_iter()
        .map(|mode| ModeProfileInfo {
            mode,
            name: mode_name(mode),
            description: mode_description(mode),
            profile: mode_profile(mode),
            warnings: mode_warnings(mode),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_match_their_modes() {
        for mode in [RiskMode::ASafe, RiskMode::BBalanced, RiskMode::CPro] {
            assert_eq!(mode_profile(mode).mode, mode);
        }
    }

    #[test]
    fn safe_mode_is_the_strictest_preset() {
        let safe = mode_profile(RiskMode::ASafe);
        assert_eq!(safe.hr_policy, HrPolicy::StrictSkip);
        assert_eq!(safe.hdr_policy, HdrPolicy::SdrOnly);
        assert_eq!(safe.resolution_tier, ResolutionTier::Mid1080p);

        let pro = mode_profile(RiskMode::CPro);
        assert_eq!(pro.hr_policy, HrPolicy::Ignore);
        assert_eq!(pro.source_quality_policy, SourceQualityPolicy::Any);
    }

    #[test]
    fn every_mode_forbids_3d_by_default() {
        for mode in [RiskMode::ASafe, RiskMode::BBalanced, RiskMode::CPro] {
            assert_eq!(
                mode_profile(mode).extra_feature_policy,
                ExtraFeaturePolicy::Forbid3d
            );
        }
    }

    #[test]
    fn profiles_listing_is_ordered_and_annotated() {
        let profiles = mode_profiles();
        assert_eq!(profiles.len(), 3);
        assert_eq!(profiles[0].mode, RiskMode::ASafe);
        assert_eq!(profiles[2].mode, RiskMode::CPro);
        assert!(profiles.iter().all(|info| !info.warnings.is_empty()));
    }
}
