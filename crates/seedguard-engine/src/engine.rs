//! The safety policy evaluation engine.
//!
//! `evaluate` never returns an error: the internal pipeline runs as a
//! `Result` and the sole conversion point at the public boundary turns any
//! failure into an `ALLOW`/`ERROR_OCCURRED` decision with reduced confidence.
//! A safety check that cannot run must not become an outage; the distinct
//! reason code and the 0.5 confidence let auditors tell degraded-mode allows
//! from genuine ones.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Duration, Utc};
use seedguard_core::model::{
    EffectiveSafetySettings, HrCase, HrCaseStatus, HrSensitivity, ReasonCode, SafetyAction,
    SafetyContext, SafetyDecision, Verdict,
};
use seedguard_core::service::{FEATURE_SAFETY_ENGINE, FeatureFlagProvider, HrCaseRepository};
use seedguard_events::{Event, EventBus};
use seedguard_settings::SafetySettingsResolver;
use seedguard_telemetry::Metrics;
use tracing::{error, info, warn};

/// Decision engine combining HR state, layered settings, and per-action rules.
#[derive(Clone)]
pub struct SafetyPolicyEngine {
    settings: SafetySettingsResolver,
    hr_cases: Arc<dyn HrCaseRepository>,
    flags: Arc<dyn FeatureFlagProvider>,
    events: EventBus,
    metrics: Metrics,
}

impl SafetyPolicyEngine {
    /// Wire the engine to its stores, flag provider, and observability sinks.
    #[must_use]
    pub const fn new(
        settings: SafetySettingsResolver,
        hr_cases: Arc<dyn HrCaseRepository>,
        flags: Arc<dyn FeatureFlagProvider>,
        events: EventBus,
        metrics: Metrics,
    ) -> Self {
        Self {
            settings,
            hr_cases,
            flags,
            events,
            metrics,
        }
    }

    /// Judge a lifecycle action. Infallible by design: internal failures
    /// surface as `ALLOW`/`ERROR_OCCURRED` with confidence 0.5.
    pub async fn evaluate(&self, ctx: &SafetyContext) -> SafetyDecision {
        let started = Instant::now();

        // The sole fail-open conversion point: internal errors become a
        // degraded ALLOW here and nowhere else.
        let mut decision = self.try_evaluate(ctx).await.unwrap_or_else(|err| {
            error!(
                action = ctx.action.as_str(),
                error = %format!("{err:#}"),
                "safety evaluation failed; failing open"
            );
            self.metrics.inc_decision_error();
            SafetyDecision::allow(
                ReasonCode::ErrorOccurred,
                format!("safety evaluation failed, allowing the action: {err:#}"),
            )
            .with_confidence(0.5)
        });

        decision.processing_time_ms = elapsed_ms(started);
        self.finalize(ctx, decision)
    }

    /// Evaluate a batch of contexts; the result order matches the input
    /// order. Contexts are independent of each other.
    pub async fn batch_evaluate(&self, contexts: &[SafetyContext]) -> Vec<SafetyDecision> {
        let mut decisions = Vec::with_capacity(contexts.len());
        for ctx in contexts {
            decisions.push(self.evaluate(ctx).await);
        }
        decisions
    }

    async fn try_evaluate(&self, ctx: &SafetyContext) -> anyhow::Result<SafetyDecision> {
        // Feature gate: a flag-provider failure counts as "off", not as an
        // evaluation error.
        let enabled = self
            .flags
            .is_enabled(FEATURE_SAFETY_ENGINE)
            .await
            .unwrap_or(false);
        if !enabled {
            return Ok(SafetyDecision::allow(
                ReasonCode::SettingsDisabled,
                "safety engine is disabled",
            ));
        }

        let global = self.settings.get_global().await?;
        let site = match ctx.site_key.as_deref() {
            Some(site_key) => self.settings.get_site(site_key).await?,
            None => None,
        };
        let subscription = match ctx.subscription_id {
            Some(subscription_id) => self.settings.get_subscription(subscription_id).await?,
            None => None,
        };
        let effective =
            EffectiveSafetySettings::merge(&global, site.as_ref(), subscription.as_ref());

        let hr_case = match (&ctx.hr_case, &ctx.site_key, &ctx.torrent_id) {
            // Caller pre-fetch wins over a repository lookup.
            (Some(case), _, _) => Some(case.clone()),
            (None, Some(site_key), Some(torrent_id)) => {
                self.hr_cases.find(site_key, torrent_id).await?
            }
            _ => None,
        };

        let decision = match ctx.action {
            SafetyAction::Download => evaluate_download(&effective, hr_case.as_ref()),
            SafetyAction::Delete => evaluate_delete(&effective, hr_case.as_ref()),
            SafetyAction::Move => {
                evaluate_move(&effective, hr_case.as_ref(), ctx.changes_seeding_path)
            }
            SafetyAction::UploadCleanup => evaluate_upload_cleanup(hr_case.as_ref()),
            SafetyAction::GenerateStrm => evaluate_generate_strm(hr_case.as_ref()),
            SafetyAction::Unknown => {
                warn!("unknown safety action; failing open");
                SafetyDecision::allow(ReasonCode::UnknownAction, "unknown action type, allowing")
            }
        };

        Ok(decision)
    }

    fn finalize(&self, ctx: &SafetyContext, decision: SafetyDecision) -> SafetyDecision {
        let site = ctx.site_key.as_deref().unwrap_or("-");
        let torrent = ctx.torrent_id.as_deref().unwrap_or("-");
        if decision.verdict == Verdict::Deny {
            warn!(
                action = ctx.action.as_str(),
                decision = decision.verdict.as_str(),
                reason = decision.reason_code.as_str(),
                site,
                torrent,
                elapsed_ms = decision.processing_time_ms,
                "safety decision"
            );
        } else {
            info!(
                action = ctx.action.as_str(),
                decision = decision.verdict.as_str(),
                reason = decision.reason_code.as_str(),
                site,
                torrent,
                elapsed_ms = decision.processing_time_ms,
                "safety decision"
            );
        }

        self.metrics
            .inc_decision(ctx.action.as_str(), decision.verdict.as_str());
        let _ = self.events.publish(Event::DecisionRecorded {
            action: ctx.action.as_str().to_string(),
            verdict: decision.verdict.as_str().to_string(),
            reason: decision.reason_code.as_str().to_string(),
            site_key: ctx.site_key.clone(),
            torrent_id: ctx.torrent_id.clone(),
        });
        self.metrics.inc_event("decision_recorded");

        decision
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1_000.0
}

fn auto_approve_at(hours: f64) -> DateTime<Utc> {
    let seconds = (hours * 3_600.0).round();
    #[expect(
        clippy::cast_possible_truncation,
        reason = "value is bounded to a week before casting"
    )]
    let seconds = if seconds.is_finite() && (0.0..=604_800.0).contains(&seconds) {
        seconds as i64
    } else {
        0
    };
    Utc::now() + Duration::seconds(seconds)
}

fn active_case(hr_case: Option<&HrCase>) -> Option<&HrCase> {
    hr_case.filter(|case| case.status == HrCaseStatus::Active)
}

fn evaluate_download(
    effective: &EffectiveSafetySettings,
    hr_case: Option<&HrCase>,
) -> SafetyDecision {
    if effective.enable_hr_protection
        && let Some(case) = active_case(hr_case)
    {
        return SafetyDecision::deny(
            ReasonCode::HrActiveDownload,
            "torrent is inside its HR window; download blocked",
        )
        .with_snapshot(case.snapshot());
    }

    // A subscription that refuses HR blocks on any tracked case, whatever
    // its status.
    if effective.has_subscription_layer && !effective.allow_hr
        && let Some(case) = hr_case
    {
        return SafetyDecision::require_confirm(
            ReasonCode::SubscriptionNoHr,
            "subscription does not accept HR torrents; confirmation required",
            auto_approve_at(effective.auto_approve_hours),
        )
        .with_snapshot(case.snapshot());
    }

    if effective.hr_sensitivity == HrSensitivity::HighlySensitive
        && hr_case.is_some_and(|case| case.status != HrCaseStatus::None)
    {
        return SafetyDecision::require_confirm(
            ReasonCode::SiteHighlySensitive,
            "site penalises HR violations aggressively; confirm before downloading",
            auto_approve_at(effective.auto_approve_hours),
        );
    }

    SafetyDecision::allow(ReasonCode::Safe, "download allowed")
}

fn evaluate_delete(
    effective: &EffectiveSafetySettings,
    hr_case: Option<&HrCase>,
) -> SafetyDecision {
    if let Some(case) = active_case(hr_case) {
        return SafetyDecision::deny(
            ReasonCode::HrActiveDelete,
            "torrent is inside its HR window; source files must keep seeding",
        )
        .with_snapshot(case.snapshot());
    }

    if let Some(case) = hr_case
        && let Some(ratio) = case.current_ratio
        && ratio < effective.min_ratio_for_delete
    {
        return SafetyDecision::require_confirm(
            ReasonCode::LowRatioWarning,
            format!(
                "current ratio {ratio:.2} is below the required minimum {:.2}; confirm deletion",
                effective.min_ratio_for_delete
            ),
            auto_approve_at(effective.auto_approve_hours),
        )
        .with_snapshot(case.snapshot());
    }

    SafetyDecision::allow(ReasonCode::Safe, "delete allowed")
}

fn evaluate_move(
    effective: &EffectiveSafetySettings,
    hr_case: Option<&HrCase>,
    changes_seeding_path: bool,
) -> SafetyDecision {
    if changes_seeding_path
        && let Some(case) = active_case(hr_case)
    {
        if effective.prefer_copy_on_move_for_hr {
            return SafetyDecision::require_confirm(
                ReasonCode::HrMoveSuggestCopy,
                "moving would break active seeding; copying to the destination is suggested",
                auto_approve_at(effective.auto_approve_hours),
            )
            .with_alternative("copy")
            .with_snapshot(case.snapshot());
        }
        return SafetyDecision::deny(
            ReasonCode::HrActiveMove,
            "moving the seeding path is blocked while the HR window is active",
        )
        .with_snapshot(case.snapshot());
    }

    if hr_case.is_some_and(|case| case.status == HrCaseStatus::Safe) {
        return SafetyDecision::allow(ReasonCode::HrSafe, "HR obligation fulfilled; move allowed");
    }

    SafetyDecision::allow(ReasonCode::Safe, "move allowed")
}

// Unattended cleanup stays strictly more conservative than interactive
// delete: there is nobody present to confirm, so no REQUIRE_CONFIRM branch.
fn evaluate_upload_cleanup(hr_case: Option<&HrCase>) -> SafetyDecision {
    if let Some(case) = active_case(hr_case) {
        return SafetyDecision::deny(
            ReasonCode::HrActiveCleanup,
            "automated cleanup skipped an HR-active torrent",
        )
        .with_snapshot(case.snapshot());
    }

    SafetyDecision::allow(ReasonCode::Safe, "cleanup allowed")
}

// Stub generation never touches the seeded payload; the HR snapshot is
// attached purely for audit.
fn evaluate_generate_strm(hr_case: Option<&HrCase>) -> SafetyDecision {
    let mut decision = SafetyDecision::allow(ReasonCode::Safe, "stub generation allowed");
    if let Some(case) = hr_case {
        decision = decision.with_snapshot(case.snapshot());
    }
    decision
}
