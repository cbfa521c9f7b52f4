//! Composition root wiring the safety engine to the risk-mode presets.
//!
//! Callers hand a context plus their requested file-move behaviour to
//! [`PolicyOrchestrator::evaluate_and_resolve`]; only an `ALLOW` decision
//! yields a concrete behaviour. On `REQUIRE_CONFIRM` the caller either shows
//! a confirmation dialog or waits for `auto_approve_after` before retrying
//! with a forced-allow bypass — honouring that timer is caller policy, not
//! enforced here.

use std::sync::Arc;

use seedguard_core::model::{
    Candidate, FileMoveBehavior, RiskMode, SafetyContext, SafetyDecision, Verdict,
};
use seedguard_core::service::RiskModeStore;
use seedguard_events::{Event, EventBus};
use seedguard_rules::profile::{ModeProfileInfo, mode_profile, mode_profiles};
use seedguard_rules::quality::{filter_by_hr_policy, quality_rejection};
use seedguard_rules::resolve_move_behavior;
use seedguard_telemetry::Metrics;
use tracing::warn;

use crate::engine::SafetyPolicyEngine;

/// Public surface combining decision evaluation, candidate filtering, and
/// move-behaviour resolution.
#[derive(Clone)]
pub struct PolicyOrchestrator {
    engine: SafetyPolicyEngine,
    modes: Arc<dyn RiskModeStore>,
    events: EventBus,
    metrics: Metrics,
}

impl PolicyOrchestrator {
    /// Wire the orchestrator to the engine and the persisted mode selection.
    #[must_use]
    pub const fn new(
        engine: SafetyPolicyEngine,
        modes: Arc<dyn RiskModeStore>,
        events: EventBus,
        metrics: Metrics,
    ) -> Self {
        Self {
            engine,
            modes,
            events,
            metrics,
        }
    }

    /// Access the underlying decision engine.
    #[must_use]
    pub const fn engine(&self) -> &SafetyPolicyEngine {
        &self.engine
    }

    /// Judge an action and, when allowed, resolve the concrete file-move
    /// behaviour under the currently active risk mode. `DENY` and
    /// `REQUIRE_CONFIRM` return no behaviour.
    pub async fn evaluate_and_resolve(
        &self,
        ctx: &SafetyContext,
        requested: FileMoveBehavior,
        is_strm_generation: bool,
    ) -> (SafetyDecision, Option<FileMoveBehavior>) {
        let decision = self.engine.evaluate(ctx).await;
        if decision.verdict != Verdict::Allow {
            return (decision, None);
        }

        let mode = self.active_mode_or_default().await;
        let resolved = resolve_move_behavior(requested, mode, is_strm_generation);
        if resolved != requested {
            self.metrics.inc_move_downgrade(mode.as_str());
        }
        (decision, Some(resolved))
    }

    /// Filter release candidates through the HR policy and quality rules of
    /// the given risk mode.
    #[must_use]
    pub fn filter_candidates(&self, candidates: Vec<Candidate>, mode: RiskMode) -> Vec<Candidate> {
        let profile = mode_profile(mode);
        let survivors = filter_by_hr_policy(candidates, profile.hr_policy);
        survivors
            .into_iter()
            .filter(|candidate| match quality_rejection(candidate, &profile) {
                Some(rule) => {
                    self.metrics.inc_candidate_dropped(rule.as_str());
                    false
                }
                None => true,
            })
            .collect()
    }

    /// Resolve a file-move behaviour under an explicit risk mode. Pure
    /// delegation kept on the orchestrator so callers need a single handle.
    #[must_use]
    pub fn resolve_move_behavior(
        &self,
        requested: FileMoveBehavior,
        mode: RiskMode,
        is_strm_generation: bool,
    ) -> FileMoveBehavior {
        let resolved = resolve_move_behavior(requested, mode, is_strm_generation);
        if resolved != requested {
            self.metrics.inc_move_downgrade(mode.as_str());
        }
        resolved
    }

    /// Display bundles for every risk mode, for the configuration UI.
    #[must_use]
    pub fn mode_profiles(&self) -> Vec<ModeProfileInfo> {
        mode_profiles()
    }

    /// The currently active risk mode.
    ///
    /// # Errors
    ///
    /// Returns an error when the mode store cannot be read.
    pub async fn active_mode(&self) -> anyhow::Result<RiskMode> {
        self.modes.active_mode().await
    }

    /// Persist a new active risk mode and announce the change.
    ///
    /// # Errors
    ///
    /// Returns an error when the mode store cannot be written.
    pub async fn set_active_mode(&self, mode: RiskMode) -> anyhow::Result<()> {
        self.modes.set_active_mode(mode).await?;
        let _ = self.events.publish(Event::RiskModeChanged {
            mode: mode.as_str().to_string(),
        });
        self.metrics.inc_event("risk_mode_changed");
        Ok(())
    }

    // Mode resolution must not turn an allowed action into an outage; an
    // unreadable store falls back to the balanced preset.
    async fn active_mode_or_default(&self) -> RiskMode {
        self.modes.active_mode().await.unwrap_or_else(|err| {
            warn!(
                error = %format!("{err:#}"),
                "risk mode store unavailable; assuming balanced mode"
            );
            RiskMode::BBalanced
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use seedguard_core::model::{
        GlobalSafetySettings, HrCase, HrCaseStatus, ReasonCode, SafetyAction,
        SiteSafetySettings, SubscriptionSafetySettings, Versioned,
    };
    use seedguard_core::service::{
        FeatureFlagProvider, HrCaseRepository, SettingsRepository,
    };
    use seedguard_settings::SafetySettingsResolver;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use uuid::Uuid;

    struct StaticSettings;

    #[async_trait]
    impl SettingsRepository for StaticSettings {
        async fn load_global(&self) -> anyhow::Result<Option<Versioned<GlobalSafetySettings>>> {
            Ok(Some(Versioned::new(
                GlobalSafetySettings::default(),
                Utc::now(),
            )))
        }

        async fn save_global(
            &self,
            settings: &GlobalSafetySettings,
        ) -> anyhow::Result<Versioned<GlobalSafetySettings>> {
            Ok(Versioned::new(settings.clone(), Utc::now()))
        }

        async fn load_site(
            &self,
            _site_key: &str,
        ) -> anyhow::Result<Option<Versioned<SiteSafetySettings>>> {
            Ok(None)
        }

        async fn load_subscription(
            &self,
            _subscription_id: Uuid,
        ) -> anyhow::Result<Option<Versioned<SubscriptionSafetySettings>>> {
            Ok(None)
        }

        async fn global_updated_at(&self) -> anyhow::Result<Option<DateTime<Utc>>> {
            Ok(Some(Utc::now()))
        }

        async fn site_updated_at(&self, _site_key: &str) -> anyhow::Result<Option<DateTime<Utc>>> {
            Ok(None)
        }

        async fn subscription_updated_at(
            &self,
            _subscription_id: Uuid,
        ) -> anyhow::Result<Option<DateTime<Utc>>> {
            Ok(None)
        }
    }

    struct StaticHrCases {
        case: Option<HrCase>,
    }

    #[async_trait]
    impl HrCaseRepository for StaticHrCases {
        async fn find(
            &self,
            _site_key: &str,
            _torrent_id: &str,
        ) -> anyhow::Result<Option<HrCase>> {
            Ok(self.case.clone())
        }
    }

    struct EnabledFlags;

    #[async_trait]
    impl FeatureFlagProvider for EnabledFlags {
        async fn is_enabled(&self, _flag: &str) -> anyhow::Result<bool> {
            Ok(true)
        }
    }

    struct StubModeStore {
        mode: Mutex<RiskMode>,
        fail: AtomicBool,
    }

    #[async_trait]
    impl RiskModeStore for StubModeStore {
        async fn active_mode(&self) -> anyhow::Result<RiskMode> {
            if self.fail.load(Ordering::SeqCst) {
                anyhow::bail!("mode store offline");
            }
            Ok(*self.mode.lock().expect("mode mutex poisoned"))
        }

        async fn set_active_mode(&self, mode: RiskMode) -> anyhow::Result<()> {
            *self.mode.lock().expect("mode mutex poisoned") = mode;
            Ok(())
        }
    }

    fn orchestrator(mode: RiskMode, hr_case: Option<HrCase>) -> (PolicyOrchestrator, Arc<StubModeStore>) {
        let events = EventBus::with_capacity(32);
        let metrics = Metrics::new().expect("metrics");
        let resolver = SafetySettingsResolver::new(
            Arc::new(StaticSettings),
            events.clone(),
            metrics.clone(),
        );
        let engine = SafetyPolicyEngine::new(
            resolver,
            Arc::new(StaticHrCases { case: hr_case }),
            Arc::new(EnabledFlags),
            events.clone(),
            metrics.clone(),
        );
        let modes = Arc::new(StubModeStore {
            mode: Mutex::new(mode),
            fail: AtomicBool::new(false),
        });
        (
            PolicyOrchestrator::new(engine, modes.clone(), events, metrics),
            modes,
        )
    }

    fn ctx(action: SafetyAction) -> SafetyContext {
        SafetyContext {
            site_key: Some("demo".to_string()),
            torrent_id: Some("t-1".to_string()),
            ..SafetyContext::new(action)
        }
    }

    fn active_case() -> HrCase {
        HrCase {
            site_key: "demo".to_string(),
            torrent_id: "t-1".to_string(),
            status: HrCaseStatus::Active,
            deadline: None,
            seeded_hours: None,
            current_ratio: None,
            requirement_hours: None,
        }
    }

    #[tokio::test]
    async fn allowed_actions_resolve_a_behavior() {
        let (orchestrator, _) = orchestrator(RiskMode::CPro, None);

        let (decision, behavior) = orchestrator
            .evaluate_and_resolve(&ctx(SafetyAction::Move), FileMoveBehavior::Move, false)
            .await;
        assert_eq!(decision.verdict, Verdict::Allow);
        // C_PRO downgrades the move to a copy.
        assert_eq!(behavior, Some(FileMoveBehavior::Copy));
    }

    #[tokio::test]
    async fn denied_actions_resolve_no_behavior() {
        let (orchestrator, _) = orchestrator(RiskMode::BBalanced, Some(active_case()));

        let (decision, behavior) = orchestrator
            .evaluate_and_resolve(&ctx(SafetyAction::Delete), FileMoveBehavior::Move, false)
            .await;
        assert_eq!(decision.verdict, Verdict::Deny);
        assert_eq!(decision.reason_code, ReasonCode::HrActiveDelete);
        assert!(behavior.is_none());
    }

    #[tokio::test]
    async fn confirmation_pending_resolves_no_behavior() {
        let (orchestrator, _) = orchestrator(RiskMode::BBalanced, Some(active_case()));
        let mut move_ctx = ctx(SafetyAction::Move);
        move_ctx.changes_seeding_path = true;

        let (decision, behavior) = orchestrator
            .evaluate_and_resolve(&move_ctx, FileMoveBehavior::Move, false)
            .await;
        assert_eq!(decision.verdict, Verdict::RequireConfirm);
        assert!(behavior.is_none());
    }

    #[tokio::test]
    async fn mode_store_failure_falls_back_to_balanced() {
        let (orchestrator, modes) = orchestrator(RiskMode::CPro, None);
        modes.fail.store(true, Ordering::SeqCst);

        let (_, behavior) = orchestrator
            .evaluate_and_resolve(&ctx(SafetyAction::Move), FileMoveBehavior::Move, false)
            .await;
        // Balanced mode passes the requested move through.
        assert_eq!(behavior, Some(FileMoveBehavior::Move));
    }

    #[tokio::test]
    async fn filter_candidates_applies_mode_presets() {
        let (orchestrator, _) = orchestrator(RiskMode::ASafe, None);

        let candidates = vec![
            Candidate {
                title: "Show.S01.1080p.WEB-DL".to_string(),
                hr_level: "NONE".to_string(),
                source_quality: "WEB-DL".to_string(),
                resolution: "1080p".to_string(),
                ..Candidate::default()
            },
            Candidate {
                title: "Show.S01.2160p.WEB-DL".to_string(),
                hr_level: "NONE".to_string(),
                source_quality: "WEB-DL".to_string(),
                resolution: "2160p".to_string(),
                ..Candidate::default()
            },
            Candidate {
                title: "Show.S01.1080p.HR".to_string(),
                hr_level: "HR".to_string(),
                source_quality: "WEB-DL".to_string(),
                resolution: "1080p".to_string(),
                ..Candidate::default()
            },
        ];

        let kept = orchestrator.filter_candidates(candidates, RiskMode::ASafe);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].title, "Show.S01.1080p.WEB-DL");
    }

    #[tokio::test]
    async fn set_active_mode_persists_and_announces() {
        let (orchestrator, modes) = orchestrator(RiskMode::BBalanced, None);

        orchestrator
            .set_active_mode(RiskMode::ASafe)
            .await
            .expect("mode switch");
        assert_eq!(
            *modes.mode.lock().expect("mode mutex poisoned"),
            RiskMode::ASafe
        );
        assert_eq!(
            orchestrator.active_mode().await.expect("mode"),
            RiskMode::ASafe
        );
    }

    #[tokio::test]
    async fn mode_profiles_exposes_all_three_presets() {
        let (orchestrator, _) = orchestrator(RiskMode::BBalanced, None);
        let profiles = orchestrator.mode_profiles();
        assert_eq!(profiles.len(), 3);
    }
}
