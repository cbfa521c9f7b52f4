//! Repository and provider traits implemented by storage adapters.

use crate::model::{
    GlobalSafetySettings, HrCase, RiskMode, SiteSafetySettings, SubscriptionSafetySettings,
    Versioned,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Feature flag gating the whole safety engine.
pub const FEATURE_SAFETY_ENGINE: &str = "safety_engine";

/// Access to the persisted safety settings layers. The `*_updated_at` probes
/// are cheap staleness checks; the resolver only issues a full `load_*` when
/// the probe reports a newer row than its cache.
#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// Load the global settings row, when one exists.
    async fn load_global(&self) -> anyhow::Result<Option<Versioned<GlobalSafetySettings>>>;

    /// Persist the global settings row, returning the stored version.
    async fn save_global(
        &self,
        settings: &GlobalSafetySettings,
    ) -> anyhow::Result<Versioned<GlobalSafetySettings>>;

    /// Load a site's settings row, when one exists.
    async fn load_site(
        &self,
        site_key: &str,
    ) -> anyhow::Result<Option<Versioned<SiteSafetySettings>>>;

    /// Load a subscription's settings row, when one exists.
    async fn load_subscription(
        &self,
        subscription_id: Uuid,
    ) -> anyhow::Result<Option<Versioned<SubscriptionSafetySettings>>>;

    /// Timestamp of the global row, when one exists.
    async fn global_updated_at(&self) -> anyhow::Result<Option<DateTime<Utc>>>;

    /// Timestamp of a site row, when one exists.
    async fn site_updated_at(&self, site_key: &str) -> anyhow::Result<Option<DateTime<Utc>>>;

    /// Timestamp of a subscription row, when one exists.
    async fn subscription_updated_at(
        &self,
        subscription_id: Uuid,
    ) -> anyhow::Result<Option<DateTime<Utc>>>;
}

/// Read-only access to Hit-and-Run case records.
///
/// Implementations must classify a missing backing table as "no case"
/// (`Ok(None)`) rather than an error: HR tracking is an optional add-on and
/// its schema may not be migrated yet. All other errors propagate.
#[async_trait]
pub trait HrCaseRepository: Send + Sync {
    /// Look up the case tracked for a (site, torrent) pair.
    async fn find(&self, site_key: &str, torrent_id: &str) -> anyhow::Result<Option<HrCase>>;
}

/// Feature flag lookups.
#[async_trait]
pub trait FeatureFlagProvider: Send + Sync {
    /// Whether the named flag is enabled.
    async fn is_enabled(&self, flag: &str) -> anyhow::Result<bool>;
}

/// Persisted selection of the active risk mode.
#[async_trait]
pub trait RiskModeStore: Send + Sync {
    /// The currently active risk mode.
    async fn active_mode(&self) -> anyhow::Result<RiskMode>;

    /// Switch the active risk mode.
    async fn set_active_mode(&self, mode: RiskMode) -> anyhow::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FixedModeStore {
        mode: Mutex<RiskMode>,
    }

    #[async_trait]
    impl RiskModeStore for FixedModeStore {
        async fn active_mode(&self) -> anyhow::Result<RiskMode> {
            Ok(*self.mode.lock().expect("mode mutex poisoned"))
        }

        async fn set_active_mode(&self, mode: RiskMode) -> anyhow::Result<()> {
            *self.mode.lock().expect("mode mutex poisoned") = mode;
            Ok(())
        }
    }

    #[tokio::test]
    async fn risk_mode_store_round_trips() {
        let store = FixedModeStore {
            mode: Mutex::new(RiskMode::BBalanced),
        };
        assert_eq!(
            store.active_mode().await.expect("mode"),
            RiskMode::BBalanced
        );
        store
            .set_active_mode(RiskMode::CPro)
            .await
            .expect("set mode");
        assert_eq!(store.active_mode().await.expect("mode"), RiskMode::CPro);
    }
}
