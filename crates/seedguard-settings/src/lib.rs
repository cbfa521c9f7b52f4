//! Cached resolution of the layered safety settings.
//!
//! The resolver fronts a [`SettingsRepository`] with a copy-on-write cache:
//! each `get_*` call first issues the store's cheap `updated_at` probe and
//! only reloads the full row when the probe reports a newer timestamp than
//! the cached snapshot (lazy invalidation, no push channel). Cached entries
//! are replaced wholesale behind an `RwLock` — concurrent readers always see
//! a complete snapshot, never a partial update. On a transient store error
//! the last good snapshot is served and the component is flagged degraded;
//! with a cold cache the error surfaces as [`SettingsError::Unavailable`].

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

pub use error::{SettingsError, SettingsResult};

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};
use seedguard_core::model::{
    GlobalSafetySettings, SiteSafetySettings, SubscriptionSafetySettings, Versioned,
};
use seedguard_core::service::SettingsRepository;
use seedguard_events::{Event, EventBus};
use seedguard_telemetry::Metrics;
use tracing::{info, warn};
use uuid::Uuid;

const HEALTH_COMPONENT: &str = "settings_resolver";

const SCOPE_GLOBAL: &str = "global";
const SCOPE_SITE: &str = "site";
const SCOPE_SUBSCRIPTION: &str = "subscription";

/// Cached, staleness-checked access to the safety settings layers.
#[derive(Clone)]
pub struct SafetySettingsResolver {
    repo: Arc<dyn SettingsRepository>,
    events: EventBus,
    metrics: Metrics,
    global: Arc<RwLock<Option<Arc<Versioned<GlobalSafetySettings>>>>>,
    sites: Arc<RwLock<HashMap<String, Arc<Option<Versioned<SiteSafetySettings>>>>>>,
    subscriptions: Arc<RwLock<HashMap<Uuid, Arc<Option<Versioned<SubscriptionSafetySettings>>>>>>,
    health_degraded: Arc<Mutex<bool>>,
}

impl SafetySettingsResolver {
    /// Construct a resolver over the given repository.
    #[must_use]
    pub fn new(repo: Arc<dyn SettingsRepository>, events: EventBus, metrics: Metrics) -> Self {
        Self {
            repo,
            events,
            metrics,
            global: Arc::new(RwLock::new(None)),
            sites: Arc::new(RwLock::new(HashMap::new())),
            subscriptions: Arc::new(RwLock::new(HashMap::new())),
            health_degraded: Arc::new(Mutex::new(false)),
        }
    }

    /// Resolve the global settings, synthesizing and persisting the built-in
    /// default on first access with no stored row.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Unavailable`] when the store fails and no
    /// cached snapshot exists.
    ///
    /// # Panics
    ///
    /// Panics if the cache lock has been poisoned.
    pub async fn get_global(&self) -> SettingsResult<GlobalSafetySettings> {
        let cached = self
            .global
            .read()
            .expect("global settings cache lock poisoned")
            .clone();

        match self.refresh_global(cached.as_deref()).await {
            Ok(Some(fresh)) => {
                let fresh = Arc::new(fresh);
                *self
                    .global
                    .write()
                    .expect("global settings cache lock poisoned") = Some(fresh.clone());
                self.metrics.inc_settings_cache(SCOPE_GLOBAL, "refresh");
                let _ = self.events.publish(Event::SettingsChanged {
                    scope: SCOPE_GLOBAL.to_string(),
                });
                self.mark_recovered();
                Ok(fresh.value.clone())
            }
            Ok(None) => {
                self.metrics.inc_settings_cache(SCOPE_GLOBAL, "hit");
                self.mark_recovered();
                // refresh_global only reports the cache valid when one exists.
                Ok(cached.expect("validated cache entry").value.clone())
            }
            Err(err) => self.serve_stale_global(cached, err),
        }
    }

    /// Resolve a site's settings layer, when one is stored.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Unavailable`] when the store fails and no
    /// cached snapshot exists for the site.
    ///
    /// # Panics
    ///
    /// Panics if the cache lock has been poisoned.
    pub async fn get_site(&self, site_key: &str) -> SettingsResult<Option<SiteSafetySettings>> {
        let cached = self
            .sites
            .read()
            .expect("site settings cache lock poisoned")
            .get(site_key)
            .cloned();

        let probe = self.repo.site_updated_at(site_key).await;
        match probe {
            Ok(stored_at) => {
                if let Some(slot) = &cached
                    && cache_valid(slot.as_ref().as_ref().map(|v| v.updated_at), stored_at)
                {
                    self.metrics.inc_settings_cache(SCOPE_SITE, "hit");
                    return Ok(slot.as_ref().as_ref().map(|v| v.value.clone()));
                }

                match self.repo.load_site(site_key).await {
                    Ok(loaded) => {
                        let slot = Arc::new(loaded);
                        self.sites
                            .write()
                            .expect("site settings cache lock poisoned")
                            .insert(site_key.to_string(), slot.clone());
                        self.metrics.inc_settings_cache(SCOPE_SITE, "refresh");
                        self.mark_recovered();
                        Ok(slot.as_ref().as_ref().map(|v| v.value.clone()))
                    }
                    Err(err) => self.serve_stale_site(site_key, cached, err),
                }
            }
            Err(err) => self.serve_stale_site(site_key, cached, err),
        }
    }

    /// Resolve a subscription's settings layer, when one is stored.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Unavailable`] when the store fails and no
    /// cached snapshot exists for the subscription.
    ///
    /// # Panics
    ///
    /// Panics if the cache lock has been poisoned.
    pub async fn get_subscription(
        &self,
        subscription_id: Uuid,
    ) -> SettingsResult<Option<SubscriptionSafetySettings>> {
        let cached = self
            .subscriptions
            .read()
            .expect("subscription settings cache lock poisoned")
            .get(&subscription_id)
            .cloned();

        let probe = self.repo.subscription_updated_at(subscription_id).await;
        match probe {
            Ok(stored_at) => {
                if let Some(slot) = &cached
                    && cache_valid(slot.as_ref().as_ref().map(|v| v.updated_at), stored_at)
                {
                    self.metrics.inc_settings_cache(SCOPE_SUBSCRIPTION, "hit");
                    return Ok(slot.as_ref().as_ref().map(|v| v.value.clone()));
                }

                match self.repo.load_subscription(subscription_id).await {
                    Ok(loaded) => {
                        let slot = Arc::new(loaded);
                        self.subscriptions
                            .write()
                            .expect("subscription settings cache lock poisoned")
                            .insert(subscription_id, slot.clone());
                        self.metrics.inc_settings_cache(SCOPE_SUBSCRIPTION, "refresh");
                        self.mark_recovered();
                        Ok(slot.as_ref().as_ref().map(|v| v.value.clone()))
                    }
                    Err(err) => self.serve_stale_subscription(subscription_id, cached, err),
                }
            }
            Err(err) => self.serve_stale_subscription(subscription_id, cached, err),
        }
    }

    /// Drop every cached snapshot; the next `get_*` reloads from the store.
    ///
    /// # Panics
    ///
    /// Panics if a cache lock has been poisoned.
    pub fn invalidate(&self) {
        *self
            .global
            .write()
            .expect("global settings cache lock poisoned") = None;
        self.sites
            .write()
            .expect("site settings cache lock poisoned")
            .clear();
        self.subscriptions
            .write()
            .expect("subscription settings cache lock poisoned")
            .clear();
        info!("settings cache invalidated");
    }

    /// Returns the freshly loaded global row (`Some`) or reports the cache
    /// still valid (`None`).
    async fn refresh_global(
        &self,
        cached: Option<&Versioned<GlobalSafetySettings>>,
    ) -> anyhow::Result<Option<Versioned<GlobalSafetySettings>>> {
        let stored_at = self.repo.global_updated_at().await?;

        if let Some(cached) = cached
            && cache_valid(Some(cached.updated_at), stored_at)
        {
            return Ok(None);
        }

        if let Some(loaded) = self.repo.load_global().await? {
            return Ok(Some(loaded));
        }

        info!("no stored global safety settings; seeding built-in defaults");
        let seeded = self
            .repo
            .save_global(&GlobalSafetySettings::default())
            .await?;
        Ok(Some(seeded))
    }

    fn serve_stale_global(
        &self,
        cached: Option<Arc<Versioned<GlobalSafetySettings>>>,
        err: anyhow::Error,
    ) -> SettingsResult<GlobalSafetySettings> {
        match cached {
            None => Err(SettingsError::Unavailable {
                scope: SCOPE_GLOBAL.to_string(),
                source: err,
            }),
            Some(cached) => {
                self.note_stale(SCOPE_GLOBAL, &err);
                Ok(cached.value.clone())
            }
        }
    }

    fn serve_stale_site(
        &self,
        site_key: &str,
        cached: Option<Arc<Option<Versioned<SiteSafetySettings>>>>,
        err: anyhow::Error,
    ) -> SettingsResult<Option<SiteSafetySettings>> {
        match cached {
            None => Err(SettingsError::Unavailable {
                scope: format!("{SCOPE_SITE}:{site_key}"),
                source: err,
            }),
            Some(slot) => {
                self.note_stale(SCOPE_SITE, &err);
                Ok(slot.as_ref().as_ref().map(|v| v.value.clone()))
            }
        }
    }

    fn serve_stale_subscription(
        &self,
        subscription_id: Uuid,
        cached: Option<Arc<Option<Versioned<SubscriptionSafetySettings>>>>,
        err: anyhow::Error,
    ) -> SettingsResult<Option<SubscriptionSafetySettings>> {
        match cached {
            None => Err(SettingsError::Unavailable {
                scope: format!("{SCOPE_SUBSCRIPTION}:{subscription_id}"),
                source: err,
            }),
            Some(slot) => {
                self.note_stale(SCOPE_SUBSCRIPTION, &err);
                Ok(slot.as_ref().as_ref().map(|v| v.value.clone()))
            }
        }
    }

    fn note_stale(&self, scope: &str, err: &anyhow::Error) {
        self.metrics.inc_settings_cache(scope, "stale_serve");
        self.mark_degraded(&format!("{scope}: {err:#}"));
    }

    fn mark_degraded(&self, detail: &str) {
        let mut guard = self
            .health_degraded
            .lock()
            .expect("settings health mutex poisoned");
        if *guard {
            drop(guard);
            warn!(
                component = HEALTH_COMPONENT,
                "settings store still degraded; serving cached snapshot: {detail}"
            );
        } else {
            *guard = true;
            drop(guard);
            warn!(
                component = HEALTH_COMPONENT,
                "settings store degraded; serving cached snapshot: {detail}"
            );
            let _ = self.events.publish(Event::HealthChanged {
                degraded: vec![HEALTH_COMPONENT.to_string()],
            });
        }
    }

    fn mark_recovered(&self) {
        let mut guard = self
            .health_degraded
            .lock()
            .expect("settings health mutex poisoned");
        if std::mem::take(&mut *guard) {
            drop(guard);
            let _ = self.events.publish(Event::HealthChanged { degraded: vec![] });
            info!(component = HEALTH_COMPONENT, "settings store recovered");
        }
    }
}

/// A cached timestamp is valid while the store does not report a newer row.
/// An absent cached row stays valid only while the store also has no row.
fn cache_valid(cached_at: Option<DateTime<Utc>>, stored_at: Option<DateTime<Utc>>) -> bool {
    match (cached_at, stored_at) {
        (_, None) => true,
        (Some(cached), Some(stored)) => cached >= stored,
        (None, Some(_)) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeRepo {
        global: RwLock<Option<Versioned<GlobalSafetySettings>>>,
        site: RwLock<Option<Versioned<SiteSafetySettings>>>,
        fail: AtomicBool,
        loads: AtomicUsize,
        probes: AtomicUsize,
        saves: AtomicUsize,
    }

    impl FakeRepo {
        fn check_fail(&self) -> anyhow::Result<()> {
            if self.fail.load(Ordering::SeqCst) {
                anyhow::bail!("store offline");
            }
            Ok(())
        }
    }

    #[async_trait]
    impl SettingsRepository for FakeRepo {
        async fn load_global(&self) -> anyhow::Result<Option<Versioned<GlobalSafetySettings>>> {
            self.check_fail()?;
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(self.global.read().expect("lock").clone())
        }

        async fn save_global(
            &self,
            settings: &GlobalSafetySettings,
        ) -> anyhow::Result<Versioned<GlobalSafetySettings>> {
            self.check_fail()?;
            self.saves.fetch_add(1, Ordering::SeqCst);
            let stored = Versioned::new(settings.clone(), Utc::now());
            *self.global.write().expect("lock") = Some(stored.clone());
            Ok(stored)
        }

        async fn load_site(
            &self,
            _site_key: &str,
        ) -> anyhow::Result<Option<Versioned<SiteSafetySettings>>> {
            self.check_fail()?;
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(self.site.read().expect("lock").clone())
        }

        async fn load_subscription(
            &self,
            _subscription_id: Uuid,
        ) -> anyhow::Result<Option<Versioned<SubscriptionSafetySettings>>> {
            self.check_fail()?;
            Ok(None)
        }

        async fn global_updated_at(&self) -> anyhow::Result<Option<DateTime<Utc>>> {
            self.check_fail()?;
            self.probes.fetch_add(1, Ordering::SeqCst);
            Ok(self.global.read().expect("lock").as_ref().map(|v| v.updated_at))
        }

        async fn site_updated_at(&self, _site_key: &str) -> anyhow::Result<Option<DateTime<Utc>>> {
            self.check_fail()?;
            self.probes.fetch_add(1, Ordering::SeqCst);
            Ok(self.site.read().expect("lock").as_ref().map(|v| v.updated_at))
        }

        async fn subscription_updated_at(
            &self,
            _subscription_id: Uuid,
        ) -> anyhow::Result<Option<DateTime<Utc>>> {
            self.check_fail()?;
            Ok(None)
        }
    }

    fn resolver(repo: Arc<FakeRepo>) -> SafetySettingsResolver {
        SafetySettingsResolver::new(
            repo,
            EventBus::with_capacity(16),
            Metrics::new().expect("metrics"),
        )
    }

    #[tokio::test]
    async fn first_access_seeds_and_persists_defaults() {
        let repo = Arc::new(FakeRepo::default());
        let resolver = resolver(repo.clone());

        let settings = resolver.get_global().await.expect("settings");
        assert_eq!(settings, GlobalSafetySettings::default());
        assert_eq!(repo.saves.load(Ordering::SeqCst), 1);

        // The seeded row now backs the cache: no further load or save.
        let again = resolver.get_global().await.expect("settings");
        assert_eq!(again, settings);
        assert_eq!(repo.saves.load(Ordering::SeqCst), 1);
        assert_eq!(repo.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cache_refreshes_when_store_timestamp_advances() {
        let repo = Arc::new(FakeRepo::default());
        let resolver = resolver(repo.clone());

        let initial = resolver.get_global().await.expect("settings");
        assert!(initial.enable_hr_protection);

        let updated = GlobalSafetySettings {
            enable_hr_protection: false,
            ..GlobalSafetySettings::default()
        };
        *repo.global.write().expect("lock") = Some(Versioned::new(
            updated,
            Utc::now() + chrono::Duration::seconds(5),
        ));

        let refreshed = resolver.get_global().await.expect("settings");
        assert!(!refreshed.enable_hr_protection);
    }

    #[tokio::test]
    async fn store_error_serves_last_good_snapshot() {
        let repo = Arc::new(FakeRepo::default());
        let resolver = resolver(repo.clone());

        let warm = resolver.get_global().await.expect("settings");
        repo.fail.store(true, Ordering::SeqCst);

        let stale = resolver.get_global().await.expect("stale snapshot");
        assert_eq!(stale, warm);
    }

    #[tokio::test]
    async fn store_error_with_cold_cache_propagates() {
        let repo = Arc::new(FakeRepo::default());
        repo.fail.store(true, Ordering::SeqCst);
        let resolver = resolver(repo);

        let err = resolver.get_global().await.expect_err("unavailable");
        assert!(matches!(err, SettingsError::Unavailable { .. }));
    }

    #[tokio::test]
    async fn absent_site_layer_is_cached_as_none() {
        let repo = Arc::new(FakeRepo::default());
        let resolver = resolver(repo.clone());

        assert!(resolver.get_site("demo").await.expect("site").is_none());
        assert_eq!(repo.loads.load(Ordering::SeqCst), 1);

        // Second read answers from the cached negative entry.
        assert!(resolver.get_site("demo").await.expect("site").is_none());
        assert_eq!(repo.loads.load(Ordering::SeqCst), 1);

        // A row appearing later invalidates the negative entry.
        *repo.site.write().expect("lock") = Some(Versioned::new(
            SiteSafetySettings {
                site_key: "demo".into(),
                hr_sensitivity: seedguard_core::model::HrSensitivity::HighlySensitive,
                min_keep_ratio: Some(1.0),
                min_keep_time_hours: None,
            },
            Utc::now(),
        ));
        let site = resolver.get_site("demo").await.expect("site");
        assert!(site.is_some());
    }

    #[tokio::test]
    async fn invalidate_forces_a_reload() {
        let repo = Arc::new(FakeRepo::default());
        let resolver = resolver(repo.clone());

        let _ = resolver.get_global().await.expect("settings");
        assert_eq!(repo.loads.load(Ordering::SeqCst), 1);

        resolver.invalidate();
        let _ = resolver.get_global().await.expect("settings");
        assert_eq!(repo.loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn refresh_publishes_settings_changed_event() {
        let repo = Arc::new(FakeRepo::default());
        let events = EventBus::with_capacity(16);
        let resolver = SafetySettingsResolver::new(
            repo,
            events.clone(),
            Metrics::new().expect("metrics"),
        );
        let mut stream = events.subscribe(None);

        let _ = resolver.get_global().await.expect("settings");
        let envelope = stream.next().await.expect("event");
        assert_eq!(envelope.event.kind(), "settings_changed");
    }
}
