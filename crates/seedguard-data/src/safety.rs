//! Row projections and store implementations for the safety schema.

use crate::error::{DataError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use seedguard_core::model::{
    GlobalSafetySettings, HrCase, HrCaseStatus, HrSensitivity, RiskMode, SiteSafetySettings,
    SubscriptionSafetySettings, Versioned,
};
use seedguard_core::service::{
    FeatureFlagProvider, HrCaseRepository, RiskModeStore, SettingsRepository,
};
use sqlx::{FromRow, PgPool};
use std::str::FromStr;
use tracing::{debug, info};
use uuid::Uuid;

/// Fixed primary key of the single global settings row.
const GLOBAL_SETTINGS_ID: &str = "00000000-0000-0000-0000-000000000001";

/// PostgreSQL error code for `undefined_table`.
const UNDEFINED_TABLE: &str = "42P01";

fn map_query_err(operation: &'static str) -> impl FnOnce(sqlx::Error) -> DataError {
    move |source| DataError::QueryFailed { operation, source }
}

/// Apply the safety schema migrations.
///
/// # Errors
///
/// Returns an error when migration execution fails.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|source| DataError::MigrationFailed { source })?;
    Ok(())
}

/// Whether a database error reports a missing table.
fn is_undefined_table(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        code_is_undefined_table(db_err.code().as_deref())
    } else {
        false
    }
}

fn code_is_undefined_table(code: Option<&str>) -> bool {
    matches!(code, Some(UNDEFINED_TABLE))
}

/// Raw projection of `safety_global_settings`.
#[derive(Debug, Clone, FromRow)]
struct GlobalSettingsRow {
    enable_hr_protection: bool,
    min_ratio_for_delete: f64,
    min_keep_hours: f64,
    prefer_copy_on_move_for_hr: bool,
    auto_approve_hours: f64,
    updated_at: DateTime<Utc>,
}

impl GlobalSettingsRow {
    fn into_domain(self) -> Versioned<GlobalSafetySettings> {
        Versioned::new(
            GlobalSafetySettings {
                enable_hr_protection: self.enable_hr_protection,
                min_ratio_for_delete: self.min_ratio_for_delete,
                min_keep_hours: self.min_keep_hours,
                prefer_copy_on_move_for_hr: self.prefer_copy_on_move_for_hr,
                auto_approve_hours: self.auto_approve_hours,
            },
            self.updated_at,
        )
    }
}

/// Raw projection of `safety_site_settings`.
#[derive(Debug, Clone, FromRow)]
struct SiteSettingsRow {
    site_key: String,
    hr_sensitivity: String,
    min_keep_ratio: Option<f64>,
    min_keep_time_hours: Option<f64>,
    updated_at: DateTime<Utc>,
}

impl SiteSettingsRow {
    fn into_domain(self) -> Result<Versioned<SiteSafetySettings>> {
        let hr_sensitivity = match self.hr_sensitivity.as_str() {
            "normal" => HrSensitivity::Normal,
            "highly_sensitive" => HrSensitivity::HighlySensitive,
            other => {
                return Err(DataError::InvalidRow {
                    column: "hr_sensitivity",
                    value: other.to_string(),
                });
            }
        };
        Ok(Versioned::new(
            SiteSafetySettings {
                site_key: self.site_key,
                hr_sensitivity,
                min_keep_ratio: self.min_keep_ratio,
                min_keep_time_hours: self.min_keep_time_hours,
            },
            self.updated_at,
        ))
    }
}

/// Raw projection of `safety_subscription_settings`.
#[derive(Debug, Clone, FromRow)]
struct SubscriptionSettingsRow {
    subscription_id: Uuid,
    allow_hr: bool,
    updated_at: DateTime<Utc>,
}

impl SubscriptionSettingsRow {
    fn into_domain(self) -> Versioned<SubscriptionSafetySettings> {
        Versioned::new(
            SubscriptionSafetySettings {
                subscription_id: self.subscription_id,
                allow_hr: self.allow_hr,
            },
            self.updated_at,
        )
    }
}

/// Raw projection of `hr_cases`.
#[derive(Debug, Clone, FromRow)]
struct HrCaseRow {
    site_key: String,
    torrent_id: String,
    status: String,
    deadline: Option<DateTime<Utc>>,
    seeded_hours: Option<f64>,
    current_ratio: Option<f64>,
    requirement_hours: Option<f64>,
}

impl HrCaseRow {
    fn into_domain(self) -> Result<HrCase> {
        let status = HrCaseStatus::from_str(&self.status).map_err(|_| DataError::InvalidRow {
            column: "status",
            value: self.status.clone(),
        })?;
        Ok(HrCase {
            site_key: self.site_key,
            torrent_id: self.torrent_id,
            status,
            deadline: self.deadline,
            seeded_hours: self.seeded_hours,
            current_ratio: self.current_ratio,
            requirement_hours: self.requirement_hours,
        })
    }
}

/// PostgreSQL-backed implementation of every safety store trait.
#[derive(Clone)]
pub struct SafetyStore {
    pool: PgPool,
}

impl SafetyStore {
    /// Wrap an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Access the underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn global_id() -> Uuid {
        Uuid::parse_str(GLOBAL_SETTINGS_ID).expect("static uuid literal")
    }
}

#[async_trait]
impl SettingsRepository for SafetyStore {
    async fn load_global(&self) -> anyhow::Result<Option<Versioned<GlobalSafetySettings>>> {
        let row = sqlx::query_as::<_, GlobalSettingsRow>(
            "SELECT enable_hr_protection, min_ratio_for_delete, min_keep_hours, \
             prefer_copy_on_move_for_hr, auto_approve_hours, updated_at \
             FROM safety_global_settings WHERE id = $1",
        )
        .bind(Self::global_id())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_query_err("load_global_settings"))?;

        Ok(row.map(GlobalSettingsRow::into_domain))
    }

    async fn save_global(
        &self,
        settings: &GlobalSafetySettings,
    ) -> anyhow::Result<Versioned<GlobalSafetySettings>> {
        let updated_at: DateTime<Utc> = sqlx::query_scalar(
            "INSERT INTO safety_global_settings \
             (id, enable_hr_protection, min_ratio_for_delete, min_keep_hours, \
              prefer_copy_on_move_for_hr, auto_approve_hours, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, now()) \
             ON CONFLICT (id) DO UPDATE SET \
               enable_hr_protection = EXCLUDED.enable_hr_protection, \
               min_ratio_for_delete = EXCLUDED.min_ratio_for_delete, \
               min_keep_hours = EXCLUDED.min_keep_hours, \
               prefer_copy_on_move_for_hr = EXCLUDED.prefer_copy_on_move_for_hr, \
               auto_approve_hours = EXCLUDED.auto_approve_hours, \
               updated_at = now() \
             RETURNING updated_at",
        )
        .bind(Self::global_id())
        .bind(settings.enable_hr_protection)
        .bind(settings.min_ratio_for_delete)
        .bind(settings.min_keep_hours)
        .bind(settings.prefer_copy_on_move_for_hr)
        .bind(settings.auto_approve_hours)
        .fetch_one(&self.pool)
        .await
        .map_err(map_query_err("save_global_settings"))?;

        info!("persisted global safety settings");
        Ok(Versioned::new(settings.clone(), updated_at))
    }

    async fn load_site(
        &self,
        site_key: &str,
    ) -> anyhow::Result<Option<Versioned<SiteSafetySettings>>> {
        let row = sqlx::query_as::<_, SiteSettingsRow>(
            "SELECT site_key, hr_sensitivity, min_keep_ratio, min_keep_time_hours, updated_at \
             FROM safety_site_settings WHERE site_key = $1",
        )
        .bind(site_key)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_query_err("load_site_settings"))?;

        row.map(SiteSettingsRow::into_domain).transpose().map_err(Into::into)
    }

    async fn load_subscription(
        &self,
        subscription_id: Uuid,
    ) -> anyhow::Result<Option<Versioned<SubscriptionSafetySettings>>> {
        let row = sqlx::query_as::<_, SubscriptionSettingsRow>(
            "SELECT subscription_id, allow_hr, updated_at \
             FROM safety_subscription_settings WHERE subscription_id = $1",
        )
        .bind(subscription_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_query_err("load_subscription_settings"))?;

        Ok(row.map(SubscriptionSettingsRow::into_domain))
    }

    async fn global_updated_at(&self) -> anyhow::Result<Option<DateTime<Utc>>> {
        let updated_at: Option<DateTime<Utc>> = sqlx::query_scalar(
            "SELECT updated_at FROM safety_global_settings WHERE id = $1",
        )
        .bind(Self::global_id())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_query_err("probe_global_settings"))?;
        Ok(updated_at)
    }

    async fn site_updated_at(&self, site_key: &str) -> anyhow::Result<Option<DateTime<Utc>>> {
        let updated_at: Option<DateTime<Utc>> = sqlx::query_scalar(
            "SELECT updated_at FROM safety_site_settings WHERE site_key = $1",
        )
        .bind(site_key)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_query_err("probe_site_settings"))?;
        Ok(updated_at)
    }

    async fn subscription_updated_at(
        &self,
        subscription_id: Uuid,
    ) -> anyhow::Result<Option<DateTime<Utc>>> {
        let updated_at: Option<DateTime<Utc>> = sqlx::query_scalar(
            "SELECT updated_at FROM safety_subscription_settings WHERE subscription_id = $1",
        )
        .bind(subscription_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_query_err("probe_subscription_settings"))?;
        Ok(updated_at)
    }
}

#[async_trait]
impl HrCaseRepository for SafetyStore {
    async fn find(&self, site_key: &str, torrent_id: &str) -> anyhow::Result<Option<HrCase>> {
        let result = sqlx::query_as::<_, HrCaseRow>(
            "SELECT site_key, torrent_id, status, deadline, seeded_hours, current_ratio, \
             requirement_hours \
             FROM hr_cases WHERE site_key = $1 AND torrent_id = $2",
        )
        .bind(site_key)
        .bind(torrent_id)
        .fetch_optional(&self.pool)
        .await;

        match result {
            Ok(row) => row.map(HrCaseRow::into_domain).transpose().map_err(Into::into),
            // HR tracking is an optional add-on; a missing table means no case.
            Err(err) if is_undefined_table(&err) => {
                debug!(site_key, torrent_id, "hr_cases table absent; treating as no case");
                Ok(None)
            }
            Err(err) => Err(map_query_err("find_hr_case")(err).into()),
        }
    }
}

#[async_trait]
impl FeatureFlagProvider for SafetyStore {
    async fn is_enabled(&self, flag: &str) -> anyhow::Result<bool> {
        let enabled: Option<bool> =
            sqlx::query_scalar("SELECT enabled FROM feature_flags WHERE name = $1")
                .bind(flag)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_query_err("load_feature_flag"))?;
        Ok(enabled.unwrap_or(false))
    }
}

#[async_trait]
impl RiskModeStore for SafetyStore {
    async fn active_mode(&self) -> anyhow::Result<RiskMode> {
        let mode: Option<String> =
            sqlx::query_scalar("SELECT mode FROM risk_mode WHERE id = 1")
                .fetch_optional(&self.pool)
                .await
                .map_err(map_query_err("load_risk_mode"))?;

        let Some(mode) = mode else {
            return Ok(RiskMode::BBalanced);
        };
        RiskMode::from_str(&mode).map_err(|_| {
            DataError::InvalidRow {
                column: "mode",
                value: mode,
            }
            .into()
        })
    }

    async fn set_active_mode(&self, mode: RiskMode) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO risk_mode (id, mode, updated_at) VALUES (1, $1, now()) \
             ON CONFLICT (id) DO UPDATE SET mode = EXCLUDED.mode, updated_at = now()",
        )
        .bind(mode.as_str())
        .execute(&self.pool)
        .await
        .map_err(map_query_err("save_risk_mode"))?;
        info!(mode = mode.as_str(), "active risk mode persisted");
        Ok(())
    }
}
