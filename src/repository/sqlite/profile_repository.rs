//! Profile CRUD plus the default-profile seed used on a fresh install.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use crate::config;
use crate::config::default_profile;
use crate::domain::models::{NewProfile, Profile};

#[derive(Clone)]
pub struct ProfileRepository {
    pool: SqlitePool,
}

impl ProfileRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn upsert_profile(&self, new: &NewProfile) -> Result<Profile> {
        anyhow::ensure!(
            new.refresh_interval >= config::MIN_REFRESH_INTERVAL_SECS,
            "refresh_interval must be at least {} seconds, got {}",
            config::MIN_REFRESH_INTERVAL_SECS,
            new.refresh_interval,
        );
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            r#"
            INSERT INTO profiles (
                name, location, keywords, distance, time_filter,
                refresh_interval, enabled, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
            ON CONFLICT(name) DO UPDATE SET
                location = excluded.location,
                keywords = excluded.keywords,
                distance = excluded.distance,
                time_filter = excluded.time_filter,
                refresh_interval = excluded.refresh_interval,
                enabled = excluded.enabled,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&new.name)
        .bind(&new.location)
        .bind(&new.keywords)
        .bind(new.distance)
        .bind(&new.time_filter)
        .bind(new.refresh_interval)
        .bind(new.enabled)
        .bind(now)
        .execute(&self.pool)
        .await
        .context("upsert_profile")?;

        self.get_profile_by_name(&new.name)
            .await?
            .context("profile vanished immediately after upsert")
    }

    pub async fn get_profile(&self, id: i64) -> Result<Option<Profile>> {
        let row = sqlx::query("SELECT * FROM profiles WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("get_profile")?;
        Ok(row.map(row_to_profile))
    }

    pub async fn get_profile_by_name(&self, name: &str) -> Result<Option<Profile>> {
        let row = sqlx::query("SELECT * FROM profiles WHERE name = ?1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .context("get_profile_by_name")?;
        Ok(row.map(row_to_profile))
    }

    pub async fn list_profiles(&self) -> Result<Vec<Profile>> {
        let rows = sqlx::query("SELECT * FROM profiles ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .context("list_profiles")?;
        Ok(rows.into_iter().map(row_to_profile).collect())
    }

    /// `hard=true` removes the row outright (nulling `jobs.profile_id` via the
    /// foreign key). `hard=false` preserves the row and zeros `enabled`, so a
    /// soft-deleted profile can still be inspected and its jobs remain owned.
    pub async fn delete_profile(&self, id: i64, hard: bool) -> Result<()> {
        if hard {
            sqlx::query("DELETE FROM profiles WHERE id = ?1")
                .bind(id)
                .execute(&self.pool)
                .await
                .context("delete_profile")?;
        } else {
            sqlx::query("UPDATE profiles SET enabled = 0, updated_at = ?1 WHERE id = ?2")
                .bind(Utc::now().to_rfc3339())
                .bind(id)
                .execute(&self.pool)
                .await
                .context("delete_profile (soft)")?;
        }
        Ok(())
    }

    pub async fn update_profile_last_run(&self, id: i64, at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE profiles SET last_scraped_at = ?1, updated_at = ?1 WHERE id = ?2")
            .bind(at.to_rfc3339())
            .bind(id)
            .execute(&self.pool)
            .await
            .context("update_profile_last_run")?;
        Ok(())
    }

    /// Insert the built-in default profile if the table is otherwise empty.
    /// No-op on every later startup.
    pub async fn seed_default_profile(&self) -> Result<()> {
        let existing = self.list_profiles().await?;
        if !existing.is_empty() {
            return Ok(());
        }
        log::info!("seeding default profile '{}'", default_profile::NAME);
        self.upsert_profile(&NewProfile {
            name: default_profile::NAME.to_string(),
            location: default_profile::LOCATION.to_string(),
            keywords: default_profile::KEYWORDS.to_string(),
            distance: default_profile::DISTANCE,
            time_filter: default_profile::TIME_FILTER.to_string(),
            refresh_interval: default_profile::REFRESH_INTERVAL,
            enabled: true,
        })
        .await?;
        Ok(())
    }
}

fn row_to_profile(row: sqlx::sqlite::SqliteRow) -> Profile {
    let parse_opt_dt = |s: Option<String>| -> Option<DateTime<Utc>> {
        s.and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    };
    let parse_dt = |s: String| -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    };

    Profile {
        id: row.get("id"),
        name: row.get("name"),
        location: row.get("location"),
        keywords: row.get("keywords"),
        distance: row.get("distance"),
        time_filter: row.get("time_filter"),
        refresh_interval: row.get("refresh_interval"),
        enabled: row.get("enabled"),
        last_scraped_at: parse_opt_dt(row.try_get("last_scraped_at").ok()),
        created_at: parse_dt(row.get("created_at")),
        updated_at: parse_dt(row.get("updated_at")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory_db;

    fn sample() -> NewProfile {
        NewProfile {
            name: "search-1".into(),
            location: "Austin, TX".into(),
            keywords: "Rust Engineer".into(),
            distance: 25,
            time_filter: "r86400".into(),
            refresh_interval: 7200,
            enabled: true,
        }
    }

    #[tokio::test]
    async fn seed_default_profile_is_idempotent() {
        let pool = init_memory_db().await.unwrap();
        let repo = ProfileRepository::new(pool);
        repo.seed_default_profile().await.unwrap();
        repo.seed_default_profile().await.unwrap();
        let profiles = repo.list_profiles().await.unwrap();
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].name, default_profile::NAME);
    }

    #[tokio::test]
    async fn seed_default_profile_skipped_when_profiles_exist() {
        let pool = init_memory_db().await.unwrap();
        let repo = ProfileRepository::new(pool);
        repo.upsert_profile(&sample()).await.unwrap();
        repo.seed_default_profile().await.unwrap();
        let profiles = repo.list_profiles().await.unwrap();
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].name, "search-1");
    }

    #[tokio::test]
    async fn upsert_by_name_updates_in_place() {
        let pool = init_memory_db().await.unwrap();
        let repo = ProfileRepository::new(pool);
        let created = repo.upsert_profile(&sample()).await.unwrap();

        let mut updated = sample();
        updated.distance = 50;
        repo.upsert_profile(&updated).await.unwrap();

        let profiles = repo.list_profiles().await.unwrap();
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].id, created.id);
        assert_eq!(profiles[0].distance, 50);
    }

    #[tokio::test]
    async fn soft_delete_preserves_row_and_disables() {
        let pool = init_memory_db().await.unwrap();
        let repo = ProfileRepository::new(pool);
        let created = repo.upsert_profile(&sample()).await.unwrap();

        repo.delete_profile(created.id, false).await.unwrap();

        let still_there = repo.get_profile(created.id).await.unwrap().unwrap();
        assert!(!still_there.enabled);
    }

    #[tokio::test]
    async fn hard_delete_removes_row() {
        let pool = init_memory_db().await.unwrap();
        let repo = ProfileRepository::new(pool);
        let created = repo.upsert_profile(&sample()).await.unwrap();

        repo.delete_profile(created.id, true).await.unwrap();

        assert!(repo.get_profile(created.id).await.unwrap().is_none());
    }
}
