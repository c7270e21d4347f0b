use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Row, Sqlite};
use tracing::info;

use crate::config::DatabaseConfig;
use crate::errors::AppError;
use crate::models::{Channel, Playlist};

pub mod channels;
pub mod playlists;

/// Embedded schema migrations, applied in order and recorded in a
/// `_migrations` table so restarts are idempotent.
const MIGRATIONS: &[(&str, &str)] = &[(
    "001_initial_schema.sql",
    include_str!("../../migrations/001_initial_schema.sql"),
)];

#[derive(Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    pub fn pool(&self) -> Pool<Sqlite> {
        self.pool.clone()
    }

    pub async fn new(config: &DatabaseConfig) -> Result<Self, AppError> {
        let options = SqliteConnectOptions::from_str(&config.url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections.unwrap_or(10))
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), AppError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                description TEXT NOT NULL,
                installed_on TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        for (index, (name, content)) in MIGRATIONS.iter().enumerate() {
            let version = (index + 1) as i64;

            let applied: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM _migrations WHERE version = ?")
                    .bind(version)
                    .fetch_one(&self.pool)
                    .await?;
            if applied > 0 {
                continue;
            }

            let mut transaction = self.pool.begin().await?;

            // Migration files hold several statements; sqlite prepares one
            // statement at a time.
            for statement in content.split(';') {
                let statement = statement.trim();
                if statement.is_empty() {
                    continue;
                }
                sqlx::query(statement).execute(&mut *transaction).await?;
            }

            sqlx::query(
                "INSERT INTO _migrations (version, description, installed_on) VALUES (?, ?, ?)",
            )
            .bind(version)
            .bind(name)
            .bind(Utc::now().to_rfc3339())
            .execute(&mut *transaction)
            .await?;

            transaction.commit().await?;
            info!("Applied migration: {}", name);
        }

        Ok(())
    }
}

/// Parse datetime from either RFC3339 or the bare SQLite format.
pub(crate) fn parse_datetime(s: &str) -> Result<DateTime<Utc>, sqlx::Error> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Ok(dt.and_utc());
    }
    Err(sqlx::Error::Decode(
        format!("Unable to parse datetime: {}", s).into(),
    ))
}

pub(crate) fn now_str() -> String {
    Utc::now().to_rfc3339()
}

pub(crate) fn map_playlist_row(row: &SqliteRow) -> Result<Playlist, AppError> {
    Ok(Playlist {
        id: row.get("id"),
        name: row.get("name"),
        url: row.get("url"),
        group_order: row.get("group_order"),
        hidden_groups: row.get("hidden_groups"),
        hidden_channels: row.get("hidden_channels"),
        created_at: parse_datetime(&row.get::<String, _>("created_at"))?,
        updated_at: parse_datetime(&row.get::<String, _>("updated_at"))?,
    })
}

pub(crate) fn map_channel_row(row: &SqliteRow) -> Result<Channel, AppError> {
    Ok(Channel {
        id: row.get("id"),
        playlist_id: row.get("playlist_id"),
        name: row.get("name"),
        url: row.get("url"),
        tvg_id: row.get("tvg_id"),
        tvg_name: row.get("tvg_name"),
        tvg_logo: row.get("tvg_logo"),
        group_title: row.get("group_title"),
        duration: row.get("duration"),
        order: row.get("sort_order"),
        created_at: parse_datetime(&row.get::<String, _>("created_at"))?,
        updated_at: parse_datetime(&row.get::<String, _>("updated_at"))?,
    })
}
