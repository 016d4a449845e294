use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};
use uuid::Uuid;

use shared::{
    domain::{CarouselImageId, ProjectId},
    protocol::{CarouselImageDraft, ProjectDraft},
};

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

#[derive(Debug, Clone)]
pub struct StoredProject {
    pub id: ProjectId,
    pub name: String,
    pub description: Option<String>,
    pub cover: Option<String>,
    pub url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct StoredCarouselImage {
    pub id: CarouselImageId,
    pub path: String,
    pub desc: Option<String>,
    pub position: i64,
    pub created_at: DateTime<Utc>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        let storage = Self { pool };
        storage.ensure_schema().await?;
        Ok(storage)
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS projects (
                id          TEXT PRIMARY KEY,
                name        TEXT NOT NULL,
                description TEXT,
                cover       TEXT,
                url         TEXT,
                created_at  TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("failed to ensure projects table exists")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS carousel_images (
                id         TEXT PRIMARY KEY,
                path       TEXT NOT NULL,
                "desc"     TEXT,
                position   INTEGER NOT NULL,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("failed to ensure carousel_images table exists")?;

        Ok(())
    }

    pub async fn insert_project(&self, draft: &ProjectDraft) -> Result<ProjectId> {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO projects (id, name, description, cover, url, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&draft.name)
        .bind(&draft.description)
        .bind(&draft.cover)
        .bind(&draft.url)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(ProjectId(id))
    }

    /// Rows come back in insertion order.
    pub async fn list_projects(&self) -> Result<Vec<StoredProject>> {
        let rows = sqlx::query(
            "SELECT id, name, description, cover, url, created_at
             FROM projects ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(project_from_row).collect()
    }

    /// Overwrites every column with the draft. Returns false when no row has
    /// the given id.
    pub async fn update_project(&self, id: &ProjectId, draft: &ProjectDraft) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE projects SET name = ?, description = ?, cover = ?, url = ? WHERE id = ?",
        )
        .bind(&draft.name)
        .bind(&draft.description)
        .bind(&draft.cover)
        .bind(&draft.url)
        .bind(&id.0)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_project(&self, id: &ProjectId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM projects WHERE id = ?")
            .bind(&id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn insert_carousel_image(
        &self,
        draft: &CarouselImageDraft,
    ) -> Result<CarouselImageId> {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            r#"INSERT INTO carousel_images (id, path, "desc", position, created_at)
               VALUES (?, ?, ?, (SELECT COALESCE(MAX(position), 0) + 1 FROM carousel_images), ?)"#,
        )
        .bind(&id)
        .bind(&draft.path)
        .bind(&draft.desc)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(CarouselImageId(id))
    }

    /// Slides come back in display order (position, then insertion order).
    pub async fn list_carousel_images(&self) -> Result<Vec<StoredCarouselImage>> {
        let rows = sqlx::query(
            r#"SELECT id, path, "desc", position, created_at
               FROM carousel_images ORDER BY position, rowid"#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(carousel_image_from_row).collect()
    }

    pub async fn update_carousel_image(
        &self,
        id: &CarouselImageId,
        draft: &CarouselImageDraft,
    ) -> Result<bool> {
        let result = sqlx::query(r#"UPDATE carousel_images SET path = ?, "desc" = ? WHERE id = ?"#)
            .bind(&draft.path)
            .bind(&draft.desc)
            .bind(&id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_carousel_image(&self, id: &CarouselImageId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM carousel_images WHERE id = ?")
            .bind(&id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn project_from_row(row: sqlx::sqlite::SqliteRow) -> Result<StoredProject> {
    Ok(StoredProject {
        id: ProjectId(row.try_get("id")?),
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        cover: row.try_get("cover")?,
        url: row.try_get("url")?,
        created_at: parse_timestamp(row.try_get("created_at")?)?,
    })
}

fn carousel_image_from_row(row: sqlx::sqlite::SqliteRow) -> Result<StoredCarouselImage> {
    Ok(StoredCarouselImage {
        id: CarouselImageId(row.try_get("id")?),
        path: row.try_get("path")?,
        desc: row.try_get("desc")?,
        position: row.try_get("position")?,
        created_at: parse_timestamp(row.try_get("created_at")?)?,
    })
}

fn parse_timestamp(raw: String) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|parsed| parsed.with_timezone(&Utc))
        .with_context(|| format!("invalid stored timestamp '{raw}'"))
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_file_path(database_url) else {
        return Ok(());
    };
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;
    Ok(())
}

fn sqlite_file_path(database_url: &str) -> Option<PathBuf> {
    if database_url.starts_with("sqlite::memory:") || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
