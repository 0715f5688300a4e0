use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use harvest_core::{ContentQuery, ContentRecord, ContentStorage, Error, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS content (
        source_link TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        body TEXT NOT NULL,
        source_name TEXT NOT NULL,
        content_type TEXT NOT NULL,
        tags TEXT NOT NULL,
        published_at TEXT NOT NULL,
        ingested_at TEXT NOT NULL,
        summary TEXT NOT NULL,
        reading_minutes INTEGER NOT NULL,
        complexity_tier TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_content_published_at ON content (published_at DESC)",
    "CREATE INDEX IF NOT EXISTS idx_content_type ON content (content_type)",
    // Add future migrations here
];

/// Timestamps are stored as fixed-width UTC strings so that ordering the
/// text column orders the instants.
fn encode_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn decode_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Storage(format!("Failed to parse timestamp {}: {}", raw, e)))
}

fn storage_err(context: &str) -> impl FnOnce(sqlx::Error) -> Error + '_ {
    move |e| Error::Storage(format!("{}: {}", context, e))
}

pub struct SqliteStorage {
    pool: Arc<SqlitePool>,
    db_path: PathBuf,
}

impl SqliteStorage {
    pub async fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::Storage(format!("Failed to create database directory: {}", e))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(storage_err("Failed to connect to database"))?;

        for (i, migration) in MIGRATIONS.iter().enumerate() {
            sqlx::query(migration)
                .execute(&pool)
                .await
                .map_err(|e| Error::Storage(format!("Failed to run migration {}: {}", i, e)))?;
        }
        debug!(path = %db_path.display(), "sqlite storage ready");

        Ok(Self {
            pool: Arc::new(pool),
            db_path: db_path.to_path_buf(),
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn row_to_record(row: &SqliteRow) -> Result<ContentRecord> {
        let get_text = |column: &str| -> Result<String> {
            row.try_get::<String, _>(column)
                .map_err(|e| Error::Storage(format!("Failed to read column {}: {}", column, e)))
        };

        let tags: Vec<String> = serde_json::from_str(&get_text("tags")?)?;
        let reading_minutes: i64 = row
            .try_get("reading_minutes")
            .map_err(storage_err("Failed to read column reading_minutes"))?;

        Ok(ContentRecord {
            title: get_text("title")?,
            body: get_text("body")?,
            source_name: get_text("source_name")?,
            source_link: get_text("source_link")?,
            content_type: get_text("content_type")?
                .parse()
                .map_err(|e: Error| Error::Storage(e.to_string()))?,
            tags,
            published_at: decode_timestamp(&get_text("published_at")?)?,
            ingested_at: decode_timestamp(&get_text("ingested_at")?)?,
            summary: get_text("summary")?,
            reading_minutes: u32::try_from(reading_minutes.max(1)).unwrap_or(u32::MAX),
            complexity_tier: get_text("complexity_tier")?.parse()?,
        })
    }
}

#[async_trait]
impl ContentStorage for SqliteStorage {
    async fn upsert(&self, mut record: ContentRecord) -> Result<ContentRecord> {
        record.ingested_at = Utc::now();
        let tags = serde_json::to_string(&record.tags)?;

        sqlx::query(
            r#"
            INSERT INTO content
            (source_link, title, body, source_name, content_type, tags,
             published_at, ingested_at, summary, reading_minutes, complexity_tier)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(source_link) DO UPDATE SET
                title = excluded.title,
                body = excluded.body,
                source_name = excluded.source_name,
                content_type = excluded.content_type,
                tags = excluded.tags,
                published_at = excluded.published_at,
                ingested_at = excluded.ingested_at,
                summary = excluded.summary,
                reading_minutes = excluded.reading_minutes,
                complexity_tier = excluded.complexity_tier
            "#,
        )
        .bind(&record.source_link)
        .bind(&record.title)
        .bind(&record.body)
        .bind(&record.source_name)
        .bind(record.content_type.as_str())
        .bind(tags)
        .bind(encode_timestamp(&record.published_at))
        .bind(encode_timestamp(&record.ingested_at))
        .bind(&record.summary)
        .bind(i64::from(record.reading_minutes))
        .bind(record.complexity_tier.as_str())
        .execute(&*self.pool)
        .await
        .map_err(storage_err("Failed to store content"))?;

        Ok(record)
    }

    async fn query(&self, query: &ContentQuery) -> Result<Vec<ContentRecord>> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM content WHERE 1=1");
        if let Some(content_type) = query.content_type {
            builder.push(" AND content_type = ").push_bind(content_type.as_str());
        }
        if let Some(tag) = &query.tag {
            builder
                .push(" AND EXISTS (SELECT 1 FROM json_each(content.tags) WHERE json_each.value = ")
                .push_bind(tag.clone())
                .push(")");
        }
        builder
            .push(" ORDER BY published_at DESC LIMIT ")
            .push_bind(i64::try_from(query.limit).unwrap_or(i64::MAX));

        let rows = builder
            .build()
            .fetch_all(&*self.pool)
            .await
            .map_err(storage_err("Failed to query content"))?;

        rows.iter().map(Self::row_to_record).collect()
    }

    async fn get(&self, source_link: &str) -> Result<Option<ContentRecord>> {
        let row = sqlx::query("SELECT * FROM content WHERE source_link = ?")
            .bind(source_link)
            .fetch_optional(&*self.pool)
            .await
            .map_err(storage_err("Failed to get content"))?;

        row.as_ref().map(Self::row_to_record).transpose()
    }

    async fn count(&self) -> Result<usize> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM content")
            .fetch_one(&*self.pool)
            .await
            .map_err(storage_err("Failed to count content"))?;
        let n: i64 = row.try_get("n").map_err(storage_err("Failed to read count"))?;
        Ok(n.max(0) as usize)
    }
}
