use super::PostRepository;
use crate::context::Context;
use crate::domain::{Post, PostStatus};
use crate::error::{ImportError, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use libsql::{Builder, Connection, Database, Row, Value};
use tracing::{debug, info, instrument};

const POST_COLUMNS: &str =
    "id, user_id, slug, status, title, content, published_at, updated_at, created_at";

/// `PostRepository` backed by a libSQL database, local file or remote.
pub struct LibsqlRepository {
    db: Database,
}

fn is_remote(url: &str) -> bool {
    ["libsql://", "http://", "https://", "ws://", "wss://"]
        .iter()
        .any(|scheme| url.starts_with(scheme))
}

impl LibsqlRepository {
    /// Open the database named by `url`. `libsql://` and `http(s)://` URLs
    /// connect to a remote server with `auth_token`; anything else is a
    /// local file path, optionally prefixed with `file:`.
    pub async fn connect(url: &str, auth_token: Option<&str>) -> Result<Self> {
        let db = if is_remote(url) {
            info!("Connecting to remote libSQL database at {}", url);
            Builder::new_remote(url.to_string(), auth_token.unwrap_or_default().to_string())
                .build()
                .await
        } else {
            let path = url
                .strip_prefix("file://")
                .or_else(|| url.strip_prefix("file:"))
                .unwrap_or(url);
            info!("Opening local libSQL database at {}", path);
            Builder::new_local(path).build().await
        }
        .map_err(|e| ImportError::storage(format!("failed to connect to database: {e}")))?;

        Ok(Self { db })
    }

    pub fn from_database(db: Database) -> Self {
        Self { db }
    }

    pub fn connection(&self) -> Result<Connection> {
        self.db
            .connect()
            .map_err(|e| ImportError::storage(format!("failed to get database connection: {e}")))
    }
}

fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn parse_ts(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    // SQLite's datetime('now') format, for rows written by other tools.
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|e| ImportError::storage(format!("invalid timestamp {raw:?}: {e}")))
}

fn optional_text(row: &Row, idx: i32) -> Result<Option<String>> {
    match row.get_value(idx)? {
        Value::Null => Ok(None),
        Value::Text(s) => Ok(Some(s)),
        other => Err(ImportError::storage(format!(
            "unexpected value in column {idx}: {other:?}"
        ))),
    }
}

fn optional_ts(row: &Row, idx: i32) -> Result<Option<DateTime<Utc>>> {
    optional_text(row, idx)?
        .filter(|s| !s.is_empty())
        .map(|s| parse_ts(&s))
        .transpose()
}

fn post_from_row(row: &Row) -> Result<Post> {
    let status: String = row.get(3)?;
    Ok(Post {
        id: Some(row.get::<String>(0)?),
        user_id: optional_text(row, 1)?,
        slug: row.get(2)?,
        status: status.parse::<PostStatus>().map_err(ImportError::Storage)?,
        title: row.get(4)?,
        content: row.get(5)?,
        published_at: optional_ts(row, 6)?,
        updated_at: optional_ts(row, 7)?,
        created_at: optional_ts(row, 8)?,
    })
}

impl LibsqlRepository {
    async fn find_one(&self, ctx: &Context, column: &str, value: &str) -> Result<Option<Post>> {
        let sql = format!(
            "SELECT {POST_COLUMNS} FROM {} WHERE {column} = ?1 LIMIT 1",
            Post::TABLE
        );
        ctx.run(async {
            let conn = self.connection()?;
            let mut rows = conn.query(&sql, libsql::params![value]).await?;
            match rows.next().await? {
                Some(row) => Ok(Some(post_from_row(&row)?)),
                None => Ok(None),
            }
        })
        .await
    }
}

#[async_trait]
impl PostRepository for LibsqlRepository {
    #[instrument(skip(self, ctx))]
    async fn user_exists(&self, ctx: &Context, user_id: &str) -> Result<bool> {
        ctx.run(async {
            let conn = self.connection()?;
            let mut rows = conn
                .query(
                    "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1)",
                    libsql::params![user_id],
                )
                .await
                .map_err(|e| ImportError::storage(format!("failed to check user existence: {e}")))?;

            let row = rows.next().await?.ok_or_else(|| {
                ImportError::storage("no result from user existence check")
            })?;
            let exists: i64 = row.get(0)?;
            Ok(exists != 0)
        })
        .await
    }

    async fn find_by_title(&self, ctx: &Context, title: &str) -> Result<Option<Post>> {
        self.find_one(ctx, "title", title)
            .await
            .map_err(|e| e.context("query by title failed"))
    }

    async fn find_by_id(&self, ctx: &Context, id: &str) -> Result<Option<Post>> {
        self.find_one(ctx, "id", id)
            .await
            .map_err(|e| e.context("failed to find post"))
    }

    #[instrument(skip(self, ctx, post), fields(title = %post.title))]
    async fn create(&self, ctx: &Context, post: &mut Post) -> Result<()> {
        let sql = format!(
            "INSERT INTO {} (user_id, slug, status, title, content, published_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
             RETURNING id, created_at",
            Post::TABLE
        );
        let (id, created_at) = ctx
            .run(async {
                let conn = self.connection()?;
                let mut rows = conn
                    .query(
                        &sql,
                        libsql::params![
                            post.user_id.clone(),
                            post.slug.as_str(),
                            post.status.as_str(),
                            post.title.as_str(),
                            post.content.as_str(),
                            post.published_at.as_ref().map(format_ts),
                        ],
                    )
                    .await?;

                let row = rows
                    .next()
                    .await?
                    .ok_or_else(|| ImportError::storage("insert returned no row"))?;
                let id: String = row.get(0)?;
                let created_at: String = row.get(1)?;
                Ok((id, created_at))
            })
            .await
            .map_err(|e| e.context("failed to create post"))?;

        post.created_at = Some(parse_ts(&created_at)?);
        debug!("Created post {} with id {}", post.title, id);
        post.id = Some(id);
        Ok(())
    }

    #[instrument(skip(self, ctx, post), fields(title = %post.title))]
    async fn update(&self, ctx: &Context, id: &str, post: &Post) -> Result<()> {
        let sql = format!(
            "UPDATE {}
             SET user_id = ?1, slug = ?2, status = ?3, title = ?4, content = ?5,
                 published_at = ?6, updated_at = strftime('%Y-%m-%dT%H:%M:%SZ', 'now')
             WHERE id = ?7",
            Post::TABLE
        );
        let affected = ctx
            .run(async {
                let conn = self.connection()?;
                let affected = conn
                    .execute(
                        &sql,
                        libsql::params![
                            post.user_id.clone(),
                            post.slug.as_str(),
                            post.status.as_str(),
                            post.title.as_str(),
                            post.content.as_str(),
                            post.published_at.as_ref().map(format_ts),
                            id,
                        ],
                    )
                    .await?;
                Ok(affected)
            })
            .await
            .map_err(|e| e.context("failed to update post"))?;

        if affected == 0 {
            return Err(ImportError::storage(format!(
                "failed to update post: no post with id {id}"
            )));
        }
        debug!("Updated post {} ({})", post.title, id);
        Ok(())
    }
}
