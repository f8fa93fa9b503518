//! SQLite storage implementation

use super::errors::{PostError, PostResult};
use super::storage::{PostStorage, UserDirectory};
use super::types::{Collaboration, Post, PostDraft, PostId, PostListing, User, UserId};
use crate::auth::ScopeFilter;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::{debug, info};

const COMPONENT: &str = "sqlite_storage";

/// Upper bound on values bound into one `IN (...)` list. SQLite builds before
/// 3.32 reject statements with more than 999 variables.
const BIND_BATCH: usize = 500;

const POST_COLUMNS: &str = "SELECT posts.id, posts.user_id, posts.title, posts.content, \
     posts.restricted, posts.created_at, posts.updated_at FROM posts";

#[derive(sqlx::FromRow)]
struct PostRow {
    id: PostId,
    user_id: UserId,
    title: String,
    content: String,
    restricted: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PostRow {
    fn into_post(self, collaborations: Vec<Collaboration>) -> Post {
        Post {
            id: self.id,
            owner_id: self.user_id,
            title: self.title,
            content: self.content,
            restricted: self.restricted,
            created_at: self.created_at,
            updated_at: self.updated_at,
            collaborations,
        }
    }
}

fn db_error(operation: &str, e: sqlx::Error) -> PostError {
    PostError::storage(
        COMPONENT,
        format!("Failed to {}: {}", operation, e),
        !matches!(e, sqlx::Error::Database(_)),
    )
}

/// Foreign key failures on collaborations mean a referenced user is missing
fn collaboration_error(e: sqlx::Error) -> PostError {
    match &e {
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => PostError::UserNotFound {
            reference: "collaborator".to_string(),
        },
        _ => db_error("write collaborations", e),
    }
}

/// Posts, users and collaborations backed by SQLite
#[derive(Clone)]
pub struct SqlitePostStorage {
    pool: SqlitePool,
}

impl SqlitePostStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open a pool for `url`. In-memory databases are pinned to a single
    /// long-lived connection so every query sees the same data.
    pub async fn connect(url: &str, max_connections: u32) -> PostResult<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| db_error("parse database url", e))?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool_options = if url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(max_connections)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| db_error("connect to SQLite database", e))?;

        info!(url, "Connected to SQLite database");
        Ok(Self::new(pool))
    }

    /// Run database migrations
    pub async fn migrate(&self) -> PostResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| {
                PostError::storage(COMPONENT, format!("Database migration failed: {}", e), false)
            })?;

        info!("Database migrations completed successfully");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn load_collaborations(
        &self,
        post_ids: &[PostId],
    ) -> PostResult<HashMap<PostId, Vec<Collaboration>>> {
        let mut grouped: HashMap<PostId, Vec<Collaboration>> = HashMap::new();
        if post_ids.is_empty() {
            return Ok(grouped);
        }

        for batch in post_ids.chunks(BIND_BATCH) {
            let mut query = QueryBuilder::<Sqlite>::new(
                "SELECT user_id, post_id FROM collaborations WHERE post_id IN (",
            );
            let mut ids = query.separated(", ");
            for id in batch {
                ids.push_bind(id.0);
            }
            ids.push_unseparated(")");
            query.push(" ORDER BY post_id, user_id");

            let rows: Vec<Collaboration> = query
                .build_query_as()
                .fetch_all(&self.pool)
                .await
                .map_err(|e| db_error("load collaborations", e))?;

            for collaboration in rows {
                grouped
                    .entry(collaboration.post_id)
                    .or_default()
                    .push(collaboration);
            }
        }
        Ok(grouped)
    }

    async fn write_collaborations(
        conn: &mut SqliteConnection,
        post_id: PostId,
        user_ids: &[UserId],
    ) -> PostResult<()> {
        sqlx::query("DELETE FROM collaborations WHERE post_id = ?")
            .bind(post_id)
            .execute(&mut *conn)
            .await
            .map_err(|e| db_error("clear collaborations", e))?;

        let mut ids = user_ids.to_vec();
        ids.sort();
        ids.dedup();

        for user_id in ids {
            sqlx::query("INSERT INTO collaborations (user_id, post_id) VALUES (?, ?)")
                .bind(user_id)
                .bind(post_id)
                .execute(&mut *conn)
                .await
                .map_err(collaboration_error)?;
        }
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for SqlitePostStorage {
    async fn create_user(&self, email: &str, is_admin: bool) -> PostResult<User> {
        let email = email.trim();
        if email.is_empty() {
            return Err(PostError::invalid("email", "can't be blank"));
        }

        let result = sqlx::query("INSERT INTO users (email, admin, created_at) VALUES (?, ?, ?)")
            .bind(email)
            .bind(is_admin)
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    PostError::invalid("email", "has already been taken")
                }
                _ => db_error("insert user", e),
            })?;

        let user = User {
            id: UserId(result.last_insert_rowid()),
            email: email.to_string(),
            is_admin,
        };
        debug!("Created user {} in SQLite storage", user.id);
        Ok(user)
    }

    async fn find_user(&self, id: UserId) -> PostResult<Option<User>> {
        sqlx::query_as::<_, User>("SELECT id, email, admin FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("load user", e))
    }

    async fn find_users_by_email(&self, emails: &[String]) -> PostResult<Vec<User>> {
        if emails.is_empty() {
            return Ok(Vec::new());
        }

        let mut users: Vec<User> = Vec::new();
        for batch in emails.chunks(BIND_BATCH) {
            let mut query =
                QueryBuilder::<Sqlite>::new("SELECT id, email, admin FROM users WHERE email IN (");
            let mut values = query.separated(", ");
            for email in batch {
                values.push_bind(email.as_str());
            }
            values.push_unseparated(")");

            let found: Vec<User> = query
                .build_query_as()
                .fetch_all(&self.pool)
                .await
                .map_err(|e| db_error("load users by email", e))?;
            users.extend(found);
        }

        users.sort_by_key(|u| u.id);
        users.dedup_by_key(|u| u.id);
        Ok(users)
    }
}

#[async_trait]
impl PostStorage for SqlitePostStorage {
    async fn find_all(
        &self,
        filter: &ScopeFilter,
        listing: &PostListing,
    ) -> PostResult<Vec<Post>> {
        let mut query = QueryBuilder::<Sqlite>::new(POST_COLUMNS);
        query.push(" WHERE (");
        filter.push_sql(&mut query);
        query.push(")");
        if let Some(owner) = listing.created_by {
            query.push(" AND posts.user_id = ").push_bind(owner.0);
        }
        if listing.with_collaborators {
            query.push(
                " AND EXISTS (SELECT 1 FROM collaborations WHERE collaborations.post_id = posts.id)",
            );
        }
        query.push(" ORDER BY posts.id ASC");

        debug!(filter = %filter, sql = query.sql(), "Listing posts");

        let rows: Vec<PostRow> = query
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("list posts", e))?;

        let ids: Vec<PostId> = rows.iter().map(|r| r.id).collect();
        let mut collaborations = self.load_collaborations(&ids).await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let collaborations = collaborations.remove(&row.id).unwrap_or_default();
                row.into_post(collaborations)
            })
            .collect())
    }

    async fn find_by_id(&self, id: PostId) -> PostResult<Option<Post>> {
        let row: Option<PostRow> = sqlx::query_as(&format!("{} WHERE posts.id = ?", POST_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("load post", e))?;

        match row {
            Some(row) => {
                let mut collaborations = self.load_collaborations(&[row.id]).await?;
                let collaborations = collaborations.remove(&row.id).unwrap_or_default();
                Ok(Some(row.into_post(collaborations)))
            }
            None => Ok(None),
        }
    }

    async fn insert_post(&self, draft: &PostDraft) -> PostResult<Post> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("begin transaction", e))?;

        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO posts (user_id, title, content, restricted, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(draft.owner_id)
        .bind(&draft.title)
        .bind(&draft.content)
        .bind(draft.restricted)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                PostError::UserNotFound {
                    reference: draft.owner_id.to_string(),
                }
            }
            _ => db_error("insert post", e),
        })?;

        let id = PostId(result.last_insert_rowid());
        Self::write_collaborations(&mut *tx, id, &draft.collaborator_ids).await?;

        tx.commit()
            .await
            .map_err(|e| db_error("commit transaction", e))?;

        debug!("Saved post {} to SQLite storage", id);
        self.find_by_id(id)
            .await?
            .ok_or(PostError::NotFound { post_id: id })
    }

    async fn update_post(
        &self,
        post: &Post,
        collaborators: Option<&[UserId]>,
    ) -> PostResult<Post> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("begin transaction", e))?;

        let result = sqlx::query(
            "UPDATE posts SET title = ?, content = ?, restricted = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&post.title)
        .bind(&post.content)
        .bind(post.restricted)
        .bind(Utc::now())
        .bind(post.id)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("update post", e))?;

        if result.rows_affected() == 0 {
            return Err(PostError::NotFound { post_id: post.id });
        }

        if let Some(user_ids) = collaborators {
            Self::write_collaborations(&mut *tx, post.id, user_ids).await?;
        }

        tx.commit()
            .await
            .map_err(|e| db_error("commit transaction", e))?;

        debug!("Updated post {} in SQLite storage", post.id);
        self.find_by_id(post.id)
            .await?
            .ok_or(PostError::NotFound { post_id: post.id })
    }

    async fn delete_post(&self, id: PostId) -> PostResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("begin transaction", e))?;

        sqlx::query("DELETE FROM collaborations WHERE post_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("delete collaborations", e))?;

        let result = sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("delete post", e))?;

        if result.rows_affected() == 0 {
            return Err(PostError::NotFound { post_id: id });
        }

        tx.commit()
            .await
            .map_err(|e| db_error("commit transaction", e))?;

        debug!("Deleted post {} from SQLite storage", id);
        Ok(())
    }

    async fn replace_collaborators(&self, id: PostId, user_ids: &[UserId]) -> PostResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("begin transaction", e))?;

        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM posts WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| db_error("load post", e))?;
        if exists.is_none() {
            return Err(PostError::NotFound { post_id: id });
        }

        Self::write_collaborations(&mut *tx, id, user_ids).await?;

        tx.commit()
            .await
            .map_err(|e| db_error("commit transaction", e))
    }

    async fn is_collaborator(&self, id: PostId, user_id: UserId) -> PostResult<bool> {
        let found: Option<i64> = sqlx::query_scalar(
            "SELECT 1 FROM collaborations WHERE post_id = ? AND user_id = ? LIMIT 1",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("check collaboration", e))?;

        Ok(found.is_some())
    }

    async fn health_check(&self) -> PostResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("run health check", e))?;
        Ok(())
    }
}
