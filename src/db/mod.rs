mod comment;
mod post;
mod tag;
mod user;

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::revocation::SqliteRevocationStore;

pub use comment::{Comment, CommentFilter, CommentStore};
pub use post::{Post, PostFilter, PostOrder, PostStore};
pub use tag::{Tag, TagStore, TagWithCount};
pub use user::{User, UserRole, UserStore};

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open or create a database at the given path.
    /// Use ":memory:" for an in-memory database.
    pub async fn open(path: &str) -> Result<Self, sqlx::Error> {
        let url = if path == ":memory:" {
            "sqlite::memory:".to_string()
        } else {
            format!("sqlite:{}?mode=rwc", path)
        };

        // An in-memory database exists per connection, so the pool must not
        // grow past a single connection for ":memory:".
        let max_connections = if path == ":memory:" { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(&url)
            .await?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Get the current schema version.
    async fn get_version(&self) -> Result<i32, sqlx::Error> {
        let result: Option<(i32,)> = sqlx::query_as("SELECT version FROM schema_version LIMIT 1")
            .fetch_optional(&self.pool)
            .await?;
        Ok(result.map(|r| r.0).unwrap_or(0))
    }

    /// Set the schema version within a transaction.
    async fn set_version(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        version: i32,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM schema_version")
            .execute(&mut **tx)
            .await?;
        sqlx::query("INSERT INTO schema_version (version) VALUES (?)")
            .bind(version)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// Run database migrations.
    async fn migrate(&self) -> Result<(), sqlx::Error> {
        sqlx::query("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)")
            .execute(&self.pool)
            .await?;

        let version = self.get_version().await?;

        if version < 1 {
            self.migrate_v1().await?;
        }

        Ok(())
    }

    /// Execute a list of queries in a transaction, then set the version.
    async fn run_migration(
        &self,
        version: i32,
        queries: &[&'static str],
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        for query in queries {
            sqlx::query(*query).execute(&mut *tx).await?;
        }
        Self::set_version(&mut tx, version).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn migrate_v1(&self) -> Result<(), sqlx::Error> {
        self.run_migration(
            1,
            &[
                // Users table
                "CREATE TABLE users (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    uuid TEXT UNIQUE NOT NULL,
                    username TEXT UNIQUE NOT NULL COLLATE NOCASE,
                    email TEXT UNIQUE NOT NULL COLLATE NOCASE,
                    password_hash TEXT NOT NULL,
                    role TEXT NOT NULL DEFAULT 'USER',
                    created_at TEXT NOT NULL DEFAULT (datetime('now')),
                    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
                )",
                "CREATE INDEX idx_users_uuid ON users(uuid)",
                "CREATE INDEX idx_users_email ON users(email)",
                // Posts table
                "CREATE TABLE posts (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    uuid TEXT UNIQUE NOT NULL,
                    author_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                    title TEXT NOT NULL,
                    content TEXT NOT NULL,
                    category TEXT NOT NULL,
                    published INTEGER NOT NULL DEFAULT 0,
                    published_at TEXT,
                    created_at TEXT NOT NULL DEFAULT (datetime('now')),
                    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
                )",
                "CREATE INDEX idx_posts_uuid ON posts(uuid)",
                "CREATE INDEX idx_posts_author_id ON posts(author_id)",
                "CREATE INDEX idx_posts_published ON posts(published)",
                "CREATE INDEX idx_posts_category ON posts(category)",
                // Comments table
                "CREATE TABLE comments (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    uuid TEXT UNIQUE NOT NULL,
                    post_id INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
                    author_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                    content TEXT NOT NULL,
                    approved INTEGER NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL DEFAULT (datetime('now')),
                    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
                )",
                "CREATE INDEX idx_comments_uuid ON comments(uuid)",
                "CREATE INDEX idx_comments_post_id ON comments(post_id)",
                "CREATE INDEX idx_comments_author_id ON comments(author_id)",
                "CREATE INDEX idx_comments_approved ON comments(approved)",
                // Tags, lower-cased names, and the post relation
                "CREATE TABLE tags (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    uuid TEXT UNIQUE NOT NULL,
                    name TEXT UNIQUE NOT NULL
                )",
                "CREATE TABLE post_tags (
                    post_id INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
                    tag_id INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
                    PRIMARY KEY (post_id, tag_id)
                )",
                "CREATE INDEX idx_post_tags_tag_id ON post_tags(tag_id)",
                // Revoked tokens with per-key expiry (Unix seconds)
                "CREATE TABLE revoked_tokens (
                    key TEXT PRIMARY KEY,
                    expires_at INTEGER NOT NULL
                )",
                "CREATE INDEX idx_revoked_tokens_expires_at ON revoked_tokens(expires_at)",
            ],
        )
        .await
    }

    /// Get the user store.
    pub fn users(&self) -> UserStore {
        UserStore::new(self.pool.clone())
    }

    /// Get the post store.
    pub fn posts(&self) -> PostStore {
        PostStore::new(self.pool.clone())
    }

    /// Get the comment store.
    pub fn comments(&self) -> CommentStore {
        CommentStore::new(self.pool.clone())
    }

    /// Get the tag store.
    pub fn tags(&self) -> TagStore {
        TagStore::new(self.pool.clone())
    }

    /// Get the revocation store.
    pub fn revocations(&self) -> SqliteRevocationStore {
        SqliteRevocationStore::new(self.pool.clone())
    }

    /// Get the underlying connection pool (for tests that need raw SQL access).
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Begin a new transaction.
    pub async fn begin(&self) -> Result<sqlx::Transaction<'_, sqlx::Sqlite>, sqlx::Error> {
        self.pool.begin().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::Category;

    async fn create_user(db: &Database, name: &str) -> i64 {
        db.users()
            .create(
                &format!("uuid-{}", name),
                name,
                &format!("{}@example.com", name),
                "hash",
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_and_get_user() {
        let db = Database::open(":memory:").await.unwrap();

        let id = create_user(&db, "alice").await;

        let user = db.users().get_by_username("alice").await.unwrap().unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.uuid, "uuid-alice");
        assert_eq!(user.email, "alice@example.com");
        assert_eq!(user.role, UserRole::User);

        let user = db.users().get_by_uuid("uuid-alice").await.unwrap().unwrap();
        assert_eq!(user.id, id);

        let user = db
            .users()
            .get_by_email("ALICE@EXAMPLE.COM")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.id, id);
    }

    #[tokio::test]
    async fn test_duplicate_email_fails() {
        let db = Database::open(":memory:").await.unwrap();

        create_user(&db, "alice").await;
        let result = db
            .users()
            .create("uuid-2", "bob", "Alice@Example.com", "hash")
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_set_role() {
        let db = Database::open(":memory:").await.unwrap();

        let id = create_user(&db, "alice").await;
        assert!(db.users().set_role(id, UserRole::Admin).await.unwrap());

        let user = db.users().get_by_id(id).await.unwrap().unwrap();
        assert_eq!(user.role, UserRole::Admin);
        assert!(db.users().any_admin().await.unwrap());
    }

    #[tokio::test]
    async fn test_post_filters_and_count() {
        let db = Database::open(":memory:").await.unwrap();
        let author = create_user(&db, "alice").await;

        for i in 0..3 {
            let id = db
                .posts()
                .create(
                    &format!("post-{}", i),
                    author,
                    &format!("Title {}", i),
                    "Some long enough content",
                    Category::Technology,
                    &[],
                )
                .await
                .unwrap();
            if i < 2 {
                db.posts().set_published(id, true).await.unwrap();
            }
        }

        let published = PostFilter {
            published: Some(true),
            ..Default::default()
        };
        assert_eq!(db.posts().count(&published).await.unwrap(), 2);

        let travel = PostFilter {
            category: Some(Category::Travel),
            ..Default::default()
        };
        assert_eq!(db.posts().count(&travel).await.unwrap(), 0);

        let search = PostFilter {
            search: Some("title 1".to_string()),
            ..Default::default()
        };
        // LIKE is case-insensitive for ASCII
        assert_eq!(db.posts().count(&search).await.unwrap(), 1);

        let listed = db
            .posts()
            .list(&published, PostOrder::PublishedAtDesc, 10, 0)
            .await
            .unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].author_uuid, "uuid-alice");
    }

    #[tokio::test]
    async fn test_post_publish_stamps_published_at() {
        let db = Database::open(":memory:").await.unwrap();
        let author = create_user(&db, "alice").await;
        let id = db
            .posts()
            .create("post-1", author, "Title", "Content here", Category::Food, &[])
            .await
            .unwrap();

        let post = db.posts().get_by_uuid("post-1").await.unwrap().unwrap();
        assert!(!post.published);
        assert!(post.published_at.is_none());

        db.posts().set_published(id, true).await.unwrap();
        let post = db.posts().get_by_uuid("post-1").await.unwrap().unwrap();
        assert!(post.published);
        assert!(post.published_at.is_some());

        db.posts().set_published(id, false).await.unwrap();
        let post = db.posts().get_by_uuid("post-1").await.unwrap().unwrap();
        assert!(!post.published);
        assert!(post.published_at.is_none());
    }

    #[tokio::test]
    async fn test_comment_filters() {
        let db = Database::open(":memory:").await.unwrap();
        let author = create_user(&db, "alice").await;
        let commenter = create_user(&db, "bob").await;
        let post_id = db
            .posts()
            .create("post-1", author, "Title", "Content here", Category::Food, &[])
            .await
            .unwrap();

        let c1 = db
            .comments()
            .create("c-1", post_id, commenter, "First!")
            .await
            .unwrap();
        db.comments()
            .create("c-2", post_id, commenter, "Second!")
            .await
            .unwrap();
        db.comments().approve(c1).await.unwrap();

        let approved = CommentFilter {
            post_id: Some(post_id),
            approved: Some(true),
            ..Default::default()
        };
        assert_eq!(db.comments().count(&approved).await.unwrap(), 1);

        let by_email = CommentFilter {
            post_id: Some(post_id),
            author_email: Some("bob@".to_string()),
            ..Default::default()
        };
        assert_eq!(db.comments().count(&by_email).await.unwrap(), 2);

        let comments = db.comments().list(&by_email, 10, 0).await.unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].author_email, "bob@example.com");
        assert_eq!(comments[0].post_uuid, "post-1");
    }

    #[tokio::test]
    async fn test_tag_find_or_create_and_usage() {
        let db = Database::open(":memory:").await.unwrap();
        let author = create_user(&db, "alice").await;

        let first = db.tags().find_or_create("rust").await.unwrap();
        let second = db.tags().find_or_create("rust").await.unwrap();
        assert_eq!(first, second);

        db.posts()
            .create(
                "post-1",
                author,
                "Title",
                "Content here",
                Category::Technology,
                &[first],
            )
            .await
            .unwrap();

        assert_eq!(db.posts().count_by_tag(first).await.unwrap(), 1);

        let tags = db.tags().list(None, 10, 0).await.unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].post_count, 1);
    }

    #[tokio::test]
    async fn test_deleting_post_cascades_comments_and_tag_links() {
        let db = Database::open(":memory:").await.unwrap();
        let author = create_user(&db, "alice").await;
        let tag = db.tags().find_or_create("rust").await.unwrap();
        let post_id = db
            .posts()
            .create("post-1", author, "Title", "Content here", Category::Food, &[tag])
            .await
            .unwrap();
        db.comments()
            .create("c-1", post_id, author, "hello")
            .await
            .unwrap();

        assert!(db.posts().delete(post_id).await.unwrap());
        assert!(db.comments().get_by_uuid("c-1").await.unwrap().is_none());
        assert_eq!(db.posts().count_by_tag(tag).await.unwrap(), 0);
        // The tag itself survives; only the link is removed.
        assert!(db.tags().get_by_name("rust").await.unwrap().is_some());
    }
}
