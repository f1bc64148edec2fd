//! Post storage.

use sqlx::sqlite::SqlitePool;

use crate::category::Category;

#[derive(Clone)]
pub struct PostStore {
    pool: SqlitePool,
}

/// A post joined with its author's public UUID.
#[derive(Debug, Clone)]
pub struct Post {
    pub id: i64,
    pub uuid: String,
    pub author_id: i64,
    pub author_uuid: String,
    pub title: String,
    pub content: String,
    pub category: String,
    pub published: bool,
    pub published_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(sqlx::FromRow)]
struct PostRow {
    id: i64,
    uuid: String,
    author_id: i64,
    author_uuid: String,
    title: String,
    content: String,
    category: String,
    published: bool,
    published_at: Option<String>,
    created_at: String,
    updated_at: String,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Self {
            id: row.id,
            uuid: row.uuid,
            author_id: row.author_id,
            author_uuid: row.author_uuid,
            title: row.title,
            content: row.content,
            category: row.category,
            published: row.published,
            published_at: row.published_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Filter applied to post listings. `None` fields are not constrained.
#[derive(Debug, Default, Clone)]
pub struct PostFilter {
    pub author_id: Option<i64>,
    pub published: Option<bool>,
    pub category: Option<Category>,
    pub search: Option<String>,
}

/// Sort order for post listings.
#[derive(Debug, Clone, Copy)]
pub enum PostOrder {
    /// Most recently published first (public feeds)
    PublishedAtDesc,
    /// Most recently created first (admin and profile views)
    CreatedAtDesc,
}

impl PostOrder {
    fn as_sql(self) -> &'static str {
        match self {
            PostOrder::PublishedAtDesc => " ORDER BY p.published_at DESC",
            PostOrder::CreatedAtDesc => " ORDER BY p.created_at DESC",
        }
    }
}

const POST_SELECT: &str = "SELECT p.id, p.uuid, p.author_id, u.uuid AS author_uuid, p.title, \
     p.content, p.category, p.published, p.published_at, p.created_at, p.updated_at \
     FROM posts p JOIN users u ON u.id = p.author_id";

fn filter_sql(filter: &PostFilter) -> String {
    let mut sql = String::from(" WHERE 1=1");
    if filter.author_id.is_some() {
        sql.push_str(" AND p.author_id = ?");
    }
    if filter.published.is_some() {
        sql.push_str(" AND p.published = ?");
    }
    if filter.category.is_some() {
        sql.push_str(" AND p.category = ?");
    }
    if filter.search.is_some() {
        sql.push_str(" AND (p.title LIKE '%' || ? || '%' OR p.content LIKE '%' || ? || '%')");
    }
    sql
}

impl PostStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a post (unpublished) and attach its tags. Returns the post ID.
    pub async fn create(
        &self,
        uuid: &str,
        author_id: i64,
        title: &str,
        content: &str,
        category: Category,
        tag_ids: &[i64],
    ) -> Result<i64, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "INSERT INTO posts (uuid, author_id, title, content, category) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(uuid)
        .bind(author_id)
        .bind(title)
        .bind(content)
        .bind(category.as_str())
        .execute(&mut *tx)
        .await?;
        let post_id = result.last_insert_rowid();

        for tag_id in tag_ids {
            sqlx::query("INSERT OR IGNORE INTO post_tags (post_id, tag_id) VALUES (?, ?)")
                .bind(post_id)
                .bind(tag_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(post_id)
    }

    pub async fn get_by_uuid(&self, uuid: &str) -> Result<Option<Post>, sqlx::Error> {
        let row: Option<PostRow> =
            sqlx::query_as(&format!("{} WHERE p.uuid = ?", POST_SELECT))
                .bind(uuid)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(Post::from))
    }

    /// Get a post only if it is published.
    pub async fn get_published_by_uuid(&self, uuid: &str) -> Result<Option<Post>, sqlx::Error> {
        let row: Option<PostRow> =
            sqlx::query_as(&format!("{} WHERE p.uuid = ? AND p.published = 1", POST_SELECT))
                .bind(uuid)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(Post::from))
    }

    /// Get a post only if the given user authored it.
    pub async fn get_by_uuid_for_author(
        &self,
        uuid: &str,
        author_id: i64,
    ) -> Result<Option<Post>, sqlx::Error> {
        let row: Option<PostRow> =
            sqlx::query_as(&format!("{} WHERE p.uuid = ? AND p.author_id = ?", POST_SELECT))
                .bind(uuid)
                .bind(author_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(Post::from))
    }

    /// Whether the author already has a post with this title.
    pub async fn title_exists_for_author(
        &self,
        title: &str,
        author_id: i64,
    ) -> Result<bool, sqlx::Error> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT 1 FROM posts WHERE title = ? AND author_id = ?")
                .bind(title)
                .bind(author_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.is_some())
    }

    /// Update post fields. A `None` keeps the stored value.
    pub async fn update(
        &self,
        id: i64,
        title: Option<&str>,
        content: Option<&str>,
        category: Option<Category>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE posts
             SET title = COALESCE(?, title),
                 content = COALESCE(?, content),
                 category = COALESCE(?, category),
                 updated_at = datetime('now')
             WHERE id = ?",
        )
        .bind(title)
        .bind(content)
        .bind(category.map(|c| c.as_str()))
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Set the publish state. Publishing stamps `published_at`, unpublishing
    /// clears it.
    pub async fn set_published(&self, id: i64, published: bool) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE posts
             SET published = ?,
                 published_at = CASE WHEN ? THEN datetime('now') ELSE NULL END,
                 updated_at = datetime('now')
             WHERE id = ?",
        )
        .bind(published)
        .bind(published)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete every post by the given author. Returns the number removed.
    pub async fn delete_all_by_author(&self, author_id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM posts WHERE author_id = ?")
            .bind(author_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Count posts matching the filter.
    pub async fn count(&self, filter: &PostFilter) -> Result<i64, sqlx::Error> {
        let sql = format!("SELECT COUNT(*) FROM posts p{}", filter_sql(filter));
        let mut query = sqlx::query_as::<_, (i64,)>(&sql);
        if let Some(author_id) = filter.author_id {
            query = query.bind(author_id);
        }
        if let Some(published) = filter.published {
            query = query.bind(published);
        }
        if let Some(category) = filter.category {
            query = query.bind(category.as_str());
        }
        if let Some(search) = filter.search.as_deref() {
            query = query.bind(search.to_string());
            query = query.bind(search.to_string());
        }
        let count = query.fetch_one(&self.pool).await?;
        Ok(count.0)
    }

    /// List posts matching the filter, paginated.
    pub async fn list(
        &self,
        filter: &PostFilter,
        order: PostOrder,
        limit: i64,
        skip: i64,
    ) -> Result<Vec<Post>, sqlx::Error> {
        let sql = format!(
            "{}{}{} LIMIT ? OFFSET ?",
            POST_SELECT,
            filter_sql(filter),
            order.as_sql()
        );
        let mut query = sqlx::query_as::<_, PostRow>(&sql);
        if let Some(author_id) = filter.author_id {
            query = query.bind(author_id);
        }
        if let Some(published) = filter.published {
            query = query.bind(published);
        }
        if let Some(category) = filter.category {
            query = query.bind(category.as_str());
        }
        if let Some(search) = filter.search.as_deref() {
            query = query.bind(search.to_string());
            query = query.bind(search.to_string());
        }
        let rows = query
            .bind(limit)
            .bind(skip)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Post::from).collect())
    }

    /// All posts by an author, newest first (profile views).
    pub async fn list_by_author(&self, author_id: i64) -> Result<Vec<Post>, sqlx::Error> {
        let rows: Vec<PostRow> = sqlx::query_as(&format!(
            "{} WHERE p.author_id = ? ORDER BY p.created_at DESC",
            POST_SELECT
        ))
        .bind(author_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Post::from).collect())
    }

    /// Posts carrying the given tag, newest first.
    pub async fn list_by_tag(
        &self,
        tag_id: i64,
        published_only: bool,
    ) -> Result<Vec<Post>, sqlx::Error> {
        let mut sql = format!(
            "{} JOIN post_tags pt ON pt.post_id = p.id WHERE pt.tag_id = ?",
            POST_SELECT
        );
        if published_only {
            sql.push_str(" AND p.published = 1");
        }
        sql.push_str(" ORDER BY p.created_at DESC");

        let rows: Vec<PostRow> = sqlx::query_as(&sql).bind(tag_id).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Post::from).collect())
    }

    /// Number of posts referencing the given tag.
    pub async fn count_by_tag(&self, tag_id: i64) -> Result<i64, sqlx::Error> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM post_tags WHERE tag_id = ?")
            .bind(tag_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0)
    }
}
