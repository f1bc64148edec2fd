//! Comment storage.

use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct CommentStore {
    pool: SqlitePool,
}

/// A comment joined with its author and post context.
#[derive(Debug, Clone)]
pub struct Comment {
    pub id: i64,
    pub uuid: String,
    pub post_id: i64,
    pub post_uuid: String,
    pub post_title: String,
    pub author_id: i64,
    pub author_uuid: String,
    pub author_email: String,
    pub author_role: String,
    pub content: String,
    pub approved: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: i64,
    uuid: String,
    post_id: i64,
    post_uuid: String,
    post_title: String,
    author_id: i64,
    author_uuid: String,
    author_email: String,
    author_role: String,
    content: String,
    approved: bool,
    created_at: String,
    updated_at: String,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Self {
            id: row.id,
            uuid: row.uuid,
            post_id: row.post_id,
            post_uuid: row.post_uuid,
            post_title: row.post_title,
            author_id: row.author_id,
            author_uuid: row.author_uuid,
            author_email: row.author_email,
            author_role: row.author_role,
            content: row.content,
            approved: row.approved,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Filter applied to comment listings. `None` fields are not constrained.
#[derive(Debug, Default, Clone)]
pub struct CommentFilter {
    pub post_id: Option<i64>,
    pub author_id: Option<i64>,
    pub approved: Option<bool>,
    /// Contains-match on the comment author's email (admin listings)
    pub author_email: Option<String>,
}

const COMMENT_SELECT: &str = "SELECT c.id, c.uuid, c.post_id, p.uuid AS post_uuid, \
     p.title AS post_title, c.author_id, u.uuid AS author_uuid, u.email AS author_email, \
     u.role AS author_role, c.content, c.approved, c.created_at, c.updated_at \
     FROM comments c \
     JOIN posts p ON p.id = c.post_id \
     JOIN users u ON u.id = c.author_id";

fn filter_sql(filter: &CommentFilter) -> String {
    let mut sql = String::from(" WHERE 1=1");
    if filter.post_id.is_some() {
        sql.push_str(" AND c.post_id = ?");
    }
    if filter.author_id.is_some() {
        sql.push_str(" AND c.author_id = ?");
    }
    if filter.approved.is_some() {
        sql.push_str(" AND c.approved = ?");
    }
    if filter.author_email.is_some() {
        sql.push_str(" AND u.email LIKE '%' || ? || '%'");
    }
    sql
}

impl CommentStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a comment (unapproved). Returns the comment ID.
    pub async fn create(
        &self,
        uuid: &str,
        post_id: i64,
        author_id: i64,
        content: &str,
    ) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO comments (uuid, post_id, author_id, content) VALUES (?, ?, ?, ?)",
        )
        .bind(uuid)
        .bind(post_id)
        .bind(author_id)
        .bind(content)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn get_by_uuid(&self, uuid: &str) -> Result<Option<Comment>, sqlx::Error> {
        let row: Option<CommentRow> =
            sqlx::query_as(&format!("{} WHERE c.uuid = ?", COMMENT_SELECT))
                .bind(uuid)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(Comment::from))
    }

    pub async fn update_content(&self, id: i64, content: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE comments SET content = ?, updated_at = datetime('now') WHERE id = ?",
        )
        .bind(content)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn approve(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE comments SET approved = 1, updated_at = datetime('now') WHERE id = ?",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM comments WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Count comments matching the filter.
    pub async fn count(&self, filter: &CommentFilter) -> Result<i64, sqlx::Error> {
        let sql = format!(
            "SELECT COUNT(*) FROM comments c JOIN users u ON u.id = c.author_id{}",
            filter_sql(filter)
        );
        let mut query = sqlx::query_as::<_, (i64,)>(&sql);
        if let Some(post_id) = filter.post_id {
            query = query.bind(post_id);
        }
        if let Some(author_id) = filter.author_id {
            query = query.bind(author_id);
        }
        if let Some(approved) = filter.approved {
            query = query.bind(approved);
        }
        if let Some(email) = filter.author_email.as_deref() {
            query = query.bind(email.to_string());
        }
        let count = query.fetch_one(&self.pool).await?;
        Ok(count.0)
    }

    /// List comments matching the filter, newest first.
    ///
    /// A `limit` of -1 returns all rows (SQLite treats a negative LIMIT as
    /// unbounded).
    pub async fn list(
        &self,
        filter: &CommentFilter,
        limit: i64,
        skip: i64,
    ) -> Result<Vec<Comment>, sqlx::Error> {
        let sql = format!(
            "{}{} ORDER BY c.created_at DESC LIMIT ? OFFSET ?",
            COMMENT_SELECT,
            filter_sql(filter)
        );
        let mut query = sqlx::query_as::<_, CommentRow>(&sql);
        if let Some(post_id) = filter.post_id {
            query = query.bind(post_id);
        }
        if let Some(author_id) = filter.author_id {
            query = query.bind(author_id);
        }
        if let Some(approved) = filter.approved {
            query = query.bind(approved);
        }
        if let Some(email) = filter.author_email.as_deref() {
            query = query.bind(email.to_string());
        }
        let rows = query
            .bind(limit)
            .bind(skip)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Comment::from).collect())
    }
}
