//! Tag storage. Tag names are stored lower-cased; callers normalize before
//! lookup so uniqueness is case-insensitive.

use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct TagStore {
    pool: SqlitePool,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Tag {
    pub id: i64,
    pub uuid: String,
    pub name: String,
}

/// A tag with the number of posts referencing it.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TagWithCount {
    pub id: i64,
    pub uuid: String,
    pub name: String,
    pub post_count: i64,
}

impl TagStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a tag. The name must already be lower-cased.
    pub async fn create(&self, uuid: &str, name: &str) -> Result<i64, sqlx::Error> {
        let result = sqlx::query("INSERT INTO tags (uuid, name) VALUES (?, ?)")
            .bind(uuid)
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(result.last_insert_rowid())
    }

    /// Get the tag with the given lower-cased name, creating it if absent.
    pub async fn find_or_create(&self, name: &str) -> Result<i64, sqlx::Error> {
        if let Some(tag) = self.get_by_name(name).await? {
            return Ok(tag.id);
        }
        let uuid = uuid::Uuid::new_v4().to_string();
        sqlx::query("INSERT OR IGNORE INTO tags (uuid, name) VALUES (?, ?)")
            .bind(&uuid)
            .bind(name)
            .execute(&self.pool)
            .await?;
        let tag: (i64,) = sqlx::query_as("SELECT id FROM tags WHERE name = ?")
            .bind(name)
            .fetch_one(&self.pool)
            .await?;
        Ok(tag.0)
    }

    pub async fn get_by_uuid(&self, uuid: &str) -> Result<Option<Tag>, sqlx::Error> {
        let row: Option<Tag> = sqlx::query_as("SELECT id, uuid, name FROM tags WHERE uuid = ?")
            .bind(uuid)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn get_by_name(&self, name: &str) -> Result<Option<Tag>, sqlx::Error> {
        let row: Option<Tag> = sqlx::query_as("SELECT id, uuid, name FROM tags WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// Rename a tag. The new name must already be lower-cased.
    pub async fn rename(&self, id: i64, name: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE tags SET name = ? WHERE id = ?")
            .bind(name)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tags WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Count tags whose name contains the search term.
    pub async fn count(&self, search: Option<&str>) -> Result<i64, sqlx::Error> {
        let count: (i64,) = match search {
            Some(search) => {
                sqlx::query_as("SELECT COUNT(*) FROM tags WHERE name LIKE '%' || ? || '%'")
                    .bind(search.to_string())
                    .fetch_one(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_as("SELECT COUNT(*) FROM tags")
                    .fetch_one(&self.pool)
                    .await?
            }
        };
        Ok(count.0)
    }

    /// List tags with usage counts, most-used first.
    pub async fn list(
        &self,
        search: Option<&str>,
        limit: i64,
        skip: i64,
    ) -> Result<Vec<TagWithCount>, sqlx::Error> {
        let mut sql = String::from(
            "SELECT t.id, t.uuid, t.name, COUNT(pt.post_id) AS post_count \
             FROM tags t LEFT JOIN post_tags pt ON pt.tag_id = t.id",
        );
        if search.is_some() {
            sql.push_str(" WHERE t.name LIKE '%' || ? || '%'");
        }
        sql.push_str(" GROUP BY t.id ORDER BY post_count DESC, t.name LIMIT ? OFFSET ?");

        let mut query = sqlx::query_as::<_, TagWithCount>(&sql);
        if let Some(search) = search {
            query = query.bind(search.to_string());
        }
        let rows = query
            .bind(limit)
            .bind(skip)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Tags attached to a post, alphabetical.
    pub async fn for_post(&self, post_id: i64) -> Result<Vec<Tag>, sqlx::Error> {
        let rows: Vec<Tag> = sqlx::query_as(
            "SELECT t.id, t.uuid, t.name FROM tags t \
             JOIN post_tags pt ON pt.tag_id = t.id \
             WHERE pt.post_id = ? ORDER BY t.name",
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
