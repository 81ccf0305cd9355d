//! Generation repository for database operations

use crate::db::connection::DatabasePool;
use crate::db::models::generation::format_timestamp;
use crate::db::models::{GenerationRecord, NewGeneration};
use chrono::{DateTime, Utc};

/// Generation repository for managing gallery records
pub struct GenerationRepository;

impl GenerationRepository {
    /// Insert a new generation record
    ///
    /// # Arguments
    /// * `pool` - Database connection pool
    /// * `generation` - Record payload
    ///
    /// # Returns
    /// Created record or database error
    pub async fn create(
        pool: &DatabasePool,
        generation: &NewGeneration,
    ) -> Result<GenerationRecord, sqlx::Error> {
        let id = uuid::Uuid::new_v4().to_string();
        let article = generation.article.as_ref();
        let categories = article
            .map(|a| serde_json::to_string(&a.category).unwrap_or_else(|_| "[]".to_string()))
            .unwrap_or_else(|| "[]".to_string());

        sqlx::query_as::<_, GenerationRecord>(
            "INSERT INTO generations (id, user_id, created_at, prompt, image_url, used_revised_prompt,
                                      article_title, article_link, article_description,
                                      article_category, article_pub_date)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING *",
        )
        .bind(&id)
        .bind(&generation.user_id)
        .bind(format_timestamp(generation.created_at))
        .bind(&generation.prompt)
        .bind(&generation.image_url)
        .bind(generation.used_revised_prompt)
        .bind(article.map(|a| a.title.clone()))
        .bind(article.map(|a| a.link.clone()).filter(|l| !l.is_empty()))
        .bind(article.map(|a| a.description.clone()))
        .bind(categories)
        .bind(article.map(|a| a.pub_date.clone()).filter(|d| !d.is_empty()))
        .fetch_one(pool)
        .await
    }

    /// List a user's records, newest first
    ///
    /// # Arguments
    /// * `pool` - Database connection pool
    /// * `user_id` - Identity to filter by
    /// * `limit` - Maximum number of records
    pub async fn list_by_user(
        pool: &DatabasePool,
        user_id: &str,
        limit: u32,
    ) -> Result<Vec<GenerationRecord>, sqlx::Error> {
        sqlx::query_as::<_, GenerationRecord>(
            "SELECT * FROM generations WHERE user_id = ? ORDER BY created_at DESC LIMIT ?",
        )
        .bind(user_id)
        .bind(i64::from(limit))
        .fetch_all(pool)
        .await
    }

    /// Count a user's records created at or after `since`
    pub async fn count_since(
        pool: &DatabasePool,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM generations WHERE user_id = ? AND created_at >= ?",
        )
        .bind(user_id)
        .bind(format_timestamp(since))
        .fetch_one(pool)
        .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DatabaseConnection;
    use chrono::Duration;
    use providers::Article;

    async fn setup() -> DatabaseConnection {
        let db = DatabaseConnection::with_max_connections("sqlite::memory:", 1)
            .await
            .unwrap();
        db.run_migrations().await.unwrap();
        db
    }

    #[tokio::test]
    async fn test_create_and_read_back() {
        let db = setup().await;
        let article = Article::new("Rates cut")
            .with_description("Central bank moves")
            .with_category("business");
        let new = NewGeneration::new("u1", "a meme", "https://cdn/1.png")
            .with_revised_prompt(true)
            .with_article(Some(article));

        let created = GenerationRepository::create(db.pool(), &new).await.unwrap();
        let listed = GenerationRepository::list_by_user(db.pool(), "u1", 10)
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        let fetched = &listed[0];

        assert_eq!(fetched, &created);
        assert!(fetched.used_revised_prompt);
        assert_eq!(fetched.article_title.as_deref(), Some("Rates cut"));
        assert_eq!(fetched.categories(), vec!["business"]);
        assert!(fetched.article_link.is_none());
    }

    #[tokio::test]
    async fn test_list_by_user_newest_first() {
        let db = setup().await;
        let now = Utc::now();
        for (i, user) in ["u1", "u2", "u1"].iter().enumerate() {
            let new = NewGeneration::new(*user, format!("p{}", i), "https://cdn/x.png")
                .with_created_at(now + Duration::seconds(i as i64));
            GenerationRepository::create(db.pool(), &new).await.unwrap();
        }

        let listed = GenerationRepository::list_by_user(db.pool(), "u1", 10)
            .await
            .unwrap();
        let prompts: Vec<_> = listed.iter().map(|r| r.prompt.as_str()).collect();
        assert_eq!(prompts, vec!["p2", "p0"]);
    }

    #[tokio::test]
    async fn test_count_since_respects_window() {
        let db = setup().await;
        let now = Utc::now();
        for hours_ago in [30, 2, 1] {
            let new = NewGeneration::new("u1", "p", "https://cdn/x.png")
                .with_created_at(now - Duration::hours(hours_ago));
            GenerationRepository::create(db.pool(), &new).await.unwrap();
        }

        let count = GenerationRepository::count_since(db.pool(), "u1", now - Duration::hours(24))
            .await
            .unwrap();
        assert_eq!(count, 2);
        let other = GenerationRepository::count_since(db.pool(), "u2", now - Duration::hours(24))
            .await
            .unwrap();
        assert_eq!(other, 0);
    }
}
