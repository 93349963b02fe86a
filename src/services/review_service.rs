use serde::Deserialize;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;
use validator::Validate;

use crate::database::models::{Bootcamp, Review, User};
use crate::database::{Repository, Resource};
use crate::error::ApiError;
use crate::services::{ensure_owner, required};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateReview {
    #[validate(
        required(message = "Please add a title for the review"),
        length(min = 1, max = 100, message = "Title can not be more than 100 characters")
    )]
    pub title: Option<String>,
    #[validate(required(message = "Please add some text"))]
    pub text: Option<String>,
    #[validate(
        required(message = "Please add a rating between 1 and 10"),
        range(min = 1, max = 10, message = "Please add a rating between 1 and 10")
    )]
    pub rating: Option<i32>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateReview {
    #[validate(length(min = 1, max = 100, message = "Title can not be more than 100 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 1, message = "Please add some text"))]
    pub text: Option<String>,
    #[validate(range(min = 1, max = 10, message = "Please add a rating between 1 and 10"))]
    pub rating: Option<i32>,
}

pub struct ReviewService {
    pool: PgPool,
}

impl ReviewService {
    pub fn new(pool: &PgPool) -> Self {
        Self { pool: pool.clone() }
    }

    pub async fn list_for_bootcamp(&self, bootcamp_id: Uuid) -> Result<Vec<Review>, ApiError> {
        Ok(Repository::<Review>::new(&self.pool)
            .select_by_parent("bootcamp_id", bootcamp_id)
            .await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<Review, ApiError> {
        Ok(Repository::<Review>::new(&self.pool).select_404(id).await?)
    }

    /// One review per user and bootcamp; a second one fails on the store index
    pub async fn create(&self, user: &User, bootcamp_id: Uuid, input: CreateReview) -> Result<Review, ApiError> {
        let bootcamp = Repository::<Bootcamp>::new(&self.pool).select_404(bootcamp_id).await?;

        let title = required(input.title, "Please add a title for the review")?;
        let text = required(input.text, "Please add some text")?;
        let rating = required(input.rating, "Please add a rating between 1 and 10")?;

        let query = format!(
            "INSERT INTO reviews (id, title, text, rating, bootcamp_id, user_id) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            Review::COLUMNS
        );
        let review = sqlx::query_as::<_, Review>(&query)
            .bind(Uuid::new_v4())
            .bind(title.trim())
            .bind(text)
            .bind(rating)
            .bind(bootcamp.id)
            .bind(user.id)
            .fetch_one(&self.pool)
            .await?;

        recompute_average_rating(&self.pool, bootcamp.id).await;
        Ok(review)
    }

    pub async fn update(&self, user: &User, id: Uuid, input: UpdateReview) -> Result<Review, ApiError> {
        let review = self.get(id).await?;
        ensure_owner(user, review.user_id, "update", Review::LABEL)?;

        let mut qb = sqlx::QueryBuilder::<Postgres>::new("UPDATE reviews SET ");
        let mut sets = qb.separated(", ");
        let mut changed = false;

        if let Some(title) = input.title {
            sets.push("title = ").push_bind_unseparated(title.trim().to_string());
            changed = true;
        }
        if let Some(text) = input.text {
            sets.push("text = ").push_bind_unseparated(text);
            changed = true;
        }
        if let Some(rating) = input.rating {
            sets.push("rating = ").push_bind_unseparated(rating);
            changed = true;
        }

        if !changed {
            return Ok(review);
        }

        qb.push(" WHERE id = ").push_bind(id);
        qb.push(" RETURNING ").push(Review::COLUMNS);
        let updated = qb.build_query_as::<Review>().fetch_one(&self.pool).await?;

        recompute_average_rating(&self.pool, updated.bootcamp_id).await;
        Ok(updated)
    }

    pub async fn delete(&self, user: &User, id: Uuid) -> Result<(), ApiError> {
        let review = self.get(id).await?;
        ensure_owner(user, review.user_id, "delete", Review::LABEL)?;

        Repository::<Review>::new(&self.pool).delete(id).await?;
        recompute_average_rating(&self.pool, review.bootcamp_id).await;
        Ok(())
    }
}

/// Refresh the bootcamp's `average_rating`, null once the last review is gone
pub async fn recompute_average_rating(pool: &PgPool, bootcamp_id: Uuid) {
    let result = sqlx::query(
        "UPDATE bootcamps SET average_rating = \
         (SELECT AVG(rating)::float8 FROM reviews WHERE bootcamp_id = $1) \
         WHERE id = $1",
    )
    .bind(bootcamp_id)
    .execute(pool)
    .await;

    if let Err(e) = result {
        tracing::error!("Failed to recompute average rating for bootcamp {}: {}", bootcamp_id, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rating_must_be_between_one_and_ten() {
        let input: CreateReview =
            serde_json::from_value(json!({ "title": "Great", "text": "Learned a lot", "rating": 11 })).unwrap();
        let err: ApiError = input.validate().unwrap_err().into();
        assert_eq!(err.to_json()["error"], json!(["Please add a rating between 1 and 10"]));

        let ok: CreateReview =
            serde_json::from_value(json!({ "title": "Great", "text": "Learned a lot", "rating": 10 })).unwrap();
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn update_allows_partial_payloads() {
        let input: UpdateReview = serde_json::from_value(json!({ "rating": 3 })).unwrap();
        assert!(input.validate().is_ok());
        assert!(input.title.is_none());
    }
}
