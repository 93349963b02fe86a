use serde::Deserialize;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;
use validator::Validate;

use crate::database::models::{rounded_average_cost, Bootcamp, Course, MinimumSkill, User};
use crate::database::{Repository, Resource};
use crate::error::ApiError;
use crate::services::{ensure_owner, required};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCourse {
    #[validate(required(message = "Please add a course title"))]
    pub title: Option<String>,
    #[validate(
        required(message = "Please add a description"),
        length(max = 300, message = "Description can not be more than 300 characters")
    )]
    pub description: Option<String>,
    #[validate(required(message = "Please add number of weeks"))]
    pub weeks: Option<String>,
    #[validate(
        required(message = "Please add a tuition cost"),
        range(min = 0.0, message = "Tuition can not be negative")
    )]
    pub tuition: Option<f64>,
    #[serde(default)]
    pub minimum_skill: MinimumSkill,
    #[serde(default)]
    pub scholarship_available: bool,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCourse {
    #[validate(length(min = 1, message = "Please add a course title"))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 300, message = "Description can not be more than 300 characters"))]
    pub description: Option<String>,
    #[validate(length(min = 1, message = "Please add number of weeks"))]
    pub weeks: Option<String>,
    #[validate(range(min = 0.0, message = "Tuition can not be negative"))]
    pub tuition: Option<f64>,
    pub minimum_skill: Option<MinimumSkill>,
    pub scholarship_available: Option<bool>,
}

pub struct CourseService {
    pool: PgPool,
}

impl CourseService {
    pub fn new(pool: &PgPool) -> Self {
        Self { pool: pool.clone() }
    }

    pub async fn list_for_bootcamp(&self, bootcamp_id: Uuid) -> Result<Vec<Course>, ApiError> {
        Ok(Repository::<Course>::new(&self.pool)
            .select_by_parent("bootcamp_id", bootcamp_id)
            .await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<Course, ApiError> {
        Ok(Repository::<Course>::new(&self.pool).select_404(id).await?)
    }

    pub async fn create(&self, user: &User, bootcamp_id: Uuid, input: CreateCourse) -> Result<Course, ApiError> {
        let bootcamp = Repository::<Bootcamp>::new(&self.pool).select_404(bootcamp_id).await?;
        if bootcamp.user_id != user.id && !user.is_admin() {
            return Err(ApiError::forbidden(format!(
                "User {} is not authorized to add a course to bootcamp {}",
                user.id, bootcamp.id
            )));
        }

        let title = required(input.title, "Please add a course title")?;
        let description = required(input.description, "Please add a description")?;
        let weeks = required(input.weeks, "Please add number of weeks")?;
        let tuition = required(input.tuition, "Please add a tuition cost")?;

        let query = format!(
            "INSERT INTO courses (id, title, description, weeks, tuition, minimum_skill, \
             scholarship_available, bootcamp_id, user_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {}",
            Course::COLUMNS
        );
        let course = sqlx::query_as::<_, Course>(&query)
            .bind(Uuid::new_v4())
            .bind(title.trim())
            .bind(description)
            .bind(weeks)
            .bind(tuition)
            .bind(input.minimum_skill.as_str())
            .bind(input.scholarship_available)
            .bind(bootcamp.id)
            .bind(user.id)
            .fetch_one(&self.pool)
            .await?;

        recompute_average_cost(&self.pool, bootcamp.id).await;
        Ok(course)
    }

    pub async fn update(&self, user: &User, id: Uuid, input: UpdateCourse) -> Result<Course, ApiError> {
        let course = self.get(id).await?;
        ensure_owner(user, course.user_id, "update", Course::LABEL)?;

        let mut qb = sqlx::QueryBuilder::<Postgres>::new("UPDATE courses SET ");
        let mut sets = qb.separated(", ");
        let mut changed = false;

        if let Some(title) = input.title {
            sets.push("title = ").push_bind_unseparated(title.trim().to_string());
            changed = true;
        }
        if let Some(description) = input.description {
            sets.push("description = ").push_bind_unseparated(description);
            changed = true;
        }
        if let Some(weeks) = input.weeks {
            sets.push("weeks = ").push_bind_unseparated(weeks);
            changed = true;
        }
        if let Some(tuition) = input.tuition {
            sets.push("tuition = ").push_bind_unseparated(tuition);
            changed = true;
        }
        if let Some(skill) = input.minimum_skill {
            sets.push("minimum_skill = ").push_bind_unseparated(skill.as_str());
            changed = true;
        }
        if let Some(scholarship) = input.scholarship_available {
            sets.push("scholarship_available = ").push_bind_unseparated(scholarship);
            changed = true;
        }

        if !changed {
            return Ok(course);
        }

        qb.push(" WHERE id = ").push_bind(id);
        qb.push(" RETURNING ").push(Course::COLUMNS);
        let updated = qb.build_query_as::<Course>().fetch_one(&self.pool).await?;

        recompute_average_cost(&self.pool, updated.bootcamp_id).await;
        Ok(updated)
    }

    pub async fn delete(&self, user: &User, id: Uuid) -> Result<(), ApiError> {
        let course = self.get(id).await?;
        ensure_owner(user, course.user_id, "delete", Course::LABEL)?;

        Repository::<Course>::new(&self.pool).delete(id).await?;
        recompute_average_cost(&self.pool, course.bootcamp_id).await;
        Ok(())
    }
}

/// Refresh the bootcamp's `average_cost`. Failures are logged, never returned.
pub async fn recompute_average_cost(pool: &PgPool, bootcamp_id: Uuid) {
    let result = async {
        let average: Option<f64> =
            sqlx::query_scalar("SELECT AVG(tuition)::float8 FROM courses WHERE bootcamp_id = $1")
                .bind(bootcamp_id)
                .fetch_one(pool)
                .await?;

        sqlx::query("UPDATE bootcamps SET average_cost = $1 WHERE id = $2")
            .bind(rounded_average_cost(average))
            .bind(bootcamp_id)
            .execute(pool)
            .await?;
        Ok::<_, sqlx::Error>(())
    }
    .await;

    if let Err(e) = result {
        tracing::error!("Failed to recompute average cost for bootcamp {}: {}", bootcamp_id, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_defaults_skill_and_scholarship() {
        let input: CreateCourse = serde_json::from_value(json!({
            "title": "Front End Web Development",
            "description": "HTML, CSS and JavaScript",
            "weeks": "8",
            "tuition": 8000
        }))
        .unwrap();

        assert!(input.validate().is_ok());
        assert_eq!(input.minimum_skill, MinimumSkill::Beginner);
        assert!(!input.scholarship_available);
    }

    #[test]
    fn rejects_negative_tuition_and_unknown_skill() {
        let input: CreateCourse = serde_json::from_value(json!({
            "title": "t", "description": "d", "weeks": "4", "tuition": -1
        }))
        .unwrap();
        let err: ApiError = input.validate().unwrap_err().into();
        assert_eq!(err.to_json()["error"], json!(["Tuition can not be negative"]));

        let skill = serde_json::from_value::<UpdateCourse>(json!({ "minimumSkill": "expert" }));
        assert!(skill.is_err());
    }
}
