use sqlx::{self, postgres::PgRow, FromRow, PgPool};
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{
    Bootcamp, Course, Review, User, BOOTCAMP_SCHEMA, COURSE_SCHEMA, REVIEW_SCHEMA, USER_SCHEMA,
};
use crate::filter::ResourceSchema;

/// A table-backed record type the generic repository can load
pub trait Resource: for<'r> FromRow<'r, PgRow> + Send + Unpin {
    /// Lowercase name used in client messages
    const LABEL: &'static str;
    const COLUMNS: &'static str;

    fn schema() -> &'static ResourceSchema;

    fn owner_id(&self) -> Uuid;
}

impl Resource for Bootcamp {
    const LABEL: &'static str = "bootcamp";
    const COLUMNS: &'static str = "id, name, slug, description, website, phone, email, location, \
         careers, average_rating, average_cost, photo, housing, job_assistance, job_guarantee, \
         accept_gi, user_id, created_at";

    fn schema() -> &'static ResourceSchema {
        &BOOTCAMP_SCHEMA
    }

    fn owner_id(&self) -> Uuid {
        self.user_id
    }
}

impl Resource for Course {
    const LABEL: &'static str = "course";
    const COLUMNS: &'static str = "id, title, description, weeks, tuition, minimum_skill, \
         scholarship_available, bootcamp_id, user_id, created_at";

    fn schema() -> &'static ResourceSchema {
        &COURSE_SCHEMA
    }

    fn owner_id(&self) -> Uuid {
        self.user_id
    }
}

impl Resource for Review {
    const LABEL: &'static str = "review";
    const COLUMNS: &'static str = "id, title, text, rating, bootcamp_id, user_id, created_at";

    fn schema() -> &'static ResourceSchema {
        &REVIEW_SCHEMA
    }

    fn owner_id(&self) -> Uuid {
        self.user_id
    }
}

impl Resource for User {
    const LABEL: &'static str = "user";
    const COLUMNS: &'static str =
        "id, name, email, role, password, reset_password_token, reset_password_expire, created_at";

    fn schema() -> &'static ResourceSchema {
        &USER_SCHEMA
    }

    fn owner_id(&self) -> Uuid {
        self.id
    }
}

pub struct Repository<T> {
    pool: PgPool,
    _phantom: std::marker::PhantomData<T>,
}

impl<T: Resource> Repository<T> {
    pub fn new(pool: &PgPool) -> Self {
        Self {
            pool: pool.clone(),
            _phantom: std::marker::PhantomData,
        }
    }

    fn table() -> &'static str {
        T::schema().table
    }

    pub async fn select_optional(&self, id: Uuid) -> Result<Option<T>, DatabaseError> {
        let query = format!("SELECT {} FROM \"{}\" WHERE id = $1", T::COLUMNS, Self::table());
        let row = sqlx::query_as::<_, T>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn select_404(&self, id: Uuid) -> Result<T, DatabaseError> {
        self.select_optional(id).await?.ok_or_else(|| {
            DatabaseError::NotFound(format!("No {} found with the id of {}", T::LABEL, id))
        })
    }

    /// Children of a parent record, newest first
    pub async fn select_by_parent(&self, column: &'static str, parent: Uuid) -> Result<Vec<T>, DatabaseError> {
        let query = format!(
            "SELECT {} FROM \"{}\" WHERE \"{}\" = $1 ORDER BY created_at DESC, id",
            T::COLUMNS,
            Self::table(),
            column
        );
        let rows = sqlx::query_as::<_, T>(&query)
            .bind(parent)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn select_by_parents(&self, column: &'static str, parents: &[Uuid]) -> Result<Vec<T>, DatabaseError> {
        if parents.is_empty() {
            return Ok(vec![]);
        }
        let query = format!(
            "SELECT {} FROM \"{}\" WHERE \"{}\" = ANY($1) ORDER BY created_at, id",
            T::COLUMNS,
            Self::table(),
            column
        );
        let rows = sqlx::query_as::<_, T>(&query)
            .bind(parents)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn delete(&self, id: Uuid) -> Result<u64, DatabaseError> {
        let query = format!("DELETE FROM \"{}\" WHERE id = $1", Self::table());
        let result = sqlx::query(&query).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}
