use serde_json::Value;
use sqlx::{self, postgres::PgArguments, PgPool, Row};

use crate::database::manager::DatabaseError;
use crate::filter::types::SqlResult;
use crate::filter::Filter;

/// Executes a prepared `Filter` against the pool
pub struct QueryBuilder<'f> {
    filter: &'f Filter,
}

impl<'f> QueryBuilder<'f> {
    pub fn new(filter: &'f Filter) -> Self {
        Self { filter }
    }

    /// Rows as JSON objects keyed by column name
    pub async fn select_json(&self, pool: &PgPool) -> Result<Vec<Value>, DatabaseError> {
        let sql_result = self.sql(Filter::to_json_sql)?;
        tracing::debug!("List query: {}", sql_result.query);

        let mut q = sqlx::query(&sql_result.query);
        for p in sql_result.params.iter() {
            q = bind_param_query(q, p);
        }
        let rows = q.fetch_all(pool).await?;
        rows.iter()
            .map(|row| row.try_get::<Value, _>("row").map_err(DatabaseError::from))
            .collect()
    }

    pub async fn count(&self, pool: &PgPool) -> Result<i64, DatabaseError> {
        let sql_result = self.sql(Filter::to_count_sql)?;

        let mut q = sqlx::query(&sql_result.query);
        for p in sql_result.params.iter() {
            q = bind_param_query(q, p);
        }
        let row = q.fetch_one(pool).await?;
        let count: i64 = row.try_get("count")?;
        Ok(count)
    }

    fn sql(
        &self,
        build: impl Fn(&Filter) -> Result<SqlResult, crate::filter::error::FilterError>,
    ) -> Result<SqlResult, DatabaseError> {
        build(self.filter).map_err(|e| DatabaseError::Query(e.to_string()))
    }
}

pub(crate) fn bind_param_query<'q>(
    q: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    v: &'q Value,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s.as_str()),
        // Arrays are expanded into one placeholder per element by the where builder
        Value::Array(_) | Value::Object(_) => q.bind(v.to_string()),
    }
}
