//! Shared list endpoint: filter, select, sort, paginate and populate.

use serde_json::Value;
use std::collections::HashSet;
use uuid::Uuid;

use crate::api::format::{populate_children, populate_reference, row_to_api_value, value_id};
use crate::database::models::Course;
use crate::database::{QueryBuilder, Repository};
use crate::error::ApiError;
use crate::filter::{ListQuery, ResourceSchema};
use crate::middleware::{ApiResponse, Pagination};
use crate::server::AppState;
use crate::services::bootcamp_service;

/// Related records embedded into each listed row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Populate {
    Nothing,
    /// Bootcamps gain a `courses` array
    Courses,
    /// `bootcamp` id becomes `{ id, name, description }`
    Bootcamp,
}

pub async fn advanced_results(
    state: &AppState,
    schema: &'static ResourceSchema,
    populate: Populate,
    raw_query: Option<&str>,
) -> Result<ApiResponse<Vec<Value>>, ApiError> {
    let mut query = ListQuery::parse(raw_query, state.config.filter.default_limit)?;
    let filter = query.into_filter(schema, state.config.filter.max_limit)?;

    if state.config.filter.debug_logging {
        if let Ok(sql) = filter.to_sql() {
            tracing::debug!("{} list: {} {:?}", schema.table, sql.query, sql.params);
        }
    }

    let builder = QueryBuilder::new(&filter);
    let total = builder.count(&state.pool).await?;
    let mut rows: Vec<Value> = builder
        .select_json(&state.pool)
        .await?
        .into_iter()
        .map(|row| row_to_api_value(schema, row))
        .collect();

    match populate {
        Populate::Nothing => {}
        Populate::Courses => {
            let ids: Vec<Uuid> = rows.iter().filter_map(|r| value_id(r, "id")).collect();
            let courses = Repository::<Course>::new(&state.pool)
                .select_by_parents("bootcamp_id", &ids)
                .await?;
            populate_children(&mut rows, "courses", courses, |c| c.bootcamp_id);
        }
        Populate::Bootcamp => {
            let ids: HashSet<Uuid> = rows.iter().filter_map(|r| value_id(r, "bootcamp")).collect();
            let ids: Vec<Uuid> = ids.into_iter().collect();
            let summaries = bootcamp_service::summaries(&state.pool, &ids).await?;
            populate_reference(&mut rows, "bootcamp", &summaries);
        }
    }

    let pagination = Pagination::new(query.page, query.limit, total);
    let count = rows.len();
    Ok(ApiResponse::success(rows)
        .with_count(count)
        .with_pagination(pagination))
}
