use serde_json::Value;

use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::FilterWhere;
use super::schema::{FieldSpec, ResourceSchema};
use super::types::{FilterData, FilterOrderInfo, SqlResult};

pub struct Filter {
    schema: &'static ResourceSchema,
    select_columns: Vec<&'static FieldSpec>,
    where_data: Option<Value>,
    order_data: Vec<FilterOrderInfo>,
    limit: Option<i64>,
    offset: Option<i64>,
    max_limit: Option<i64>,
}

impl Filter {
    pub fn new(schema: &'static ResourceSchema) -> Self {
        Self {
            schema,
            select_columns: vec![],
            where_data: None,
            order_data: vec![],
            limit: None,
            offset: None,
            max_limit: None,
        }
    }

    /// Cap applied to every subsequent `limit` call
    pub fn with_max_limit(mut self, max_limit: Option<i64>) -> Self {
        self.max_limit = max_limit;
        self
    }

    pub fn assign(&mut self, data: FilterData) -> Result<&mut Self, FilterError> {
        if let Some(select) = data.select { self.select(select)?; }
        if let Some(where_clause) = data.where_clause { self.where_clause(where_clause)?; }
        if let Some(order) = data.order { self.order(order)?; }
        if let Some(limit) = data.limit { self.limit(limit, data.offset)?; }
        Ok(self)
    }

    /// Restrict output to the named fields; `id` is always kept
    pub fn select(&mut self, fields: Vec<String>) -> Result<&mut Self, FilterError> {
        let mut columns = Vec::with_capacity(fields.len() + 1);
        if let Some(id) = self.schema.field("id") {
            columns.push(id);
        }
        for name in fields {
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            let spec = self
                .schema
                .field(name)
                .ok_or_else(|| FilterError::InvalidColumn(name.to_string()))?;
            if !columns.iter().any(|c| std::ptr::eq(*c, spec)) {
                columns.push(spec);
            }
        }
        self.select_columns = columns;
        Ok(self)
    }

    pub fn where_clause(&mut self, conditions: Value) -> Result<&mut Self, FilterError> {
        FilterWhere::validate(&conditions)?;
        // Resolve eagerly so unknown fields fail before any SQL is built
        FilterWhere::generate(self.schema, &conditions, 0)?;
        self.where_data = Some(conditions);
        Ok(self)
    }

    pub fn order(&mut self, order_spec: Value) -> Result<&mut Self, FilterError> {
        self.order_data = FilterOrder::validate_and_parse(self.schema, &order_spec)?;
        Ok(self)
    }

    pub fn limit(&mut self, limit: i64, offset: Option<i64>) -> Result<&mut Self, FilterError> {
        if limit < 1 {
            return Err(FilterError::InvalidLimit("limit must be a positive integer".to_string()));
        }
        if offset.is_some_and(|off| off < 0) {
            return Err(FilterError::InvalidPage("page must be a positive integer".to_string()));
        }

        let applied_limit = match self.max_limit {
            Some(max) if limit > max => {
                tracing::debug!("Limit {} exceeds max {}, capping to max", limit, max);
                max
            }
            _ => limit,
        };

        self.limit = Some(applied_limit);
        self.offset = offset;
        Ok(self)
    }

    pub fn applied_limit(&self) -> Option<i64> {
        self.limit
    }

    pub fn to_sql(&self) -> Result<SqlResult, FilterError> {
        let select_clause = self.build_select_clause();
        let where_result = self.to_where_sql()?;
        let order_clause = FilterOrder::generate(&self.order_data);
        let limit_clause = self.build_limit_clause();

        let query = [
            format!("SELECT {}", select_clause),
            format!("FROM \"{}\"", self.schema.table),
            format!("WHERE {}", where_result.query),
            order_clause,
            limit_clause,
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

        Ok(SqlResult { query, params: where_result.params })
    }

    /// Same as `to_sql`, with each row folded into a single JSON object column `row`
    pub fn to_json_sql(&self) -> Result<SqlResult, FilterError> {
        let inner = self.to_sql()?;
        Ok(SqlResult {
            query: format!("SELECT row_to_json(t) AS row FROM ({}) t", inner.query),
            params: inner.params,
        })
    }

    pub fn to_where_sql(&self) -> Result<SqlResult, FilterError> {
        let (query, params) = match self.where_data {
            Some(ref where_data) => FilterWhere::generate(self.schema, where_data, 0)?,
            None => ("1=1".to_string(), vec![]),
        };
        Ok(SqlResult { query, params })
    }

    pub fn to_count_sql(&self) -> Result<SqlResult, FilterError> {
        let where_result = self.to_where_sql()?;
        let query = format!(
            "SELECT COUNT(*) as count FROM \"{}\" WHERE {}",
            self.schema.table, where_result.query
        );
        Ok(SqlResult { query, params: where_result.params })
    }

    fn build_select_clause(&self) -> String {
        if self.select_columns.is_empty() {
            self.schema.default_columns()
        } else {
            self.select_columns
                .iter()
                .map(|c| c.quoted())
                .collect::<Vec<_>>()
                .join(", ")
        }
    }

    fn build_limit_clause(&self) -> String {
        match (self.limit, self.offset) {
            (Some(l), Some(o)) => format!("LIMIT {} OFFSET {}", l, o),
            (Some(l), None) => format!("LIMIT {}", l),
            _ => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::schema::FieldKind;
    use serde_json::json;

    static REVIEWS: ResourceSchema = ResourceSchema {
        table: "reviews",
        fields: &[
            FieldSpec::new("id", "id", FieldKind::Uuid),
            FieldSpec::new("title", "title", FieldKind::Text),
            FieldSpec::new("rating", "rating", FieldKind::Number),
            FieldSpec::new("createdAt", "created_at", FieldKind::Timestamp),
        ],
    };

    #[test]
    fn builds_full_select() {
        let mut filter = Filter::new(&REVIEWS);
        filter
            .assign(FilterData {
                select: Some(vec!["title".into(), "rating".into()]),
                where_clause: Some(json!({ "rating": { "$gte": "8" } })),
                order: Some(json!("-createdAt")),
                limit: Some(10),
                offset: Some(20),
            })
            .unwrap();

        let sql = filter.to_sql().unwrap();
        assert_eq!(
            sql.query,
            "SELECT \"id\", \"title\", \"rating\" FROM \"reviews\" \
             WHERE \"rating\" >= $1::double precision \
             ORDER BY \"created_at\" DESC, \"id\" ASC LIMIT 10 OFFSET 20"
        );
        assert_eq!(sql.params, vec![json!(8.0)]);
    }

    #[test]
    fn count_ignores_paging() {
        let mut filter = Filter::new(&REVIEWS);
        filter.where_clause(json!({ "title": "Great" })).unwrap();
        filter.limit(5, Some(5)).unwrap();

        let sql = filter.to_count_sql().unwrap();
        assert_eq!(
            sql.query,
            "SELECT COUNT(*) as count FROM \"reviews\" WHERE \"title\" = $1::text"
        );
    }

    #[test]
    fn limit_is_capped() {
        let mut filter = Filter::new(&REVIEWS).with_max_limit(Some(100));
        filter.limit(5000, None).unwrap();
        assert_eq!(filter.applied_limit(), Some(100));
        assert!(filter.limit(0, None).is_err());
    }

    #[test]
    fn json_projection_wraps_inner_query() {
        let filter = Filter::new(&REVIEWS);
        let sql = filter.to_json_sql().unwrap();
        assert!(sql.query.starts_with("SELECT row_to_json(t) AS row FROM (SELECT \"id\", \"title\""));
        assert!(sql.query.ends_with(") t"));
    }
}
