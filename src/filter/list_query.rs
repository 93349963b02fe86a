//! Query-string front end for list endpoints.
//!
//! `?averageCost[lte]=10000&careers[in]=Business&select=name,slug&sort=-name&page=2&limit=5`
//! becomes a `FilterData` plus the requested page window. Reserved keys never
//! reach the where clause.

use serde_json::{Map, Value};

use super::error::FilterError;
use super::filter::Filter;
use super::schema::ResourceSchema;
use super::types::FilterData;

const OPERATORS: [&str; 6] = ["eq", "gt", "gte", "lt", "lte", "in"];

#[derive(Debug, Clone)]
pub struct ListQuery {
    pub select: Option<Vec<String>>,
    pub sort: Option<String>,
    pub where_clause: Map<String, Value>,
    pub page: i64,
    pub limit: i64,
}

impl ListQuery {
    pub fn parse(raw: Option<&str>, default_limit: i64) -> Result<Self, FilterError> {
        let mut query = ListQuery {
            select: None,
            sort: None,
            where_clause: Map::new(),
            page: 1,
            limit: default_limit,
        };

        let Some(raw) = raw else { return Ok(query) };

        for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
            match key.as_ref() {
                "select" => {
                    query.select = Some(value.split(',').map(|s| s.trim().to_string()).collect())
                }
                "sort" => query.sort = Some(value.into_owned()),
                "page" => {
                    query.page = value
                        .parse::<i64>()
                        .ok()
                        .filter(|p| *p >= 1)
                        .ok_or_else(|| FilterError::InvalidPage(value.to_string()))?
                }
                "limit" => {
                    query.limit = value
                        .parse::<i64>()
                        .ok()
                        .filter(|l| *l >= 1)
                        .ok_or_else(|| FilterError::InvalidLimit(value.to_string()))?
                }
                _ => query.push_condition(&key, value.into_owned())?,
            }
        }

        query.offset()?;
        Ok(query)
    }

    fn push_condition(&mut self, key: &str, value: String) -> Result<(), FilterError> {
        let Some((field, rest)) = key.split_once('[') else {
            self.where_clause.insert(key.to_string(), Value::String(value));
            return Ok(());
        };

        let op = rest
            .strip_suffix(']')
            .filter(|op| OPERATORS.contains(op))
            .ok_or_else(|| FilterError::UnsupportedOperator(key.to_string()))?;

        let entry = self
            .where_clause
            .entry(field.to_string())
            .or_insert_with(|| Value::Object(Map::new()));

        // `field=x&field[gt]=y` keeps the last form seen
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        if let Value::Object(ops) = entry {
            ops.insert(format!("${}", op), Value::String(value));
        }
        Ok(())
    }

    /// Rows skipped before the current page; a window past `i64::MAX` is a bad page
    pub fn offset(&self) -> Result<i64, FilterError> {
        self.page
            .checked_sub(1)
            .and_then(|p| p.checked_mul(self.limit))
            .ok_or_else(|| FilterError::InvalidPage(self.page.to_string()))
    }

    pub fn to_filter_data(&self) -> Result<FilterData, FilterError> {
        Ok(FilterData {
            select: self.select.clone(),
            where_clause: Some(Value::Object(self.where_clause.clone())),
            order: Some(Value::String(
                self.sort.clone().unwrap_or_else(|| "-createdAt".to_string()),
            )),
            limit: Some(self.limit),
            offset: Some(self.offset()?),
        })
    }

    /// Build the validated filter for `schema`, applying the configured page cap
    pub fn into_filter(
        &mut self,
        schema: &'static ResourceSchema,
        max_limit: Option<i64>,
    ) -> Result<Filter, FilterError> {
        if let Some(max) = max_limit {
            self.limit = self.limit.min(max);
        }
        let mut filter = Filter::new(schema).with_max_limit(max_limit);
        filter.assign(self.to_filter_data()?)?;
        Ok(filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn splits_reserved_keys_from_conditions() {
        let q = ListQuery::parse(
            Some("averageCost[lte]=10000&housing=true&select=name,description&sort=-name&page=2&limit=5"),
            25,
        )
        .unwrap();

        assert_eq!(q.select, Some(vec!["name".to_string(), "description".to_string()]));
        assert_eq!(q.sort.as_deref(), Some("-name"));
        assert_eq!((q.page, q.limit, q.offset().unwrap()), (2, 5, 5));
        assert_eq!(
            Value::Object(q.where_clause),
            json!({ "averageCost": { "$lte": "10000" }, "housing": "true" })
        );
    }

    #[test]
    fn defaults_apply_without_query() {
        let q = ListQuery::parse(None, 25).unwrap();
        assert_eq!((q.page, q.limit), (1, 25));
        assert_eq!(q.to_filter_data().unwrap().order, Some(json!("-createdAt")));
    }

    #[test]
    fn merges_operators_on_one_field() {
        let q = ListQuery::parse(Some("tuition[gte]=1000&tuition[lt]=9000"), 25).unwrap();
        assert_eq!(
            q.where_clause["tuition"],
            json!({ "$gte": "1000", "$lt": "9000" })
        );
    }

    #[test]
    fn rejects_bad_paging_and_operators() {
        assert!(matches!(ListQuery::parse(Some("page=0"), 25), Err(FilterError::InvalidPage(_))));
        assert!(matches!(ListQuery::parse(Some("limit=abc"), 25), Err(FilterError::InvalidLimit(_))));
        assert!(matches!(
            ListQuery::parse(Some("name[regex]=x"), 25),
            Err(FilterError::UnsupportedOperator(_))
        ));
    }

    #[test]
    fn rejects_page_windows_past_the_offset_range() {
        assert!(matches!(
            ListQuery::parse(Some("page=9223372036854775807"), 25),
            Err(FilterError::InvalidPage(_))
        ));

        // a capped limit can only shrink the offset
        let mut q = ListQuery::parse(Some("page=3&limit=1000"), 25).unwrap();
        let filter = q.into_filter(&crate::database::models::BOOTCAMP_SCHEMA, Some(100));
        assert!(filter.is_ok());
        assert_eq!(q.offset().unwrap(), 200);
    }
}
