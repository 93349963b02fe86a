use serde_json::Value;

use super::error::FilterError;
use super::schema::ResourceSchema;
use super::types::{FilterOrderInfo, SortDirection};

pub struct FilterOrder;

impl FilterOrder {
    pub fn validate_and_parse(
        schema: &'static ResourceSchema,
        order: &Value,
    ) -> Result<Vec<FilterOrderInfo>, FilterError> {
        match order {
            Value::String(s) => Self::parse_order_string(schema, s),
            Value::Array(arr) => {
                // ["-createdAt", "name asc"]
                let mut out = Vec::new();
                for v in arr {
                    if let Value::String(s) = v {
                        out.extend(Self::parse_order_string(schema, s)?);
                    }
                }
                Ok(out)
            }
            Value::Null => Ok(vec![]),
            _ => Err(FilterError::InvalidWhereClause("sort must be a string".to_string())),
        }
    }

    /// Comma separated fields; a leading `-` or a trailing `desc` sorts descending
    fn parse_order_string(
        schema: &'static ResourceSchema,
        s: &str,
    ) -> Result<Vec<FilterOrderInfo>, FilterError> {
        let mut out = Vec::new();
        for part in s.split(',') {
            let trimmed = part.trim();
            if trimmed.is_empty() {
                continue;
            }
            let mut it = trimmed.split_whitespace();
            let Some(token) = it.next() else { continue };

            let (name, mut sort) = match token.strip_prefix('-') {
                Some(name) => (name, SortDirection::Desc),
                None => (token, SortDirection::Asc),
            };
            if let Some(dir) = it.next() {
                if dir.eq_ignore_ascii_case("desc") {
                    sort = SortDirection::Desc;
                }
            }

            let field = schema
                .field(name)
                .ok_or_else(|| FilterError::InvalidColumn(name.to_string()))?;
            out.push(FilterOrderInfo { column: field.column, sort });
        }
        Ok(out)
    }

    /// `id` is appended as a tie-breaker so pages never overlap
    pub fn generate(infos: &[FilterOrderInfo]) -> String {
        if infos.is_empty() {
            return String::new();
        }
        let mut parts: Vec<String> = infos
            .iter()
            .map(|i| format!("\"{}\" {}", i.column, i.sort.to_sql()))
            .collect();
        if !infos.iter().any(|i| i.column == "id") {
            parts.push("\"id\" ASC".to_string());
        }
        format!("ORDER BY {}", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::schema::{FieldKind, FieldSpec};
    use serde_json::json;

    static COURSES: ResourceSchema = ResourceSchema {
        table: "courses",
        fields: &[
            FieldSpec::new("id", "id", FieldKind::Uuid),
            FieldSpec::new("tuition", "tuition", FieldKind::Number),
            FieldSpec::new("createdAt", "created_at", FieldKind::Timestamp),
        ],
    };

    #[test]
    fn parses_prefix_and_suffix_directions() {
        let infos = FilterOrder::validate_and_parse(&COURSES, &json!("-tuition,createdAt")).unwrap();
        assert_eq!(
            FilterOrder::generate(&infos),
            "ORDER BY \"tuition\" DESC, \"created_at\" ASC, \"id\" ASC"
        );

        let infos = FilterOrder::validate_and_parse(&COURSES, &json!("createdAt desc")).unwrap();
        assert_eq!(infos[0].sort, SortDirection::Desc);
    }

    #[test]
    fn rejects_unknown_sort_field() {
        assert!(matches!(
            FilterOrder::validate_and_parse(&COURSES, &json!("password")),
            Err(FilterError::InvalidColumn(_))
        ));
    }
}
