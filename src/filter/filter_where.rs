use chrono::{DateTime, NaiveDate};
use serde_json::{Number, Value};

use super::error::FilterError;
use super::schema::{FieldKind, FieldRef, ResourceSchema};
use super::types::{FilterOp, FilterWhereInfo};

pub struct FilterWhere {
    schema: &'static ResourceSchema,
    param_values: Vec<Value>,
    param_index: usize,
    conditions: Vec<FilterWhereInfo>,
}

impl FilterWhere {
    pub fn new(schema: &'static ResourceSchema, starting_param_index: usize) -> Self {
        Self {
            schema,
            param_values: vec![],
            param_index: starting_param_index,
            conditions: vec![],
        }
    }

    pub fn generate(
        schema: &'static ResourceSchema,
        where_data: &Value,
        starting_param_index: usize,
    ) -> Result<(String, Vec<Value>), FilterError> {
        let mut filter_where = Self::new(schema, starting_param_index);
        filter_where.build(where_data)
    }

    pub fn validate(where_data: &Value) -> Result<(), FilterError> {
        match where_data {
            Value::Null | Value::Object(_) => Ok(()),
            _ => Err(FilterError::InvalidWhereClause("filter must be an object".to_string())),
        }
    }

    fn build(&mut self, where_data: &Value) -> Result<(String, Vec<Value>), FilterError> {
        self.parse_where_data(where_data)?;

        let mut sql_conditions = vec![];
        let conditions = std::mem::take(&mut self.conditions);
        for condition in &conditions {
            sql_conditions.push(self.build_sql_condition(condition)?);
        }
        let where_clause = if sql_conditions.is_empty() {
            "1=1".to_string()
        } else {
            sql_conditions.join(" AND ")
        };
        Ok((where_clause, std::mem::take(&mut self.param_values)))
    }

    fn parse_where_data(&mut self, where_data: &Value) -> Result<(), FilterError> {
        match where_data {
            Value::Null => Ok(()),
            Value::Object(obj) => {
                for (key, value) in obj {
                    self.parse_field_condition(key, value)?;
                }
                Ok(())
            }
            _ => Err(FilterError::InvalidWhereClause("filter must be an object".to_string())),
        }
    }

    fn parse_field_condition(&mut self, field: &str, value: &Value) -> Result<(), FilterError> {
        let field = self.schema.resolve(field)?;

        match value {
            Value::Object(obj) if obj.keys().all(|k| k.starts_with('$')) && !obj.is_empty() => {
                for (op_key, op_val) in obj {
                    let operator = Self::map_operator(op_key)?;
                    self.conditions.push(FilterWhereInfo {
                        field: field.clone(),
                        operator,
                        data: op_val.clone(),
                    });
                }
            }
            // Implicit equality: { field: value }
            _ => self.conditions.push(FilterWhereInfo {
                field,
                operator: FilterOp::Eq,
                data: value.clone(),
            }),
        }
        Ok(())
    }

    fn map_operator(op_key: &str) -> Result<FilterOp, FilterError> {
        Ok(match op_key {
            "$eq" => FilterOp::Eq,
            "$gt" => FilterOp::Gt,
            "$gte" => FilterOp::Gte,
            "$lt" => FilterOp::Lt,
            "$lte" => FilterOp::Lte,
            "$in" => FilterOp::In,
            other => return Err(FilterError::UnsupportedOperator(other.to_string())),
        })
    }

    fn build_sql_condition(&mut self, condition: &FilterWhereInfo) -> Result<String, FilterError> {
        let field = &condition.field;
        let column = field.sql_expr();
        let kind = field.value_kind();

        if kind == FieldKind::Document {
            return Err(FilterError::InvalidWhereClause(format!(
                "{} can only be filtered by sub-field, e.g. {}.city",
                field.spec.name, field.spec.name
            )));
        }

        match condition.operator {
            FilterOp::Eq if condition.data.is_null() => Ok(format!("{} IS NULL", column)),
            FilterOp::Eq if kind == FieldKind::TextArray => {
                let p = self.param(field, &condition.data)?;
                Ok(format!("{} && ARRAY[{}]", column, p))
            }
            FilterOp::Eq => {
                let p = self.param(field, &condition.data)?;
                Ok(format!("{} = {}", column, p))
            }
            FilterOp::In => {
                let values = match &condition.data {
                    Value::Array(values) => values.clone(),
                    Value::String(s) => s.split(',').map(|v| Value::String(v.trim().to_string())).collect(),
                    other => vec![other.clone()],
                };
                if values.is_empty() {
                    return Ok("1=0".to_string());
                }
                let params = values
                    .iter()
                    .map(|v| self.param(field, v))
                    .collect::<Result<Vec<_>, _>>()?;
                if kind == FieldKind::TextArray {
                    Ok(format!("{} && ARRAY[{}]", column, params.join(", ")))
                } else {
                    Ok(format!("{} IN ({})", column, params.join(", ")))
                }
            }
            FilterOp::Gt | FilterOp::Gte | FilterOp::Lt | FilterOp::Lte => {
                if matches!(kind, FieldKind::TextArray | FieldKind::Bool) {
                    return Err(FilterError::UnsupportedOperator(format!(
                        "{:?} on {}",
                        condition.operator, field.spec.name
                    )));
                }
                let p = self.param(field, &condition.data)?;
                Ok(format!("{} {} {}", column, condition.operator.sql(), p))
            }
        }
    }

    fn param(&mut self, field: &FieldRef, value: &Value) -> Result<String, FilterError> {
        let kind = field.value_kind();
        self.param_values.push(Self::coerce(field, kind, value)?);
        self.param_index += 1;
        Ok(format!("${}::{}", self.param_index, kind.cast()))
    }

    /// Query strings carry text; convert to the bound type of the column
    fn coerce(field: &FieldRef, kind: FieldKind, value: &Value) -> Result<Value, FilterError> {
        let invalid = || FilterError::InvalidValue {
            field: field.spec.name.to_string(),
            value: match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            },
        };

        match (kind, value) {
            (FieldKind::Number, Value::Number(_)) => Ok(value.clone()),
            (FieldKind::Number, Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(invalid),
            (FieldKind::Bool, Value::Bool(_)) => Ok(value.clone()),
            (FieldKind::Bool, Value::String(s)) => match s.as_str() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                _ => Err(invalid()),
            },
            (FieldKind::Uuid, Value::String(s)) => uuid::Uuid::parse_str(s)
                .map(|id| Value::String(id.to_string()))
                .map_err(|_| invalid()),
            (FieldKind::Timestamp, Value::String(s)) => {
                let parsed = DateTime::parse_from_rfc3339(s).is_ok()
                    || NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok();
                if parsed {
                    Ok(value.clone())
                } else {
                    Err(invalid())
                }
            }
            (FieldKind::Text | FieldKind::TextArray, Value::String(_)) => Ok(value.clone()),
            (FieldKind::Text | FieldKind::TextArray, Value::Number(n)) => Ok(Value::String(n.to_string())),
            (FieldKind::Text | FieldKind::TextArray, Value::Bool(b)) => Ok(Value::String(b.to_string())),
            _ => Err(invalid()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::schema::FieldSpec;
    use serde_json::json;

    static CAMPS: ResourceSchema = ResourceSchema {
        table: "bootcamps",
        fields: &[
            FieldSpec::new("id", "id", FieldKind::Uuid),
            FieldSpec::new("name", "name", FieldKind::Text),
            FieldSpec::new("averageCost", "average_cost", FieldKind::Number),
            FieldSpec::new("housing", "housing", FieldKind::Bool),
            FieldSpec::new("careers", "careers", FieldKind::TextArray),
            FieldSpec::new("location", "location", FieldKind::Document),
        ],
    };

    #[test]
    fn comparison_operators_bind_typed_params() {
        let (sql, params) =
            FilterWhere::generate(&CAMPS, &json!({ "averageCost": { "$lte": "10000" } }), 0).unwrap();
        assert_eq!(sql, "\"average_cost\" <= $1::double precision");
        assert_eq!(params, vec![json!(10000.0)]);
    }

    #[test]
    fn equality_on_array_column_means_contains() {
        let (sql, params) =
            FilterWhere::generate(&CAMPS, &json!({ "careers": "Business" }), 0).unwrap();
        assert_eq!(sql, "\"careers\" && ARRAY[$1::text]");
        assert_eq!(params, vec![json!("Business")]);
    }

    #[test]
    fn in_operator_expands_comma_lists() {
        let (sql, params) = FilterWhere::generate(
            &CAMPS,
            &json!({ "careers": { "$in": "Business,UI/UX" }, "housing": "true" }),
            0,
        )
        .unwrap();
        assert_eq!(
            sql,
            "\"careers\" && ARRAY[$1::text, $2::text] AND \"housing\" = $3::boolean"
        );
        assert_eq!(params, vec![json!("Business"), json!("UI/UX"), json!(true)]);
    }

    #[test]
    fn document_subfields_compare_as_text() {
        let (sql, _) =
            FilterWhere::generate(&CAMPS, &json!({ "location.state": "MA" }), 0).unwrap();
        assert_eq!(sql, "(\"location\"->>'state') = $1::text");
    }

    #[test]
    fn empty_filter_matches_everything() {
        let (sql, params) = FilterWhere::generate(&CAMPS, &json!({}), 0).unwrap();
        assert_eq!(sql, "1=1");
        assert!(params.is_empty());
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(
            FilterWhere::generate(&CAMPS, &json!({ "password": "x" }), 0),
            Err(FilterError::InvalidColumn(_))
        ));
        assert!(matches!(
            FilterWhere::generate(&CAMPS, &json!({ "averageCost": { "$gt": "cheap" } }), 0),
            Err(FilterError::InvalidValue { .. })
        ));
        assert!(matches!(
            FilterWhere::generate(&CAMPS, &json!({ "name": { "$regex": "x" } }), 0),
            Err(FilterError::UnsupportedOperator(_))
        ));
        assert!(FilterWhere::generate(&CAMPS, &json!({ "id": "not-a-uuid" }), 0).is_err());
    }
}
