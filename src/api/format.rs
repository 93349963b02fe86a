use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use uuid::Uuid;

use crate::filter::ResourceSchema;

/// Rename a `row_to_json` object from column names to public field names
pub fn row_to_api_value(schema: &'static ResourceSchema, row: Value) -> Value {
    let Value::Object(columns) = row else { return row };

    let mut obj = Map::with_capacity(columns.len());
    for (column, value) in columns {
        let key = schema
            .field_by_column(&column)
            .map(|f| f.name.to_string())
            .unwrap_or(column);
        obj.insert(key, value);
    }
    Value::Object(obj)
}

pub fn value_id(value: &Value, key: &str) -> Option<Uuid> {
    value.get(key)?.as_str()?.parse().ok()
}

/// Attach each parent's children under `key`, grouped by `parent_of`
pub fn populate_children<C: Serialize>(
    rows: &mut [Value],
    key: &str,
    children: Vec<C>,
    parent_of: impl Fn(&C) -> Uuid,
) {
    let mut grouped: HashMap<Uuid, Vec<Value>> = HashMap::new();
    for child in children {
        let parent = parent_of(&child);
        match serde_json::to_value(&child) {
            Ok(value) => grouped.entry(parent).or_default().push(value),
            Err(e) => tracing::error!("Failed to serialize populated record: {}", e),
        }
    }

    for row in rows.iter_mut() {
        let Some(id) = value_id(row, "id") else { continue };
        let children = grouped.remove(&id).unwrap_or_default();
        if let Value::Object(obj) = row {
            obj.insert(key.to_string(), Value::Array(children));
        }
    }
}

/// Replace the reference stored under `key` with the referenced record
pub fn populate_reference<P: Serialize>(rows: &mut [Value], key: &str, parents: &HashMap<Uuid, P>) {
    for row in rows.iter_mut() {
        let Some(parent_id) = value_id(row, key) else { continue };
        let Some(parent) = parents.get(&parent_id) else { continue };
        if let (Value::Object(obj), Ok(value)) = (row, serde_json::to_value(parent)) {
            obj.insert(key.to_string(), value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{FieldKind, FieldSpec};
    use serde_json::json;

    static COURSES: ResourceSchema = ResourceSchema {
        table: "courses",
        fields: &[
            FieldSpec::new("id", "id", FieldKind::Uuid),
            FieldSpec::new("scholarshipAvailable", "scholarship_available", FieldKind::Bool),
            FieldSpec::new("bootcamp", "bootcamp_id", FieldKind::Uuid),
        ],
    };

    #[derive(Serialize)]
    struct Summary {
        name: &'static str,
    }

    #[test]
    fn renames_columns_to_field_names() {
        let row = json!({ "id": "x", "scholarship_available": true, "bootcamp_id": "y" });
        assert_eq!(
            row_to_api_value(&COURSES, row),
            json!({ "id": "x", "scholarshipAvailable": true, "bootcamp": "y" })
        );
    }

    #[test]
    fn populates_references_and_children() {
        let camp = Uuid::new_v4();
        let mut rows = vec![json!({ "id": Uuid::new_v4(), "bootcamp": camp })];

        let parents = HashMap::from([(camp, Summary { name: "Devworks" })]);
        populate_reference(&mut rows, "bootcamp", &parents);
        assert_eq!(rows[0]["bootcamp"], json!({ "name": "Devworks" }));

        let mut camps = vec![json!({ "id": camp }), json!({ "id": Uuid::new_v4() })];
        populate_children(&mut camps, "courses", vec![(camp, "Front End")], |c| c.0);
        assert_eq!(camps[0]["courses"], json!([[camp, "Front End"]]));
        assert_eq!(camps[1]["courses"], json!([]));
    }
}
