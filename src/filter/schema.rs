//! Field catalogues for the filterable resources.
//!
//! Every list query resolves public (camelCase) field names through a
//! `ResourceSchema`, so only declared columns ever reach generated SQL and
//! credential columns are unreachable by construction.

use super::error::FilterError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number,
    Bool,
    Uuid,
    Timestamp,
    TextArray,
    /// JSONB column; sub-fields addressed as `field.key`
    Document,
}

impl FieldKind {
    /// Postgres cast applied to bound parameters compared against this kind
    pub fn cast(&self) -> &'static str {
        match self {
            FieldKind::Text | FieldKind::TextArray | FieldKind::Document => "text",
            FieldKind::Number => "double precision",
            FieldKind::Bool => "boolean",
            FieldKind::Uuid => "uuid",
            FieldKind::Timestamp => "timestamptz",
        }
    }
}

#[derive(Debug)]
pub struct FieldSpec {
    pub name: &'static str,
    pub column: &'static str,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub const fn new(name: &'static str, column: &'static str, kind: FieldKind) -> Self {
        Self { name, column, kind }
    }

    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.column)
    }
}

#[derive(Debug)]
pub struct ResourceSchema {
    pub table: &'static str,
    pub fields: &'static [FieldSpec],
}

/// A resolved reference to a column, or to a key inside a document column
#[derive(Debug, Clone)]
pub struct FieldRef {
    pub spec: &'static FieldSpec,
    pub path: Option<String>,
}

impl FieldRef {
    /// Kind of the value being compared
    pub fn value_kind(&self) -> FieldKind {
        match self.path {
            Some(_) => FieldKind::Text,
            None => self.spec.kind,
        }
    }

    pub fn sql_expr(&self) -> String {
        match &self.path {
            Some(key) => format!("({}->>'{}')", self.spec.quoted(), key),
            None => self.spec.quoted(),
        }
    }
}

impl ResourceSchema {
    pub fn field(&'static self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_by_column(&'static self, column: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| f.column == column)
    }

    /// Resolve `name` or `document.key` into a field reference
    pub fn resolve(&'static self, name: &str) -> Result<FieldRef, FilterError> {
        if let Some(spec) = self.field(name) {
            return Ok(FieldRef { spec, path: None });
        }

        if let Some((head, key)) = name.split_once('.') {
            let spec = self
                .field(head)
                .filter(|f| f.kind == FieldKind::Document)
                .ok_or_else(|| FilterError::InvalidColumn(name.to_string()))?;
            if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(FilterError::InvalidColumn(name.to_string()));
            }
            return Ok(FieldRef { spec, path: Some(key.to_string()) });
        }

        Err(FilterError::InvalidColumn(name.to_string()))
    }

    /// Quoted column list of every declared field
    pub fn default_columns(&self) -> String {
        self.fields.iter().map(FieldSpec::quoted).collect::<Vec<_>>().join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static SAMPLE: ResourceSchema = ResourceSchema {
        table: "sample",
        fields: &[
            FieldSpec::new("id", "id", FieldKind::Uuid),
            FieldSpec::new("averageCost", "average_cost", FieldKind::Number),
            FieldSpec::new("location", "location", FieldKind::Document),
        ],
    };

    #[test]
    fn resolves_plain_and_document_fields() {
        let plain = SAMPLE.resolve("averageCost").unwrap();
        assert_eq!(plain.sql_expr(), "\"average_cost\"");
        assert_eq!(plain.value_kind(), FieldKind::Number);

        let nested = SAMPLE.resolve("location.state").unwrap();
        assert_eq!(nested.sql_expr(), "(\"location\"->>'state')");
        assert_eq!(nested.value_kind(), FieldKind::Text);
    }

    #[test]
    fn rejects_unknown_and_unsafe_names() {
        assert!(SAMPLE.resolve("password").is_err());
        assert!(SAMPLE.resolve("averageCost.x").is_err());
        assert!(SAMPLE.resolve("location.state'--").is_err());
        assert!(SAMPLE.resolve("location.").is_err());
    }
}
