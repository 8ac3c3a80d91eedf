use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::DomainError;

/// Storage kind of a single entity field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Integer,
    Float,
    Boolean,
    /// RFC 3339 text.
    Timestamp,
    /// Arbitrary JSON, stored serialized.
    Json,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Integer => "integer",
            FieldKind::Float => "float",
            FieldKind::Boolean => "boolean",
            FieldKind::Timestamp => "timestamp",
            FieldKind::Json => "json",
        }
    }

    pub fn sql_type(&self) -> &'static str {
        match self {
            FieldKind::Integer => "BIGINT",
            FieldKind::Float => "DOUBLE",
            FieldKind::Boolean => "BOOLEAN",
            FieldKind::Text | FieldKind::Timestamp | FieldKind::Json => "TEXT",
        }
    }

    /// Coerce a JSON value onto this kind.
    ///
    /// Objects given for non-JSON fields are treated as references and
    /// replaced by their `id` member.
    pub fn coerce(&self, value: Value) -> Result<Value, String> {
        if value.is_null() || *self == FieldKind::Json {
            return Ok(value);
        }
        if let Value::Object(mut obj) = value {
            let id = obj.remove("id").unwrap_or(Value::Null);
            return self.coerce(id);
        }

        match self {
            FieldKind::Text => match value {
                Value::String(_) => Ok(value),
                Value::Number(n) => Ok(Value::String(n.to_string())),
                Value::Bool(b) => Ok(Value::String(b.to_string())),
                other => Ok(Value::String(other.to_string())),
            },
            FieldKind::Timestamp => match value {
                Value::String(_) => Ok(value),
                other => Err(format!("expected an RFC 3339 string, got {}", other)),
            },
            FieldKind::Integer => match &value {
                Value::Number(n) if n.is_i64() || n.is_u64() => n
                    .as_i64()
                    .map(Value::from)
                    .ok_or_else(|| format!("integer {} out of range", n)),
                Value::Number(n) => match n.as_f64() {
                    // i64::MAX as f64 is 2^63, which is itself out of range.
                    Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
                        Ok(Value::from(f as i64))
                    }
                    Some(f) if f.fract() == 0.0 => Err(format!("integer {} out of range", n)),
                    _ => Err(format!("expected an integer, got {}", n)),
                },
                Value::String(s) => s
                    .trim()
                    .parse::<i64>()
                    .map(Value::from)
                    .map_err(|_| format!("expected an integer, got {:?}", s)),
                other => Err(format!("expected an integer, got {}", other)),
            },
            FieldKind::Float => match &value {
                Value::Number(n) => n
                    .as_f64()
                    .map(Value::from)
                    .ok_or_else(|| format!("expected a number, got {}", n)),
                Value::String(s) => s
                    .trim()
                    .parse::<f64>()
                    .map(Value::from)
                    .map_err(|_| format!("expected a number, got {:?}", s)),
                other => Err(format!("expected a number, got {}", other)),
            },
            FieldKind::Boolean => match &value {
                Value::Bool(_) => Ok(value),
                Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(Value::Bool(true)),
                Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(Value::Bool(false)),
                other => Err(format!("expected a boolean, got {}", other)),
            },
            FieldKind::Json => Ok(value),
        }
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    name: String,
    kind: FieldKind,
    primary_key: bool,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            primary_key: false,
        }
    }

    /// A primary-key field.
    pub fn key(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            primary_key: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }
}

/// Shape of one entity type: its name, the relation it lives in, and its
/// fields in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySchema {
    type_name: String,
    table: String,
    fields: Vec<FieldDef>,
}

impl EntitySchema {
    pub fn new(
        type_name: impl Into<String>,
        table: impl Into<String>,
        fields: Vec<FieldDef>,
    ) -> Result<Self, DomainError> {
        let type_name = type_name.into();
        let table = table.into();

        if type_name.trim().is_empty() {
            return Err(DomainError::invalid_input("entity type name is empty"));
        }
        validate_identifier(&table)?;

        let mut seen = std::collections::HashSet::new();
        for field in &fields {
            validate_identifier(field.name())?;
            if !seen.insert(field.name()) {
                return Err(DomainError::invalid_input(format!(
                    "duplicate field '{}' in {}",
                    field.name(),
                    type_name
                )));
            }
        }

        if !fields.iter().any(FieldDef::is_primary_key) {
            return Err(DomainError::invalid_input(format!(
                "{} declares no primary key",
                type_name
            )));
        }

        Ok(Self {
            type_name,
            table,
            fields,
        })
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name() == name)
    }

    /// Primary-key fields in declaration order.
    pub fn primary_keys(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|f| f.is_primary_key())
    }

    /// True when the sole primary key is a field named `id`.
    ///
    /// Entities of such types get their identifier from the domain-ID deriver.
    pub fn is_id_keyed(&self) -> bool {
        let mut keys = self.primary_keys();
        matches!((keys.next(), keys.next()), (Some(key), None) if key.name() == "id")
    }

    /// Project a raw payload onto this shape by field-name matching.
    ///
    /// Payload keys with no matching field are ignored; fields missing from the
    /// payload become null.
    pub fn project(&self, payload: &Value) -> Result<Entity, DomainError> {
        let obj = payload.as_object().ok_or_else(|| {
            DomainError::invalid_input(format!(
                "cannot project a non-object payload onto {}",
                self.type_name
            ))
        })?;

        let mut entity = Entity::new(self.type_name.clone());
        for field in &self.fields {
            let value = obj.get(field.name()).cloned().unwrap_or(Value::Null);
            entity.set(field.name(), self.coerce_field(field, value)?);
        }
        self.check_keys(&entity)?;
        Ok(entity)
    }

    /// Coerce an entity built by conversion code onto this shape.
    ///
    /// Unlike [`EntitySchema::project`], values that do not correspond to a
    /// declared field are an error.
    pub fn conform(&self, entity: Entity) -> Result<Entity, DomainError> {
        if entity.type_name() != self.type_name {
            return Err(DomainError::invalid_input(format!(
                "entity of type {} does not belong to {}",
                entity.type_name(),
                self.type_name
            )));
        }

        let mut values = entity.into_values();
        if let Some(unknown) = values.keys().find(|k| self.field(k).is_none()) {
            return Err(DomainError::invalid_input(format!(
                "{} has no field '{}'",
                self.type_name, unknown
            )));
        }

        let mut conformed = Entity::new(self.type_name.clone());
        for field in &self.fields {
            let value = values.remove(field.name()).unwrap_or(Value::Null);
            conformed.set(field.name(), self.coerce_field(field, value)?);
        }
        self.check_keys(&conformed)?;
        Ok(conformed)
    }

    fn coerce_field(&self, field: &FieldDef, value: Value) -> Result<Value, DomainError> {
        field.kind().coerce(value).map_err(|e| {
            DomainError::invalid_input(format!("{}.{}: {}", self.type_name, field.name(), e))
        })
    }

    fn check_keys(&self, entity: &Entity) -> Result<(), DomainError> {
        for key in self.primary_keys() {
            if entity.get(key.name()).map_or(true, Value::is_null) {
                return Err(DomainError::invalid_input(format!(
                    "{} is missing primary key '{}'",
                    self.type_name,
                    key.name()
                )));
            }
        }
        Ok(())
    }
}

fn validate_identifier(name: &str) -> Result<(), DomainError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(DomainError::invalid_input(format!(
            "'{}' is not a valid identifier",
            name
        )))
    }
}

/// A single tool or domain entity: a type name plus field values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    type_name: String,
    values: Map<String, Value>,
}

impl Entity {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            values: Map::new(),
        }
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(field.into(), value.into());
        self
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.values.get(field).and_then(Value::as_str)
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    pub fn into_values(self) -> Map<String, Value> {
        self.values
    }

    pub fn to_json(&self) -> Value {
        Value::Object(self.values.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn workflow_schema() -> EntitySchema {
        EntitySchema::new(
            "Workflow",
            "_tool_ci_workflows",
            vec![
                FieldDef::key("id", FieldKind::Text),
                FieldDef::new("pipeline_id", FieldKind::Text),
                FieldDef::new("pipeline_number", FieldKind::Integer),
                FieldDef::new("created_at", FieldKind::Timestamp),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_schema_requires_primary_key() {
        let err = EntitySchema::new(
            "NoKey",
            "no_key",
            vec![FieldDef::new("name", FieldKind::Text)],
        )
        .unwrap_err();
        assert!(err.to_string().contains("no primary key"));
    }

    #[test]
    fn test_schema_rejects_unsafe_identifiers() {
        let result = EntitySchema::new(
            "Bad",
            "bad; DROP TABLE x",
            vec![FieldDef::key("id", FieldKind::Text)],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_project_matches_fields_by_name() {
        let payload = json!({
            "id": "wf-1",
            "pipeline_id": {"id": "p-9", "number": 4},
            "pipeline_number": "12",
            "created_at": "2023-01-01T00:00:00Z",
            "unrelated": true
        });

        let entity = workflow_schema().project(&payload).unwrap();

        assert_eq!(entity.get_str("id"), Some("wf-1"));
        assert_eq!(entity.get_str("pipeline_id"), Some("p-9"));
        assert_eq!(entity.get("pipeline_number"), Some(&json!(12)));
        assert!(entity.get("unrelated").is_none());
    }

    #[test]
    fn test_project_missing_key_is_error() {
        let err = workflow_schema()
            .project(&json!({"pipeline_id": "p-1"}))
            .unwrap_err();
        assert!(err.to_string().contains("primary key"));
    }

    #[test]
    fn test_conform_rejects_undeclared_fields() {
        let entity = Entity::new("Workflow")
            .with("id", "wf-1")
            .with("colour", "blue");
        assert!(workflow_schema().conform(entity).is_err());
    }

    #[test]
    fn test_is_id_keyed() {
        assert!(workflow_schema().is_id_keyed());

        let composite = EntitySchema::new(
            "Rel",
            "rel",
            vec![
                FieldDef::key("parent_id", FieldKind::Text),
                FieldDef::key("child_id", FieldKind::Text),
            ],
        )
        .unwrap();
        assert!(!composite.is_id_keyed());
    }

    #[test]
    fn test_integer_coercion_rejects_fractions() {
        assert!(FieldKind::Integer.coerce(json!(1.5)).is_err());
        assert_eq!(FieldKind::Integer.coerce(json!(3.0)).unwrap(), json!(3));
    }

    #[test]
    fn test_integer_coercion_rejects_out_of_range_floats() {
        assert_eq!(FieldKind::Integer.coerce(json!(42.0)).unwrap(), json!(42));
        assert_eq!(FieldKind::Integer.coerce(json!(-3.0)).unwrap(), json!(-3));
        assert!(FieldKind::Integer
            .coerce(json!(1e30))
            .unwrap_err()
            .contains("out of range"));
        assert!(FieldKind::Integer.coerce(json!(-1e30)).is_err());
        assert!(FieldKind::Integer.coerce(json!(9.3e18)).is_err());
        assert!(FieldKind::Integer.coerce(json!(1.5)).is_err());
    }
}
