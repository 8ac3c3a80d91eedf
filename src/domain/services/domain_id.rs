use serde_json::Value;

use crate::domain::{Entity, EntitySchema};

/// Stable cross-source identifier for the domain entity derived from `tool`.
///
/// `plugin:TypeName:pk1:pk2...`, primary keys in declaration order. Other
/// implementations of the protocol compute the same string, so the format
/// must not change.
pub fn derive_domain_id(plugin: &str, schema: &EntitySchema, tool: &Entity) -> String {
    let mut segments = vec![plugin.to_string(), schema.type_name().to_string()];
    for key in schema.primary_keys() {
        segments.push(render_key(tool.get(key.name())));
    }
    segments.join(":")
}

/// Key parts are rendered the way the host side stringifies attribute
/// values: `True`/`False` for booleans, `None` for a missing value.
fn render_key(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "None".to_string(),
        Some(Value::Bool(true)) => "True".to_string(),
        Some(Value::Bool(false)) => "False".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FieldDef, FieldKind};

    fn pipeline_schema() -> EntitySchema {
        EntitySchema::new(
            "Pipeline",
            "_tool_ci_pipelines",
            vec![
                FieldDef::key("id", FieldKind::Text),
                FieldDef::new("number", FieldKind::Integer),
            ],
        )
        .unwrap()
    }

    fn job_schema() -> EntitySchema {
        EntitySchema::new(
            "Job",
            "_tool_ci_jobs",
            vec![
                FieldDef::key("workflow_id", FieldKind::Text),
                FieldDef::new("name", FieldKind::Text),
                FieldDef::key("job_number", FieldKind::Integer),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_derive_single_key() {
        let tool = Entity::new("Pipeline").with("id", "p-1").with("number", 4);
        assert_eq!(derive_domain_id("ci", &pipeline_schema(), &tool), "ci:Pipeline:p-1");
    }

    #[test]
    fn test_derive_composite_key_in_declaration_order() {
        let tool = Entity::new("Job")
            .with("job_number", 12)
            .with("name", "build")
            .with("workflow_id", "wf-3");
        assert_eq!(derive_domain_id("ci", &job_schema(), &tool), "ci:Job:wf-3:12");
    }

    #[test]
    fn test_derive_is_deterministic() {
        let tool = Entity::new("Pipeline").with("id", "p-1");
        let first = derive_domain_id("ci", &pipeline_schema(), &tool);
        let second = derive_domain_id("ci", &pipeline_schema(), &tool.clone());
        assert_eq!(first, second);
    }

    #[test]
    fn test_derive_distinguishes_plugin_type_and_key() {
        let tool = Entity::new("Pipeline").with("id", "p-1");
        let other_key = Entity::new("Pipeline").with("id", "p-2");
        let job = Entity::new("Job").with("workflow_id", "p-1").with("job_number", 1);

        let ids = [
            derive_domain_id("ci", &pipeline_schema(), &tool),
            derive_domain_id("cd", &pipeline_schema(), &tool),
            derive_domain_id("ci", &pipeline_schema(), &other_key),
            derive_domain_id("ci", &job_schema(), &job),
        ];
        let unique: std::collections::HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len());
    }

    #[test]
    fn test_boolean_and_missing_keys_render_like_the_host() {
        let schema = EntitySchema::new(
            "Flag",
            "_tool_ci_flags",
            vec![
                FieldDef::key("name", FieldKind::Text),
                FieldDef::key("enabled", FieldKind::Boolean),
            ],
        )
        .unwrap();

        let on = Entity::new("Flag").with("name", "deploy").with("enabled", true);
        let off = Entity::new("Flag").with("name", "deploy").with("enabled", false);
        let unset = Entity::new("Flag").with("enabled", true);

        assert_eq!(derive_domain_id("ci", &schema, &on), "ci:Flag:deploy:True");
        assert_eq!(derive_domain_id("ci", &schema, &off), "ci:Flag:deploy:False");
        assert_eq!(derive_domain_id("ci", &schema, &unset), "ci:Flag:None:True");
    }
}
