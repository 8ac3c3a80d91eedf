//! Deterministic names for tasks and relations.
//!
//! Task names double as ledger keys, so they must be unique per
//! (plugin, stream, stage) and stable across releases.

use crate::domain::StageKind;

pub const LEDGER_TABLE: &str = "_syncstage_task_runs";

/// `{verb}{Plugin}{Stream}`, e.g. `collectCiPipelines`.
pub fn task_name(stage: StageKind, plugin: &str, stream: &str) -> String {
    format!("{}{}{}", stage.verb(), capitalize(plugin), capitalize(stream))
}

/// `{Verb} {plugin} {stream}`, e.g. `Collect ci pipelines`.
pub fn task_description(stage: StageKind, plugin: &str, stream: &str) -> String {
    format!(
        "{} {} {}",
        capitalize(stage.verb()),
        plugin,
        stream.to_lowercase()
    )
}

/// Raw relation of a stream, `_raw_{plugin}_{stream}`.
pub fn raw_table_name(plugin: &str, stream: &str) -> String {
    format!("_raw_{}_{}", plugin, stream)
}

/// Conventional tool relation name, `_tool_{plugin}_{entity}`.
pub fn tool_table_name(plugin: &str, entity: &str) -> String {
    format!("_tool_{}_{}", plugin, entity)
}

fn capitalize(s: &str) -> String {
    let lower = s.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_name_is_unique_per_stage_and_stream() {
        assert_eq!(task_name(StageKind::Collect, "ci", "pipelines"), "collectCiPipelines");
        assert_eq!(task_name(StageKind::Extract, "ci", "pipelines"), "extractCiPipelines");
        assert_ne!(
            task_name(StageKind::Convert, "ci", "pipelines"),
            task_name(StageKind::Convert, "ci", "workflows")
        );
    }

    #[test]
    fn test_task_description() {
        assert_eq!(
            task_description(StageKind::Convert, "ci", "Workflows"),
            "Convert ci workflows"
        );
    }

    #[test]
    fn test_table_names() {
        assert_eq!(raw_table_name("ci", "pipelines"), "_raw_ci_pipelines");
        assert_eq!(tool_table_name("ci", "workflows"), "_tool_ci_workflows");
    }
}
