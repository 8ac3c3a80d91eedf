use crate::domain::{Entity, EntitySchema, FieldDef, FieldKind};

pub const CICD_PIPELINE: &str = "CicdPipeline";
pub const CICD_PIPELINE_RELATIONSHIP: &str = "CicdPipelineRelationship";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CicdStatus {
    InProgress,
    Done,
    Manual,
}

impl CicdStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CicdStatus::InProgress => "IN_PROGRESS",
            CicdStatus::Done => "DONE",
            CicdStatus::Manual => "MANUAL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CicdResult {
    Success,
    Failure,
    Abort,
    Manual,
}

impl CicdResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            CicdResult::Success => "SUCCESS",
            CicdResult::Failure => "FAILURE",
            CicdResult::Abort => "ABORT",
            CicdResult::Manual => "MANUAL",
        }
    }
}

pub fn cicd_pipeline_schema() -> EntitySchema {
    EntitySchema::new(
        CICD_PIPELINE,
        "cicd_pipelines",
        vec![
            FieldDef::key("id", FieldKind::Text),
            FieldDef::new("name", FieldKind::Text),
            FieldDef::new("status", FieldKind::Text),
            FieldDef::new("result", FieldKind::Text),
            FieldDef::new("created_date", FieldKind::Timestamp),
            FieldDef::new("finished_date", FieldKind::Timestamp),
            FieldDef::new("duration_sec", FieldKind::Integer),
            FieldDef::new("environment", FieldKind::Text),
            FieldDef::new("type", FieldKind::Text),
        ],
    )
    .expect("Invalid cicd_pipelines schema")
}

pub fn cicd_pipeline_relationship_schema() -> EntitySchema {
    EntitySchema::new(
        CICD_PIPELINE_RELATIONSHIP,
        "cicd_pipeline_relationships",
        vec![
            FieldDef::key("parent_pipeline_id", FieldKind::Text),
            FieldDef::key("child_pipeline_id", FieldKind::Text),
        ],
    )
    .expect("Invalid cicd_pipeline_relationships schema")
}

/// Start a `CicdPipeline`; the convertor assigns its `id`.
pub fn cicd_pipeline(name: impl Into<String>, status: CicdStatus) -> Entity {
    Entity::new(CICD_PIPELINE)
        .with("name", name.into())
        .with("status", status.as_str())
}

pub fn cicd_pipeline_relationship(parent_id: &str, child_id: &str) -> Entity {
    Entity::new(CICD_PIPELINE_RELATIONSHIP)
        .with("parent_pipeline_id", parent_id)
        .with("child_pipeline_id", child_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_is_id_keyed_relationship_is_not() {
        assert!(cicd_pipeline_schema().is_id_keyed());
        assert!(!cicd_pipeline_relationship_schema().is_id_keyed());
    }

    #[test]
    fn test_relationship_conforms() {
        let rel = cicd_pipeline_relationship("ci:Pipeline:p-1", "ci:Workflow:wf-1");
        assert!(cicd_pipeline_relationship_schema().conform(rel).is_ok());
    }
}
