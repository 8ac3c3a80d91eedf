use anyhow::Result;

use super::super::Container;

pub struct StartupController<'a> {
    container: &'a Container,
}

impl<'a> StartupController<'a> {
    pub fn new(container: &'a Container) -> Self {
        Self { container }
    }

    pub async fn startup(&self, endpoint: String) -> Result<String> {
        let use_case = self.container.register_use_case(&endpoint);
        let payload = use_case.execute(&self.container.definition()).await?;
        Ok(format!(
            "Registered plugin {} at {} ({} subtasks, {} API endpoints)",
            payload.name,
            endpoint,
            payload.subtask_metas.len(),
            payload.api_endpoints.len()
        ))
    }
}
