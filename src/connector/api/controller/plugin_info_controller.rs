use anyhow::Result;

use crate::application::RegisterPluginUseCase;

use super::super::Container;

/// Writes the registration descriptor to the output channel without
/// contacting the host.
pub struct PluginInfoController<'a> {
    container: &'a Container,
}

impl<'a> PluginInfoController<'a> {
    pub fn new(container: &'a Container) -> Self {
        Self { container }
    }

    pub async fn info(&self) -> Result<String> {
        let payload = RegisterPluginUseCase::payload(&self.container.definition());
        let mut channel = self.container.output_channel().await?;
        channel.send(&payload).await?;
        Ok(format!("{}: {}", payload.name, payload.description))
    }
}
