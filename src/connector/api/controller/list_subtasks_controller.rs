use anyhow::Result;

use super::super::Container;

pub struct ListSubtasksController<'a> {
    container: &'a Container,
}

impl<'a> ListSubtasksController<'a> {
    pub fn new(container: &'a Container) -> Self {
        Self { container }
    }

    pub async fn list(&self) -> Result<String> {
        let listings = self.container.definition().subtask_listings();
        let mut channel = self.container.output_channel().await?;
        for listing in &listings {
            channel.send(listing).await?;
        }

        let mut output = format!("{} subtasks:\n", listings.len());
        for listing in &listings {
            output.push_str(&format!("  {:<32} {}\n", listing.name, listing.command.join(" ")));
        }
        Ok(output)
    }
}
