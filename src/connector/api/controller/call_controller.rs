use anyhow::Result;

use crate::connector::adapter::ApiCallRequest;

use super::super::Container;

/// `call <handler> <ctx> <input>`: one plugin API handler, one result line.
pub struct CallController<'a> {
    container: &'a Container,
}

impl<'a> CallController<'a> {
    pub fn new(container: &'a Container) -> Self {
        Self { container }
    }

    pub async fn call(&self, handler: String, ctx: String, input: String) -> Result<String> {
        let request = ApiCallRequest::decode(&handler, &ctx, &input)?;
        let api_handler = self.container.definition().api_handler(&request.handler)?;

        let output = api_handler.handle(&request.ctx, request.input).await?;
        let mut channel = self.container.output_channel().await?;
        channel.send(&output).await?;

        Ok(format!("{} returned {}", request.handler, output.status))
    }
}
