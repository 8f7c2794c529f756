use anyhow::{Result, anyhow};
use async_trait::async_trait;

use super::{Command, ShellState};
use crate::print_line;

pub struct StatCommand;

#[async_trait]
impl Command for StatCommand {
    fn name(&self) -> &str {
        "stat"
    }

    fn usage(&self) -> &str {
        "stat PATH - Show a resource as JSON"
    }

    async fn execute(&self, state: &mut ShellState, args: &[String]) -> Result<()> {
        let path = args
            .first()
            .ok_or_else(|| anyhow!("Usage: {}", self.usage()))?;

        let resource = state
            .resources()
            .get_resource(&state.resolve(path), state.user_id())
            .await?;
        print_line!("{}", serde_json::to_string_pretty(&resource)?);
        Ok(())
    }
}
