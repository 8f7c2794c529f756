use anyhow::{Result, anyhow};
use async_trait::async_trait;

use super::{Command, ShellState};
use crate::print_line;

pub struct MvCommand;

#[async_trait]
impl Command for MvCommand {
    fn name(&self) -> &str {
        "mv"
    }

    fn usage(&self) -> &str {
        "mv SOURCE TARGET - Move or rename a file or directory"
    }

    async fn execute(&self, state: &mut ShellState, args: &[String]) -> Result<()> {
        let [source, target] = args else {
            return Err(anyhow!("Usage: {}", self.usage()));
        };

        let moved = state
            .resources()
            .move_or_rename(&state.resolve(source), &state.resolve(target), state.user_id())
            .await?;
        print_line!("{source} -> /{}", moved.relative_path());
        Ok(())
    }
}
