use anyhow::{Result, anyhow};
use async_trait::async_trait;

use super::{Command, ShellState};

pub struct MkdirCommand;

#[async_trait]
impl Command for MkdirCommand {
    fn name(&self) -> &str {
        "mkdir"
    }

    fn usage(&self) -> &str {
        "mkdir DIR... - Create directories"
    }

    async fn execute(&self, state: &mut ShellState, args: &[String]) -> Result<()> {
        if args.is_empty() {
            return Err(anyhow!("Usage: {}", self.usage()));
        }

        for dir in args {
            let relative = state.current_dir().join(dir).to_relative(true);
            state
                .directories()
                .create_directory(&relative, state.user_id())
                .await?;
        }
        Ok(())
    }
}
