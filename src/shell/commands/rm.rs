use anyhow::{Result, anyhow};
use async_trait::async_trait;

use super::{Command, ShellState};

pub struct RmCommand;

#[async_trait]
impl Command for RmCommand {
    fn name(&self) -> &str {
        "rm"
    }

    fn usage(&self) -> &str {
        "rm PATH... - Delete files, or directories given with a trailing '/'"
    }

    async fn execute(&self, state: &mut ShellState, args: &[String]) -> Result<()> {
        if args.is_empty() {
            return Err(anyhow!("Usage: {}", self.usage()));
        }

        for path in args {
            let relative = state.resolve(path);
            if state.current_dir().to_relative(true).starts_with(&relative) && relative.ends_with('/')
            {
                return Err(anyhow!("rm: refusing to remove the current directory"));
            }
            state
                .resources()
                .delete_resource(&relative, state.user_id())
                .await?;
        }
        Ok(())
    }
}
