use anyhow::Result;
use async_trait::async_trait;

use super::{Command, ShellState};
use crate::vfs::VirtualPath;

pub struct CdCommand;

#[async_trait]
impl Command for CdCommand {
    fn name(&self) -> &str {
        "cd"
    }

    fn usage(&self) -> &str {
        "cd [PATH] - Change current directory"
    }

    async fn execute(&self, state: &mut ShellState, args: &[String]) -> Result<()> {
        // cd with no args goes to root
        let Some(path) = args.first() else {
            state.set_current_dir(VirtualPath::root());
            return Ok(());
        };

        let target = state.current_dir().join(path);
        if !target.is_root() {
            // Listing fails with NotFound unless the directory marker exists
            state
                .directories()
                .list_directory(&target.to_relative(true), state.user_id())
                .await?;
        }

        state.set_current_dir(target);
        Ok(())
    }
}
