use anyhow::{Result, anyhow};
use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use super::{Command, ShellState};

pub struct CatCommand;

#[async_trait]
impl Command for CatCommand {
    fn name(&self) -> &str {
        "cat"
    }

    fn usage(&self) -> &str {
        "cat FILE... - Display file contents"
    }

    async fn execute(&self, state: &mut ShellState, args: &[String]) -> Result<()> {
        if args.is_empty() {
            return Err(anyhow!("Usage: {}", self.usage()));
        }

        let mut stdout = tokio::io::stdout();
        for arg in args {
            let download = state
                .resources()
                .prepare_download(&state.resolve(arg), state.user_id())
                .await?;
            if download.kind().is_dir() {
                return Err(anyhow!("cat: {arg}: Is a directory"));
            }

            download.write_to(&mut stdout).await?;
        }
        stdout.flush().await?;

        Ok(())
    }
}
