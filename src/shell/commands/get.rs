use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;

use super::{Command, ShellState};
use crate::print_line;
use crate::vfs::path::basename;

pub struct GetCommand;

#[async_trait]
impl Command for GetCommand {
    fn name(&self) -> &str {
        "get"
    }

    fn usage(&self) -> &str {
        "get PATH [LOCAL] - Download a file, or a directory as a zip archive"
    }

    async fn execute(&self, state: &mut ShellState, args: &[String]) -> Result<()> {
        let path = args
            .first()
            .ok_or_else(|| anyhow!("Usage: {}", self.usage()))?;

        let relative = state.resolve(path);
        let download = state
            .resources()
            .prepare_download(&relative, state.user_id())
            .await?;

        let local = match args.get(1) {
            Some(local) => PathBuf::from(local),
            None => PathBuf::from(default_local_name(&relative, download.kind().is_dir())),
        };

        let mut file = tokio::fs::File::create(&local).await?;
        let copied = download.write_to(&mut file).await?;
        file.flush().await?;

        print_line!(
            "Saved {} to {}",
            humansize::format_size(copied, humansize::BINARY),
            local.display()
        );
        Ok(())
    }
}

/// Local file name when none is given; directories are saved as archives
fn default_local_name(relative: &str, directory: bool) -> String {
    let name = match basename(relative) {
        "" => "files",
        name => name,
    };
    if directory {
        format!("{name}.zip")
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_local_name() {
        assert_eq!(default_local_name("docs/a.txt", false), "a.txt");
        assert_eq!(default_local_name("docs/", true), "docs.zip");
        assert_eq!(default_local_name("", true), "files.zip");
    }
}
