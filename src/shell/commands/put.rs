use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::path::Path;

use super::output::display_name;
use super::{Command, ShellState};
use crate::print_line;
use crate::service::UploadFile;

pub struct PutCommand;

#[async_trait]
impl Command for PutCommand {
    fn name(&self) -> &str {
        "put"
    }

    fn usage(&self) -> &str {
        "put LOCAL... [--to DIR] - Upload local files into a directory"
    }

    async fn execute(&self, state: &mut ShellState, args: &[String]) -> Result<()> {
        let mut target: Option<String> = None;
        let mut locals = Vec::new();

        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            if arg == "--to" {
                let dir = iter
                    .next()
                    .ok_or_else(|| anyhow!("put: --to needs a directory"))?;
                target = Some(dir.clone());
            } else {
                locals.push(arg);
            }
        }
        if locals.is_empty() {
            return Err(anyhow!("Usage: {}", self.usage()));
        }

        let mut files = Vec::with_capacity(locals.len());
        for local in locals {
            let name = Path::new(local)
                .file_name()
                .and_then(|name| name.to_str())
                .ok_or_else(|| anyhow!("put: {local}: not a file name"))?;
            let metadata = tokio::fs::metadata(local)
                .await
                .map_err(|e| anyhow!("put: {local}: {e}"))?;
            if !metadata.is_file() {
                return Err(anyhow!("put: {local}: not a regular file"));
            }
            files.push(UploadFile::from_path(name, local));
        }

        let directory = state.resolve_dir(target.as_ref());
        let uploaded = state
            .resources()
            .upload_resources(&directory, files, state.user_id())
            .await?;

        for resource in &uploaded {
            print_line!("{}", display_name(resource, true));
        }
        Ok(())
    }
}
