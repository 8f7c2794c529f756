use anyhow::{Result, anyhow};
use async_trait::async_trait;

use super::output::{display_name, display_size};
use super::{Command, ShellState};
use crate::print_line;

pub struct LsCommand;

#[async_trait]
impl Command for LsCommand {
    fn name(&self) -> &str {
        "ls"
    }

    fn usage(&self) -> &str {
        "ls [-l] [--json] [PATH] - List directory contents"
    }

    async fn execute(&self, state: &mut ShellState, args: &[String]) -> Result<()> {
        let mut long_format = false;
        let mut json = false;
        let mut path_arg: Option<String> = None;

        for arg in args {
            match arg.as_str() {
                "-l" => long_format = true,
                "--json" => json = true,
                flag if flag.starts_with('-') => return Err(anyhow!("ls: unknown option {flag}")),
                _ if path_arg.is_none() => path_arg = Some(arg.clone()),
                _ => {}
            }
        }

        // A wildcard in the last segment filters the parent's listing
        let (dir, pattern) = match path_arg {
            Some(path) if path.contains('*') || path.contains('?') => match path.rfind('/') {
                Some(pos) => (
                    Some(path[..=pos].to_string()),
                    Some(path[pos + 1..].to_string()),
                ),
                None => (None, Some(path)),
            },
            other => (other, None),
        };

        let relative = state.resolve_dir(dir.as_ref());
        let mut entries = state
            .directories()
            .list_directory(&relative, state.user_id())
            .await?;
        if let Some(pattern) = &pattern {
            entries.retain(|entry| matches_pattern(entry.name.trim_end_matches('/'), pattern));
        }

        // Directories first, then by name
        entries.sort_by(|a, b| {
            b.kind
                .is_dir()
                .cmp(&a.kind.is_dir())
                .then_with(|| a.name.cmp(&b.name))
        });

        if json {
            print_line!("{}", serde_json::to_string_pretty(&entries)?);
            return Ok(());
        }

        if long_format {
            print_line!("{:<12} {:<6} NAME", "SIZE", "TYPE");
            print_line!("{}", "-".repeat(60));
            for entry in &entries {
                let kind = if entry.kind.is_dir() { "dir" } else { "file" };
                print_line!(
                    "{:<12} {:<6} {}",
                    display_size(entry),
                    kind,
                    display_name(entry, false)
                );
            }
        } else {
            for entry in &entries {
                print_line!("{}", display_name(entry, false));
            }
        }

        Ok(())
    }
}

/// Match a name against a simple wildcard pattern (`*` and `?`)
fn matches_pattern(name: &str, pattern: &str) -> bool {
    let name: Vec<char> = name.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();

    fn go(name: &[char], pattern: &[char]) -> bool {
        match (name.first(), pattern.first()) {
            (_, Some('*')) => {
                go(name, &pattern[1..]) || (!name.is_empty() && go(&name[1..], pattern))
            }
            (Some(_), Some('?')) => go(&name[1..], &pattern[1..]),
            (Some(n), Some(p)) if n == p => go(&name[1..], &pattern[1..]),
            (None, None) => true,
            _ => false,
        }
    }

    go(&name, &pattern)
}
