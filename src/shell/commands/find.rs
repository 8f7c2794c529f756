use anyhow::{Result, anyhow};
use async_trait::async_trait;

use super::output::display_name;
use super::{Command, ShellState};
use crate::print_line;

pub struct FindCommand;

#[async_trait]
impl Command for FindCommand {
    fn name(&self) -> &str {
        "find"
    }

    fn usage(&self) -> &str {
        "find [-p] QUERY - Find resources whose name contains QUERY (-p: path prefix)"
    }

    async fn execute(&self, state: &mut ShellState, args: &[String]) -> Result<()> {
        let (by_prefix, query) = match args {
            [flag, query] if flag == "-p" => (true, query),
            [query] => (false, query),
            _ => return Err(anyhow!("Usage: {}", self.usage())),
        };

        let mut found = if by_prefix {
            let prefix = state.resolve(query);
            state
                .resources()
                .search_by_prefix(&prefix, state.user_id())
                .await?
        } else {
            state.resources().search(query, state.user_id()).await?
        };
        found.sort_by_key(|resource| resource.relative_path());

        for resource in &found {
            print_line!("{}", display_name(resource, true));
        }
        Ok(())
    }
}
