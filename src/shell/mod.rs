pub mod commands;

use anyhow::{Result, anyhow};
use std::collections::HashMap;
use std::sync::Arc;

use crate::auth::AuthenticatedUser;
use crate::s3::StorageMetrics;
use crate::service::{DirectoryService, ResourceService};
use crate::vfs::{UserId, VirtualPath};
use commands::Command;

/// Shell state - tracks the logged in user and current directory
pub struct ShellState {
    user: AuthenticatedUser,
    /// Current directory in the user's namespace
    cwd: VirtualPath,
    resources: ResourceService,
    /// Request statistics, only available when talking to S3
    metrics: Option<Arc<StorageMetrics>>,
    /// Registered commands
    commands: HashMap<String, Arc<dyn Command>>,
}

impl ShellState {
    pub fn new(user: AuthenticatedUser, resources: ResourceService) -> Self {
        let mut state = ShellState {
            user,
            cwd: VirtualPath::root(),
            resources,
            metrics: None,
            commands: HashMap::new(),
        };

        state.register_command(Arc::new(commands::ls::LsCommand));
        state.register_command(Arc::new(commands::cd::CdCommand));
        state.register_command(Arc::new(commands::cat::CatCommand));
        state.register_command(Arc::new(commands::stat::StatCommand));
        state.register_command(Arc::new(commands::mkdir::MkdirCommand));
        state.register_command(Arc::new(commands::rm::RmCommand));
        state.register_command(Arc::new(commands::mv::MvCommand));
        state.register_command(Arc::new(commands::get::GetCommand));
        state.register_command(Arc::new(commands::put::PutCommand));
        state.register_command(Arc::new(commands::find::FindCommand));

        state
    }

    pub fn with_metrics(mut self, metrics: Arc<StorageMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    fn register_command(&mut self, command: Arc<dyn Command>) {
        self.commands.insert(command.name().to_string(), command);
    }

    /// Execute a command line
    pub async fn execute(&mut self, line: &str) -> Result<()> {
        let parts = Self::parse_command_line(line.trim())?;
        if parts.is_empty() {
            return Ok(());
        }

        let cmd_name = &parts[0];
        let args = &parts[1..];

        // Built-ins first
        match cmd_name.as_str() {
            "exit" | "quit" => return Err(anyhow!("exit")),
            "help" => {
                self.print_help();
                return Ok(());
            }
            "pwd" => {
                println!("{}", self.cwd);
                return Ok(());
            }
            "whoami" => {
                println!("{} (id {})", self.user.username, self.user.id);
                return Ok(());
            }
            "stats" => {
                self.print_stats();
                return Ok(());
            }
            _ => {}
        }

        if let Some(command) = self.commands.get(cmd_name) {
            let cmd = Arc::clone(command);
            cmd.execute(self, args).await
        } else {
            Err(anyhow!("Unknown command: {cmd_name}"))
        }
    }

    pub fn user(&self) -> &AuthenticatedUser {
        &self.user
    }

    pub fn user_id(&self) -> UserId {
        self.user.id
    }

    pub fn resources(&self) -> &ResourceService {
        &self.resources
    }

    pub fn directories(&self) -> &DirectoryService {
        self.resources.directories()
    }

    pub fn current_dir(&self) -> &VirtualPath {
        &self.cwd
    }

    pub fn set_current_dir(&mut self, path: VirtualPath) {
        self.cwd = path;
    }

    /// Resolve a command argument against the current directory into the
    /// relative form the services take. A trailing `/` marks a directory.
    pub fn resolve(&self, arg: &str) -> String {
        let directory = arg.ends_with('/') || arg == "." || arg == "..";
        self.cwd.join(arg).to_relative(directory)
    }

    /// Relative path of a directory argument, the current directory when absent
    pub fn resolve_dir(&self, arg: Option<&String>) -> String {
        match arg {
            Some(arg) => self.cwd.join(arg).to_relative(true),
            None => self.cwd.to_relative(true),
        }
    }

    fn print_stats(&self) {
        let Some(metrics) = &self.metrics else {
            println!("No storage statistics available");
            return;
        };

        println!(
            "{} requests, {:.3}s total",
            metrics.request_count(),
            metrics.total_request_time().as_secs_f64()
        );
        for (op, stats) in metrics.operations() {
            println!(
                "  {op:<12} {:>6} requests {:>4} failed {:>9.3}s",
                stats.requests,
                stats.failures,
                stats.total_time.as_secs_f64()
            );
        }
    }

    fn print_help(&self) {
        println!("Available commands:");
        let mut names: Vec<&String> = self.commands.keys().collect();
        names.sort();
        for name in names {
            if let Some(command) = self.commands.get(name) {
                println!("  {}", command.usage());
            }
        }
        println!("  pwd - Print working directory");
        println!("  whoami - Show the logged in user");
        println!("  stats - Show storage request statistics");
        println!("  help - Show this help");
        println!("  exit/quit - Exit the shell");
        println!();
        println!("Paths ending in '/' refer to directories.");
    }

    /// Get the prompt string
    pub fn prompt(&self) -> String {
        format!("{}@cloudvault:{} $ ", self.user.username, self.cwd)
    }

    /// Parse command line respecting quotes (both single and double)
    fn parse_command_line(line: &str) -> Result<Vec<String>> {
        let mut args = Vec::new();
        let mut current_arg = String::new();
        let mut in_single_quote = false;
        let mut in_double_quote = false;
        let mut escape_next = false;

        for ch in line.chars() {
            if escape_next {
                current_arg.push(ch);
                escape_next = false;
                continue;
            }

            match ch {
                '\\' if !in_single_quote => {
                    escape_next = true;
                }
                '\'' if !in_double_quote => {
                    in_single_quote = !in_single_quote;
                }
                '"' if !in_single_quote => {
                    in_double_quote = !in_double_quote;
                }
                ' ' | '\t' if !in_single_quote && !in_double_quote => {
                    if !current_arg.is_empty() {
                        args.push(std::mem::take(&mut current_arg));
                    }
                }
                _ => {
                    current_arg.push(ch);
                }
            }
        }

        if !current_arg.is_empty() {
            args.push(current_arg);
        }

        if in_single_quote {
            return Err(anyhow!("Unclosed single quote"));
        }
        if in_double_quote {
            return Err(anyhow!("Unclosed double quote"));
        }

        Ok(args)
    }
}
