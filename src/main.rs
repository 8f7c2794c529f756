use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use cloudvault::auth::{AuthService, AuthenticatedUser, JsonUserStore, MemoryUserStore, UserStore};
use cloudvault::config::Config;
use cloudvault::s3::{S3Backend, StorageMetrics};
use cloudvault::service::{DirectoryService, ResourceService};
use cloudvault::shell::ShellState;
use cloudvault::storage::{MemoryBackend, StorageBackend};

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn open_storage(
    config: &Config,
) -> Result<(Arc<dyn StorageBackend>, Option<Arc<StorageMetrics>>)> {
    if config.memory {
        let storage: Arc<dyn StorageBackend> = MemoryBackend::new();
        return Ok((storage, None));
    }

    let backend = S3Backend::new(config.s3_config()).await;
    backend
        .ensure_bucket()
        .await
        .with_context(|| format!("bucket '{}' is not usable", backend.bucket()))?;
    let metrics = Arc::clone(backend.metrics());
    let storage: Arc<dyn StorageBackend> = Arc::new(backend);
    Ok((storage, Some(metrics)))
}

async fn login(
    config: &Config,
    rl: &mut DefaultEditor,
    auth: &AuthService,
) -> Result<AuthenticatedUser> {
    let password = match &config.password {
        Some(password) => password.clone(),
        None => rl.readline("Password (shown as typed): ")?,
    };

    let user = if config.register {
        auth.register(&config.username, &password).await?
    } else {
        auth.authenticate(&config.username, &password).await?
    };
    Ok(user)
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();
    init_tracing(&config);

    let (storage, metrics) = match open_storage(&config).await {
        Ok(opened) => opened,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            eprintln!("Make sure the endpoint is reachable and credentials are configured.");
            std::process::exit(1);
        }
    };

    let users: Arc<dyn UserStore> = if config.memory {
        MemoryUserStore::new() as Arc<dyn UserStore>
    } else {
        JsonUserStore::new(config.users_file()) as Arc<dyn UserStore>
    };
    let auth = AuthService::new(users, DirectoryService::new(Arc::clone(&storage)));

    let mut rl = DefaultEditor::new()?;
    let user = match login(&config, &mut rl, &auth).await {
        Ok(user) => user,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    };

    println!("{}", "=".repeat(60).cyan());
    println!("{}", "  cloudvault".bold().cyan());
    println!("{}", format!("  Logged in as {}", user.username).cyan());
    println!("{}", "=".repeat(60).cyan());
    println!();
    println!("Type 'help' for available commands or 'exit' to quit");
    println!();

    let mut state = ShellState::new(user, ResourceService::new(storage));
    if let Some(metrics) = metrics {
        state = state.with_metrics(metrics);
    }

    let history_file = dirs::home_dir().map(|mut p| {
        p.push(".cloudvault_history");
        p
    });
    if let Some(path) = &history_file {
        let _ = rl.load_history(path);
    }

    loop {
        let prompt = state.prompt();

        match rl.readline(&prompt) {
            Ok(line) => {
                let _ = rl.add_history_entry(line.as_str());

                if let Err(e) = state.execute(&line).await {
                    if e.to_string() == "exit" {
                        break;
                    }
                    eprintln!("{} {}", "Error:".red().bold(), e);
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("exit");
                break;
            }
            Err(err) => {
                eprintln!("{} {:?}", "Error:".red().bold(), err);
                break;
            }
        }
    }

    if let Some(path) = &history_file {
        let _ = rl.save_history(path);
    }

    Ok(())
}
