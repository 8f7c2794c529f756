use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::s3::S3Config;
use crate::s3::config::DEFAULT_BUCKET;

/// Command line and environment configuration for the shell
#[derive(Debug, Clone, Parser)]
#[command(
    name = "cloudvault",
    version,
    about = "Browse and manage your files in an S3-compatible bucket"
)]
pub struct Config {
    /// Account to log in as
    #[arg(env = "CLOUDVAULT_USERNAME")]
    pub username: String,

    /// Password; prompted for when not given. The prompt echoes what is
    /// typed, prefer CLOUDVAULT_PASSWORD on shared terminals
    #[arg(long, env = "CLOUDVAULT_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Create the account before logging in
    #[arg(long)]
    pub register: bool,

    /// Custom S3 endpoint (MinIO, LocalStack, ...)
    #[arg(long, env = "CLOUDVAULT_ENDPOINT_URL")]
    pub endpoint_url: Option<String>,

    /// Bucket shared by all user namespaces
    #[arg(long, env = "CLOUDVAULT_BUCKET", default_value = DEFAULT_BUCKET)]
    pub bucket: String,

    #[arg(long, env = "CLOUDVAULT_REGION")]
    pub region: Option<String>,

    /// Use path-style bucket addressing
    #[arg(long, env = "CLOUDVAULT_FORCE_PATH_STYLE")]
    pub force_path_style: bool,

    /// Upper bound on each storage request, in seconds
    #[arg(long, env = "CLOUDVAULT_REQUEST_TIMEOUT", default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// Keep everything in memory instead of talking to S3
    #[arg(long)]
    pub memory: bool,

    /// Where accounts are stored (default: ~/.cloudvault/users.json)
    #[arg(long, env = "CLOUDVAULT_USERS_FILE")]
    pub users_file: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, env = "CLOUDVAULT_LOG", default_value = "warn")]
    pub log_level: String,
}

impl Config {
    pub fn s3_config(&self) -> S3Config {
        S3Config {
            bucket: self.bucket.clone(),
            endpoint_url: self.endpoint_url.clone(),
            force_path_style: self.force_path_style,
            region: self.region.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }

    pub fn users_file(&self) -> PathBuf {
        self.users_file.clone().unwrap_or_else(|| {
            let mut path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
            path.push(".cloudvault");
            path.push("users.json");
            path
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_defaults() {
        let config = Config::try_parse_from(["cloudvault", "alice"]).unwrap();
        assert_eq!(config.username, "alice");
        assert!(!config.register);

        let s3 = config.s3_config();
        assert_eq!(s3.bucket, "user-files");
        assert_eq!(s3.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_overrides() {
        let config = Config::try_parse_from([
            "cloudvault",
            "alice",
            "--endpoint-url",
            "http://localhost:9000",
            "--force-path-style",
            "--request-timeout-secs",
            "5",
            "--users-file",
            "/tmp/users.json",
        ])
        .unwrap();

        let s3 = config.s3_config();
        assert_eq!(s3.endpoint_url.as_deref(), Some("http://localhost:9000"));
        assert!(s3.force_path_style);
        assert_eq!(s3.request_timeout, Duration::from_secs(5));
        assert_eq!(config.users_file(), PathBuf::from("/tmp/users.json"));
    }

    #[test]
    fn test_help_warns_about_echoed_password() {
        let help = Config::command().render_long_help().to_string();
        assert!(help.contains("The prompt echoes what is typed"));
        assert!(help.contains("CLOUDVAULT_PASSWORD"));
    }
}
