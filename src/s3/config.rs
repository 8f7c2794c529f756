use aws_sdk_s3::Client;
use aws_sdk_s3::config::Region;
use std::time::Duration;

/// Default bucket shared by every user namespace
pub const DEFAULT_BUCKET: &str = "user-files";

/// Default bound on a single storage request
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for creating the S3 backend
#[derive(Debug, Clone)]
pub struct S3Config {
    /// Bucket holding every `user-<id>-files/` namespace
    pub bucket: String,
    /// Optional custom endpoint URL (MinIO, LocalStack, ...)
    pub endpoint_url: Option<String>,
    /// Whether to use path-style addressing (required for most S3-compatible services)
    pub force_path_style: bool,
    /// Optional region override
    pub region: Option<String>,
    /// Upper bound on each individual request
    pub request_timeout: Duration,
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            bucket: DEFAULT_BUCKET.to_string(),
            endpoint_url: None,
            force_path_style: false,
            region: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// Build an SDK client from the default credential chain plus our overrides
pub async fn create_s3_client(config: &S3Config) -> Client {
    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());

    if let Some(region) = &config.region {
        loader = loader.region(Region::new(region.clone()));
    }

    let base_config = loader.load().await;
    let mut s3_config_builder = aws_sdk_s3::config::Builder::from(&base_config);

    // SDK requires some region even for custom endpoints
    if base_config.region().is_none() {
        s3_config_builder = s3_config_builder.region(Region::new("us-east-1"));
    }

    if let Some(endpoint) = &config.endpoint_url {
        s3_config_builder = s3_config_builder.endpoint_url(endpoint);
    }

    if config.force_path_style {
        s3_config_builder = s3_config_builder.force_path_style(true);
    }

    Client::from_conf(s3_config_builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = S3Config::default();
        assert_eq!(config.bucket, "user-files");
        assert_eq!(config.endpoint_url, None);
        assert!(!config.force_path_style);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }
}
