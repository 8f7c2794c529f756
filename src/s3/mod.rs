pub mod client;
pub mod config;
pub mod metrics;

pub use client::S3Backend;
pub use config::{S3Config, create_s3_client};
pub use metrics::{OperationStats, StorageMetrics};
