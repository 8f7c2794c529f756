use std::io::{Cursor, Read};
use std::sync::Arc;

use cloudvault::FsError;
use cloudvault::auth::AuthenticatedUser;
use cloudvault::s3::{S3Backend, S3Config};
use cloudvault::service::{ResourceService, UploadFile};
use cloudvault::shell::ShellState;
use cloudvault::storage::StorageBackend;
use cloudvault::vfs::path::user_root_prefix;
use cloudvault::vfs::{ResourceKind, UserId};

/// Test bucket name
const TEST_BUCKET: &str = "cloudvault-test";

/// Backend pointing at LocalStack (or any endpoint in AWS_ENDPOINT_URL)
async fn create_localstack_backend() -> Arc<S3Backend> {
    let endpoint_url =
        std::env::var("AWS_ENDPOINT_URL").unwrap_or_else(|_| "http://localhost:4566".to_string());

    let config = S3Config {
        bucket: TEST_BUCKET.to_string(),
        endpoint_url: Some(endpoint_url),
        force_path_style: true, // Required for LocalStack
        region: Some("us-east-1".to_string()),
        ..S3Config::default()
    };

    let backend = S3Backend::new(config).await;
    backend
        .ensure_bucket()
        .await
        .expect("Failed to reach Localstack S3. Is it running on localhost:4566?");
    Arc::new(backend)
}

/// Fresh, empty namespace for `user`, wiping leftovers from earlier runs
async fn setup_user(backend: &Arc<S3Backend>, user: UserId) -> ResourceService {
    let root = user_root_prefix(user);
    let leftovers: Vec<String> = backend
        .list(&root, true)
        .await
        .expect("Failed to list namespace")
        .into_iter()
        .map(|entry| entry.key)
        .collect();
    if !leftovers.is_empty() {
        let failed = backend.delete_batch(&leftovers).await.unwrap();
        assert!(failed.is_empty(), "cleanup failed: {failed:?}");
    }

    let resources = ResourceService::new(backend.clone());
    resources
        .directories()
        .create_root_directory(user)
        .await
        .expect("Failed to create root directory");
    resources
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored --test-threads=1
async fn test_directory_lifecycle() {
    let backend = create_localstack_backend().await;
    let user = UserId(9001);
    let resources = setup_user(&backend, user).await;
    let directories = resources.directories();

    let docs = directories.create_directory("docs", user).await.unwrap();
    assert_eq!(docs.name, "docs/");
    assert!(matches!(
        directories.create_directory("docs", user).await,
        Err(FsError::AlreadyExists(_))
    ));

    resources
        .upload_resources(
            "docs",
            vec![UploadFile::new("a.txt", "0123456789")],
            user,
        )
        .await
        .unwrap();

    let listed = directories.list_directory("docs/", user).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, "a.txt");
    assert_eq!(listed[0].size, Some(10));

    let moved = resources
        .move_or_rename("docs/a.txt", "docs/b.txt", user)
        .await
        .unwrap();
    assert_eq!(moved.relative_path(), "docs/b.txt");
    assert!(matches!(
        resources.get_resource("docs/a.txt", user).await,
        Err(FsError::NotFound(_))
    ));

    resources.delete_resource("docs/", user).await.unwrap();
    assert!(
        directories
            .list_directory("", user)
            .await
            .unwrap()
            .is_empty()
    );
    assert!(backend.metrics().request_count() > 0);
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored --test-threads=1
async fn test_move_directory_and_download_zip() {
    let backend = create_localstack_backend().await;
    let user = UserId(9002);
    let resources = setup_user(&backend, user).await;

    resources
        .upload_resources(
            "a",
            vec![
                UploadFile::new("x.txt", "x content"),
                UploadFile::new("y/z.txt", "z content"),
            ],
            user,
        )
        .await
        .unwrap();

    let moved = resources.move_or_rename("a/", "b/", user).await.unwrap();
    assert_eq!(moved.kind, ResourceKind::Directory);
    assert!(
        backend
            .list(&format!("{}a/", user_root_prefix(user)), true)
            .await
            .unwrap()
            .is_empty()
    );

    let mut body = Vec::new();
    resources
        .download_resource("b/", user, &mut body)
        .await
        .unwrap();

    let mut archive = zip::ZipArchive::new(Cursor::new(body)).unwrap();
    let mut content = String::new();
    archive
        .by_name("y/z.txt")
        .unwrap()
        .read_to_string(&mut content)
        .unwrap();
    assert_eq!(content, "z content");
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored --test-threads=1
async fn test_search() {
    let backend = create_localstack_backend().await;
    let user = UserId(9003);
    let resources = setup_user(&backend, user).await;

    resources
        .upload_resources(
            "",
            vec![
                UploadFile::new("2024/q1-report.pdf", "pdf"),
                UploadFile::new("notes.txt", "notes"),
            ],
            user,
        )
        .await
        .unwrap();

    let found = resources.search("report", user).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].relative_path(), "2024/q1-report.pdf");
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored --test-threads=1
async fn test_shell_commands() {
    let backend = create_localstack_backend().await;
    let user = UserId(9004);
    let resources = setup_user(&backend, user).await;

    let mut shell = ShellState::new(
        AuthenticatedUser {
            id: user,
            username: "tester".to_string(),
        },
        resources.clone(),
    )
    .with_metrics(Arc::clone(backend.metrics()));

    shell.execute("mkdir docs").await.expect("mkdir failed");
    shell.execute("cd docs").await.expect("cd failed");
    assert_eq!(shell.current_dir().to_string(), "/docs");

    shell.execute("mkdir inner").await.expect("nested mkdir failed");
    shell.execute("ls -l").await.expect("ls failed");
    shell.execute("stats").await.expect("stats failed");
    shell.execute("cd ..").await.expect("cd .. failed");
    shell.execute("mv docs/ archive/").await.expect("mv failed");

    let listed = resources
        .directories()
        .list_directory("archive/", user)
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, "inner/");
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored --test-threads=1
async fn test_move_names_needing_escapes() {
    let backend = create_localstack_backend().await;
    let user = UserId(9005);
    let resources = setup_user(&backend, user).await;

    resources
        .upload_resources(
            "my docs",
            vec![
                UploadFile::new("a+b 100%.txt", "plus"),
                UploadFile::new("résumé.pdf", "accent"),
            ],
            user,
        )
        .await
        .unwrap();

    let moved = resources
        .move_or_rename("my docs/a+b 100%.txt", "my docs/c&d #1.txt", user)
        .await
        .unwrap();
    assert_eq!(moved.relative_path(), "my docs/c&d #1.txt");
    assert_eq!(moved.size, Some(4));

    resources
        .move_or_rename("my docs/", "archivé/", user)
        .await
        .unwrap();

    let mut names: Vec<String> = resources
        .directories()
        .list_directory("archivé/", user)
        .await
        .unwrap()
        .into_iter()
        .map(|entry| entry.name)
        .collect();
    names.sort();
    assert_eq!(names, vec!["c&d #1.txt", "résumé.pdf"]);
    assert!(matches!(
        resources.get_resource("my docs/", user).await,
        Err(FsError::NotFound(_))
    ));
}
