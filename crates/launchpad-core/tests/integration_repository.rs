//! Integration tests: a local HTTP server plays the Maven repository while the
//! curl-backed metadata source, fetcher and the full download queue run against it.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::repo_server::RepoServer;
use launchpad_core::artifact::RepositoryCoordinates;
use launchpad_core::control::CancelToken;
use launchpad_core::error::DownloadError;
use launchpad_core::launch::ProcessLauncher;
use launchpad_core::lockfile::LockFile;
use launchpad_core::progress::{ChannelSink, ProgressEvent};
use launchpad_core::queue::{DownloadContext, DownloadQueue, DownloadQueueEntry};
use launchpad_core::transfer::{ArtifactFetcher, CurlFetcher, FetchError};
use launchpad_core::version::{HttpMetadataSource, ResolvedVersion, VersionResolver};
use tempfile::tempdir;

const RELEASE_META: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<metadata modelVersion="1.1.0">
  <groupId>org.example.tools</groupId>
  <artifactId>editor</artifactId>
  <versioning>
    <latest>2.1.0</latest>
    <release>2.1.0</release>
    <versions>
      <version>2.0.0</version>
      <version>2.1.0</version>
    </versions>
    <lastUpdated>20240301101500</lastUpdated>
  </versioning>
</metadata>
"#;

const SNAPSHOT_META: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<metadata>
  <groupId>org.example.tools</groupId>
  <artifactId>editor</artifactId>
  <versioning>
    <latest>2.2.0-SNAPSHOT</latest>
    <versions>
      <version>2.2.0-SNAPSHOT</version>
    </versions>
  </versioning>
</metadata>
"#;

const SNAPSHOT_VERSION_META: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<metadata modelVersion="1.1.0">
  <groupId>org.example.tools</groupId>
  <artifactId>editor</artifactId>
  <version>2.2.0-SNAPSHOT</version>
  <versioning>
    <snapshot>
      <timestamp>20240305.083000</timestamp>
      <buildNumber>12</buildNumber>
    </snapshot>
    <lastUpdated>20240305083000</lastUpdated>
  </versioning>
</metadata>
"#;

const APP_PATH: &str = "/org/example/tools/editor";

fn body() -> Vec<u8> {
    (0u8..251).cycle().take(48 * 1024).collect()
}

fn coordinates(server: &RepoServer) -> RepositoryCoordinates {
    RepositoryCoordinates {
        app: "editor".to_string(),
        group_id: "org.example.tools".to_string(),
        artifact_id: "editor".to_string(),
        classifier: None,
        packaging: "jar".to_string(),
        release_repository: format!("{}/releases", server.base()),
        snapshot_repository: Some(format!("{}/snapshots/", server.base())),
    }
}

fn repository() -> RepoServer {
    RepoServer::builder()
        .route(&format!("/releases{}/maven-metadata.xml", APP_PATH), RELEASE_META)
        .route(&format!("/releases{}/2.1.0/editor-2.1.0.jar", APP_PATH), body())
        .route(&format!("/releases{}/2.0.0/editor-2.0.0.jar", APP_PATH), body())
        .route(&format!("/snapshots{}/maven-metadata.xml", APP_PATH), SNAPSHOT_META)
        .route(
            &format!("/snapshots{}/2.2.0-SNAPSHOT/maven-metadata.xml", APP_PATH),
            SNAPSHOT_VERSION_META,
        )
        .route(
            &format!(
                "/snapshots{}/2.2.0-SNAPSHOT/editor-2.2.0-20240305.083000-12.jar",
                APP_PATH
            ),
            body(),
        )
        .start()
}

fn resolver() -> VersionResolver {
    VersionResolver::new(Arc::new(HttpMetadataSource::default()))
}

#[test]
fn resolves_release_and_snapshot_over_http() {
    let server = repository();
    let coords = coordinates(&server);
    let r = resolver();

    let release = r.resolve(&coords, None, false).unwrap();
    assert_eq!(release, ResolvedVersion::release("2.1.0"));

    let snapshot = r.resolve(&coords, None, true).unwrap();
    assert_eq!(snapshot.file_version(), "2.2.0-20240305.083000-12");
    assert_eq!(
        server.hits(&format!("/snapshots{}/2.2.0-SNAPSHOT/maven-metadata.xml", APP_PATH)),
        1
    );

    let pinned = r.resolve(&coords, Some("2.0.0"), false).unwrap();
    assert_eq!(pinned.version, "2.0.0");
}

#[test]
fn missing_metadata_is_network_failure() {
    let server = RepoServer::builder().start();
    let err = resolver()
        .resolve(&coordinates(&server), None, false)
        .unwrap_err();
    assert!(matches!(err, DownloadError::NetworkFailure(_)), "{}", err);
}

#[test]
fn garbage_metadata_is_malformed() {
    let server = RepoServer::builder()
        .route(
            &format!("/releases{}/maven-metadata.xml", APP_PATH),
            "<metadata><versioning><latest>1.0",
        )
        .start();
    let err = resolver()
        .resolve(&coordinates(&server), None, false)
        .unwrap_err();
    assert!(matches!(err, DownloadError::MalformedMetadata(_)), "{}", err);
}

#[test]
fn curl_fetcher_writes_body_and_reports_progress() {
    let server = repository();
    let dir = tempdir().unwrap();
    let dest = dir.path().join("nested").join("editor-2.1.0.jar.part");
    let url = format!("{}/releases{}/2.1.0/editor-2.1.0.jar", server.base(), APP_PATH);

    let mut last = (0, 0);
    let written = CurlFetcher::default()
        .fetch(&url, &dest, &mut |done, total| last = (done, total), &CancelToken::new())
        .unwrap();
    let expected = body();
    assert_eq!(written, expected.len() as u64);
    assert_eq!(last, (written, written));
    assert_eq!(std::fs::read(&dest).unwrap(), expected);
}

#[test]
fn curl_fetcher_reports_http_status() {
    let server = repository();
    let dir = tempdir().unwrap();
    let url = format!("{}/releases{}/9.9.9/editor-9.9.9.jar", server.base(), APP_PATH);
    let err = CurlFetcher::default()
        .fetch(&url, &dir.path().join("x.part"), &mut |_, _| {}, &CancelToken::new())
        .unwrap_err();
    assert!(matches!(err, FetchError::Http(404)), "{}", err);
    assert!(matches!(DownloadError::from(err), DownloadError::NetworkFailure(_)));
}

#[test]
fn curl_fetcher_rejects_short_body() {
    let path = format!("/releases{}/2.1.0/editor-2.1.0.jar", APP_PATH);
    let server = RepoServer::builder().truncated_route(&path, body()).start();
    let dir = tempdir().unwrap();
    let err = CurlFetcher::default()
        .fetch(
            &format!("{}{}", server.base(), path),
            &dir.path().join("x.part"),
            &mut |_, _| {},
            &CancelToken::new(),
        )
        .unwrap_err();
    assert!(matches!(DownloadError::from(err), DownloadError::NetworkFailure(_)));
}

#[test]
fn curl_fetcher_honours_cancel_token() {
    let server = repository();
    let dir = tempdir().unwrap();
    let token = CancelToken::new();
    token.cancel();
    let url = format!("{}/releases{}/2.1.0/editor-2.1.0.jar", server.base(), APP_PATH);
    let err = CurlFetcher::default()
        .fetch(&url, &dir.path().join("x.part"), &mut |_, _| {}, &token)
        .unwrap_err();
    assert!(matches!(err, FetchError::Cancelled), "{}", err);
}

#[test]
fn queue_downloads_over_http() {
    let server = repository();
    let dir = tempdir().unwrap();
    let ctx = DownloadContext {
        resolver: resolver(),
        fetcher: Arc::new(CurlFetcher::default()),
        launcher: Arc::new(ProcessLauncher::new("java")),
        install_dir: dir.path().to_path_buf(),
    };
    let queue = DownloadQueue::new(ctx, 2);
    let coords = coordinates(&server);

    let (sink, events) = ChannelSink::channel();
    let sink = Arc::new(sink);
    queue.enqueue(DownloadQueueEntry::builder(coords.clone()).sink(sink.clone()).build());
    queue.enqueue(
        DownloadQueueEntry::builder(coords.clone())
            .version("2.0.0")
            .sink(sink.clone())
            .build(),
    );
    queue.enqueue(
        DownloadQueueEntry::builder(coords.clone())
            .snapshots(true)
            .sink(sink)
            .build(),
    );
    assert!(queue.wait_idle_timeout(Duration::from_secs(30)));
    assert_eq!(queue.pool_stats().spawned_total, 2);

    let events: Vec<ProgressEvent> = events.try_iter().collect();
    assert!(
        !events.iter().any(|e| matches!(e, ProgressEvent::Error(_))),
        "{:?}",
        events
    );
    assert_eq!(
        events
            .iter()
            .filter(|e| **e == ProgressEvent::InstallStarted)
            .count(),
        3
    );

    let expected = body();
    for resolved in [
        ResolvedVersion::release("2.1.0"),
        ResolvedVersion::release("2.0.0"),
    ] {
        let path = coords.local_path(dir.path(), &resolved);
        assert_eq!(std::fs::read(&path).unwrap(), expected);
        assert!(!LockFile::for_artifact(&path).is_locked());
    }
    let installed = coords.installed(dir.path()).unwrap();
    assert_eq!(installed.len(), 3);
    assert!(installed
        .iter()
        .any(|a| a.path.ends_with("editor-2.2.0-20240305.083000-12.jar")));

    // Everything is installed now: a second pass transfers nothing.
    let before = server.requests().len();
    queue.enqueue(DownloadQueueEntry::builder(coords).version("2.0.0").build());
    assert!(queue.wait_idle_timeout(Duration::from_secs(30)));
    let after: Vec<String> = server.requests()[before..].to_vec();
    assert!(after.iter().all(|p| p.ends_with("maven-metadata.xml")), "{:?}", after);
    assert_eq!(queue.pool_stats().spawned_total, 2);

    assert!(queue.shutdown().is_empty());
    assert_eq!(queue.worker_count(), 0);
}
