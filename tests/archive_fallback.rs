use std::io::{Cursor, Write};
use std::sync::Arc;

use mockall::predicate::eq;
use mockall::Sequence;
use rendergit::acquire::archive::{candidate_refs, ArchiveFallback};
use rendergit::contract::MockArchiveFetcher;
use rendergit::error::FetchError;
use tempfile::tempdir;

const BASE: &str = "https://codeload.example.test";

/// Build an in-memory zip shaped like a hosting-service snapshot.
fn snapshot_zip(top: &str, files: &[(&str, &str)]) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    {
        let mut zw = zip::ZipWriter::new(&mut buf);
        let opts = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);
        zw.add_directory(format!("{top}/"), opts).unwrap();
        for (name, content) in files {
            zw.start_file(format!("{top}/{name}"), opts).unwrap();
            zw.write_all(content.as_bytes()).unwrap();
        }
        zw.finish().unwrap();
    }
    buf.into_inner()
}

#[test]
fn test_candidate_refs_order_and_dedup() {
    assert_eq!(candidate_refs(None), vec!["main", "master"]);
    assert_eq!(candidate_refs(Some("")), vec!["main", "master"]);
    assert_eq!(candidate_refs(Some("dev")), vec!["dev", "main", "master"]);
    assert_eq!(candidate_refs(Some("main")), vec!["main", "master"]);
    assert_eq!(candidate_refs(Some("master")), vec!["master", "main"]);
}

#[test]
fn test_archive_url_shape() {
    let fallback = ArchiveFallback::new(
        Arc::new(MockArchiveFetcher::new()),
        "https://codeload.github.com/",
    );
    assert_eq!(
        fallback.archive_url("acme", "widgets", "main"),
        "https://codeload.github.com/acme/widgets/zip/refs/heads/main"
    );
}

#[tokio::test]
async fn test_unparseable_url_never_fetches() {
    let mut fetcher = MockArchiveFetcher::new();
    fetcher.expect_fetch().never();
    let fallback = ArchiveFallback::new(Arc::new(fetcher), BASE);

    let dest = tempdir().unwrap();
    let result = fallback
        .try_archive("https://example.com/", &dest.path().join("archive"))
        .await;
    assert!(result.is_none());
}

#[tokio::test]
async fn test_falls_through_candidates_in_order_until_one_extracts() {
    let mut fetcher = MockArchiveFetcher::new();
    let mut seq = Sequence::new();
    fetcher
        .expect_fetch()
        .with(eq(format!("{BASE}/acme/widgets/zip/refs/heads/dev")))
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Err(FetchError::Status(404)));
    fetcher
        .expect_fetch()
        .with(eq(format!("{BASE}/acme/widgets/zip/refs/heads/main")))
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| {
            Ok(snapshot_zip(
                "widgets-main",
                &[("README.md", "# widgets"), ("src/lib.rs", "pub fn w() {}")],
            ))
        });
    // `master` must not be tried once `main` succeeded.
    let fallback = ArchiveFallback::new(Arc::new(fetcher), BASE);

    let dest = tempdir().unwrap();
    let archive_dir = dest.path().join("archive");
    let dir = fallback
        .try_archive("https://github.com/acme/widgets/tree/dev", &archive_dir)
        .await
        .expect("main candidate should extract");

    assert_eq!(dir, archive_dir.join("widgets-main"));
    assert_eq!(
        std::fs::read_to_string(dir.join("README.md")).unwrap(),
        "# widgets"
    );
    assert!(dir.join("src/lib.rs").is_file());
}

#[tokio::test]
async fn test_malformed_archive_is_skipped() {
    let mut fetcher = MockArchiveFetcher::new();
    fetcher
        .expect_fetch()
        .with(eq(format!("{BASE}/acme/widgets/zip/refs/heads/main")))
        .times(1)
        .returning(|_| Ok(b"this is not a zip file".to_vec()));
    fetcher
        .expect_fetch()
        .with(eq(format!("{BASE}/acme/widgets/zip/refs/heads/master")))
        .times(1)
        .returning(|_| Ok(snapshot_zip("widgets-master", &[("a.txt", "a")])));
    let fallback = ArchiveFallback::new(Arc::new(fetcher), BASE);

    let dest = tempdir().unwrap();
    let dir = fallback
        .try_archive("https://github.com/acme/widgets.git", dest.path())
        .await
        .expect("master candidate should extract");
    assert!(dir.ends_with("widgets-master"));
    assert!(dir.join("a.txt").is_file());
}

#[tokio::test]
async fn test_all_candidates_failing_is_none() {
    let mut fetcher = MockArchiveFetcher::new();
    fetcher
        .expect_fetch()
        .times(2)
        .returning(|_| Err(FetchError::Status(404)));
    let fallback = ArchiveFallback::new(Arc::new(fetcher), BASE);

    let dest = tempdir().unwrap();
    let result = fallback
        .try_archive("https://github.com/acme/widgets", dest.path())
        .await;
    assert!(result.is_none());
}

#[tokio::test]
async fn test_archive_without_directory_is_skipped() {
    let flat = {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut zw = zip::ZipWriter::new(&mut buf);
            zw.start_file("loose.txt", zip::write::SimpleFileOptions::default())
                .unwrap();
            zw.write_all(b"loose").unwrap();
            zw.finish().unwrap();
        }
        buf.into_inner()
    };

    let mut fetcher = MockArchiveFetcher::new();
    fetcher
        .expect_fetch()
        .times(2)
        .returning(move |_| Ok(flat.clone()));
    let fallback = ArchiveFallback::new(Arc::new(fetcher), BASE);

    let dest = tempdir().unwrap();
    let result = fallback
        .try_archive("https://github.com/acme/widgets", &dest.path().join("archive"))
        .await;
    assert!(result.is_none());
}

mod http {
    use std::time::{Duration, Instant};

    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::Router;
    use rendergit::acquire::HttpArchiveFetcher;
    use rendergit::contract::ArchiveFetcher;

    use super::*;

    /// Serve a few archive endpoints on an ephemeral local port.
    async fn spawn_archive_server() -> String {
        let master = snapshot_zip("widgets-master", &[("README.md", "# from master")]);
        let app = Router::new()
            .route("/missing", get(|| async { StatusCode::NOT_FOUND }))
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(10)).await;
                    "late"
                }),
            )
            .route("/ok", get(|| async { b"archive bytes".to_vec() }))
            .route("/big", get(|| async { vec![b'x'; 4096] }))
            .route(
                "/acme/widgets/zip/refs/heads/main",
                get(|| async { StatusCode::NOT_FOUND }),
            )
            .route(
                "/acme/widgets/zip/refs/heads/master",
                get(move || {
                    let body = master.clone();
                    async move { body }
                }),
            );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_http_fetcher_status_timeout_and_size_cap() {
        let base = spawn_archive_server().await;
        let fetcher = HttpArchiveFetcher::new(Duration::from_secs(1))
            .unwrap()
            .with_max_bytes(1024);

        let ok = fetcher.fetch(&format!("{base}/ok")).await.unwrap();
        assert_eq!(ok, b"archive bytes");

        let missing = fetcher.fetch(&format!("{base}/missing")).await;
        assert!(matches!(missing, Err(FetchError::Status(404))));

        let big = fetcher.fetch(&format!("{base}/big")).await;
        assert!(matches!(big, Err(FetchError::TooLarge(1024))));

        let started = Instant::now();
        let slow = fetcher.fetch(&format!("{base}/slow")).await;
        assert!(matches!(slow, Err(FetchError::Http(_))));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_fallback_over_http_skips_404_candidate() {
        let base = spawn_archive_server().await;
        let fetcher = HttpArchiveFetcher::new(Duration::from_secs(5)).unwrap();
        let fallback = ArchiveFallback::new(Arc::new(fetcher), base);

        let dest = tempdir().unwrap();
        let dir = fallback
            .try_archive("https://github.com/acme/widgets", &dest.path().join("archive"))
            .await
            .expect("master candidate should extract");
        assert!(dir.ends_with("widgets-master"));
        assert_eq!(
            std::fs::read_to_string(dir.join("README.md")).unwrap(),
            "# from master"
        );
    }
}
