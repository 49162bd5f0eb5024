//! Mirror engine and job orchestration
//!
//! A job walks `Created → FetchingRoot → ExtractingReferences → Downloading
//! → Finalizing → Completed`, or ends in `Failed` when the root page cannot
//! be fetched or the output tree cannot be written. Per-asset failures never
//! fail the job; they are reported in [`MirrorResult::failed`].

use crate::client::MirrorOptions;
use crate::document::DocumentTree;
use crate::error::{FetchError, MirrorError, ResourceError};
use crate::extract::{base_elements, base_url, extract_references};
use crate::fetchers::{Fetcher, HttpFetcher};
use crate::format::format_asset;
use crate::resolve::resolve_references;
use crate::rewrite::rewrite_reference;
use crate::types::{
    CollisionPolicy, FailedReference, FetchMode, JobStatus, MirrorJob, MirrorProgress,
    MirrorResult, ResourceReference,
};
use crate::writer::AssetWriter;
use futures::stream::{self, StreamExt};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Builder for configuring the mirror engine
#[derive(Default)]
pub struct MirrorBuilder {
    options: MirrorOptions,
    fetcher: Option<Arc<dyn Fetcher>>,
}

impl MirrorBuilder {
    /// Create a new builder with default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Set custom User-Agent
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.options.user_agent = Some(ua.into());
        self
    }

    /// Limit asset tasks in flight (0 = unbounded)
    pub fn max_concurrency(mut self, limit: usize) -> Self {
        self.options.max_concurrency = limit;
        self
    }

    /// Set a per-request timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.options.request_timeout = Some(timeout);
        self
    }

    /// Set the destination collision policy
    pub fn collision_policy(mut self, policy: CollisionPolicy) -> Self {
        self.options.collision_policy = policy;
        self
    }

    /// Enable or disable stylesheet/script pretty-printing
    pub fn format_assets(mut self, enable: bool) -> Self {
        self.options.format_assets = enable;
        self
    }

    /// Use a custom fetcher instead of the HTTP fetcher
    pub fn fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Build the engine
    pub fn build(self) -> Result<Mirror, FetchError> {
        match self.fetcher {
            Some(fetcher) => Ok(Mirror::with_fetcher(fetcher, self.options)),
            None => Mirror::with_options(self.options),
        }
    }
}

/// Configured mirror engine
///
/// Cheap to clone; one engine can run any number of jobs, and job futures
/// can be spawned onto a multi-threaded runtime.
#[derive(Clone)]
pub struct Mirror {
    options: MirrorOptions,
    fetcher: Arc<dyn Fetcher>,
}

impl fmt::Debug for Mirror {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mirror")
            .field("options", &self.options)
            .field("fetcher", &self.fetcher.name())
            .finish()
    }
}

impl Mirror {
    /// Create a new engine builder
    pub fn builder() -> MirrorBuilder {
        MirrorBuilder::new()
    }

    /// Engine using the HTTP fetcher
    pub fn with_options(options: MirrorOptions) -> Result<Self, FetchError> {
        let fetcher = HttpFetcher::new(&options)?;
        Ok(Self::with_fetcher(Arc::new(fetcher), options))
    }

    /// Engine using a custom fetcher
    pub fn with_fetcher(fetcher: Arc<dyn Fetcher>, options: MirrorOptions) -> Self {
        Self { options, fetcher }
    }

    pub fn options(&self) -> &MirrorOptions {
        &self.options
    }

    /// Mirror `source_url` into `output_root`
    pub async fn run(
        &self,
        source_url: &str,
        output_root: impl AsRef<Path>,
    ) -> Result<MirrorResult, MirrorError> {
        self.run_with_status(source_url, output_root, |_| {}).await
    }

    /// Mirror `source_url` into `output_root`, reporting progress
    ///
    /// The callback fires on every state transition and once per settled
    /// asset task.
    pub async fn run_with_status<F>(
        &self,
        source_url: &str,
        output_root: impl AsRef<Path>,
        mut on_status: F,
    ) -> Result<MirrorResult, MirrorError>
    where
        F: FnMut(MirrorProgress),
    {
        let source_url = source_url.trim();
        if source_url.is_empty() {
            return Err(MirrorError::MissingUrl);
        }

        let mut job = MirrorJob::new(source_url, output_root.as_ref());
        let writer = AssetWriter::new(&job.output_root);
        info!(url = %job.source_url, output = %job.output_root.display(), "Starting mirror");

        // Root page
        on_status(transition(&mut job, JobStatus::FetchingRoot));
        let page_url = match Url::parse(&job.source_url) {
            Ok(url) => url,
            Err(_) => {
                let err = MirrorError::RootFetch(FetchError::InvalidUrlScheme {
                    url: job.source_url.clone(),
                });
                return Err(fail(&mut job, err, &mut on_status));
            }
        };
        let page = match self.fetcher.fetch(&job.source_url, FetchMode::Text).await {
            Ok(page) => page.into_text(),
            Err(e) => return Err(fail(&mut job, MirrorError::RootFetch(e), &mut on_status)),
        };

        // References
        on_status(transition(&mut job, JobStatus::ExtractingReferences));
        let mut document = DocumentTree::parse(&page);
        let base = base_url(&document, &page_url);
        let references = resolve_references(
            extract_references(&document),
            &base,
            self.options.collision_policy,
        );
        let total = references.len();
        debug!(count = total, base = %base, "Extracted references");

        // Assets
        on_status(transition(&mut job, JobStatus::Downloading).with_counts(0, total));
        if let Err(e) = writer.prepare().await {
            return Err(fail(&mut job, e, &mut on_status));
        }

        let limit = match self.options.max_concurrency {
            0 => total.max(1),
            n => n,
        };
        let mut outcomes: Vec<(usize, Result<(), ResourceError>)> = Vec::with_capacity(total);
        {
            let fetcher = Arc::clone(&self.fetcher);
            let task_writer = writer.clone();
            let pretty = self.options.format_assets;
            let mut tasks = stream::iter(references.clone().into_iter().enumerate())
                .map(move |(index, reference)| {
                    retrieve(
                        Arc::clone(&fetcher),
                        task_writer.clone(),
                        pretty,
                        index,
                        reference,
                    )
                })
                .buffer_unordered(limit);

            while let Some((index, outcome)) = tasks.next().await {
                let reference = &references[index];
                match &outcome {
                    Ok(()) => {
                        rewrite_reference(&mut document, reference);
                        debug!(url = %reference.resolved_url, path = %reference.destination_path, "Mirrored");
                    }
                    Err(e) => {
                        warn!(kind = %reference.kind, url = %reference.resolved_url, error = %e, "Resource failed");
                    }
                }
                outcomes.push((index, outcome));
                on_status(
                    MirrorProgress::new(JobStatus::Downloading)
                        .with_message(reference.resolved_url.clone())
                        .with_counts(outcomes.len(), total),
                );
            }
        }

        // Every task has settled
        on_status(transition(&mut job, JobStatus::Finalizing).with_counts(total, total));
        // Local paths must not resolve against a remote base
        for base in base_elements(&document) {
            document.remove_element(base);
        }
        let index_path = match writer.write_index(&document.serialize()).await {
            Ok(path) => path,
            Err(e) => return Err(fail(&mut job, e, &mut on_status)),
        };

        outcomes.sort_by_key(|(index, _)| *index);
        let mut succeeded = Vec::new();
        let mut failed = Vec::new();
        for (reference, (_, outcome)) in references.into_iter().zip(outcomes) {
            match outcome {
                Ok(()) => succeeded.push(reference),
                Err(e) => failed.push(FailedReference::new(reference, e)),
            }
        }

        on_status(transition(&mut job, JobStatus::Completed).with_counts(total, total));
        info!(
            url = %job.source_url,
            succeeded = succeeded.len(),
            failed = failed.len(),
            "Mirror completed"
        );

        Ok(MirrorResult {
            source_url: job.source_url,
            output_root: job.output_root,
            index_path,
            succeeded,
            failed,
        })
    }
}

/// Fetch, format and write one asset
async fn retrieve(
    fetcher: Arc<dyn Fetcher>,
    writer: AssetWriter,
    pretty: bool,
    index: usize,
    reference: ResourceReference,
) -> (usize, Result<(), ResourceError>) {
    let outcome = async {
        let fetched = fetcher
            .fetch(&reference.resolved_url, reference.kind.fetch_mode())
            .await?;
        let content = format_asset(reference.kind, fetched, pretty);
        writer.write(&reference.destination_path, &content).await?;
        Ok::<(), ResourceError>(())
    }
    .await;
    (index, outcome)
}

fn transition(job: &mut MirrorJob, status: JobStatus) -> MirrorProgress {
    debug!(from = %job.status, to = %status, "Job transition");
    job.status = status;
    MirrorProgress::new(status)
}

fn fail<F>(job: &mut MirrorJob, err: MirrorError, on_status: &mut F) -> MirrorError
where
    F: FnMut(MirrorProgress),
{
    warn!(url = %job.source_url, error = %err, "Mirror failed");
    on_status(transition(job, JobStatus::Failed).with_message(err.to_string()));
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Fetched, ResourceKind};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Serves canned bodies; unknown URLs fail with HTTP 404
    #[derive(Default)]
    struct StubFetcher {
        bodies: HashMap<String, Fetched>,
        calls: Mutex<Vec<String>>,
        delay: Option<Duration>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl StubFetcher {
        fn with(mut self, url: &str, body: Fetched) -> Self {
            self.bodies.insert(url.to_string(), body);
            self
        }

        fn text(self, url: &str, body: &str) -> Self {
            self.with(url, Fetched::Text(body.to_string()))
        }

        fn binary(self, url: &str, body: &'static [u8]) -> Self {
            self.with(url, Fetched::Binary(bytes::Bytes::from_static(body)))
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Fetcher for StubFetcher {
        fn name(&self) -> &'static str {
            "stub"
        }

        async fn fetch(&self, url: &str, _mode: FetchMode) -> Result<Fetched, FetchError> {
            self.calls.lock().unwrap().push(url.to_string());
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            self.bodies
                .get(url)
                .cloned()
                .ok_or_else(|| FetchError::HttpStatus {
                    url: url.to_string(),
                    status: 404,
                })
        }
    }

    const PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
<link rel="stylesheet" href="/css/a.css?v=1">
<script src="js/app.js"></script>
</head>
<body>
<img src="https://cdn.example/img/b.png">
<video src="/media/clip.mp4"></video>
</body>
</html>"#;

    fn site() -> StubFetcher {
        StubFetcher::default()
            .text("https://example.com/", PAGE)
            .text("https://example.com/css/a.css?v=1", "body{margin:0}")
            .text("https://example.com/js/app.js", "run();")
            .binary("https://example.com/media/clip.mp4", b"\x00\x00\x00\x18ftyp")
    }

    fn engine(fetcher: Arc<StubFetcher>) -> Mirror {
        Mirror::builder().fetcher(fetcher).build().unwrap()
    }

    #[test]
    fn test_builder() {
        let mirror = Mirror::builder()
            .user_agent("TestAgent/1.0")
            .max_concurrency(4)
            .request_timeout(Duration::from_secs(5))
            .collision_policy(CollisionPolicy::Overwrite)
            .format_assets(false)
            .build()
            .unwrap();

        let options = mirror.options();
        assert_eq!(options.user_agent, Some("TestAgent/1.0".to_string()));
        assert_eq!(options.max_concurrency, 4);
        assert_eq!(options.request_timeout, Some(Duration::from_secs(5)));
        assert_eq!(options.collision_policy, CollisionPolicy::Overwrite);
        assert!(!options.format_assets);
    }

    #[tokio::test]
    async fn test_partial_failure_is_contained() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(site());

        let result = engine(fetcher.clone())
            .run("https://example.com/", dir.path())
            .await
            .unwrap();

        assert_eq!(result.total(), 4);
        assert_eq!(result.succeeded.len(), 3);
        assert_eq!(result.failed.len(), 1);
        assert!(!result.is_complete());
        assert_eq!(
            result.failed[0].reference.resolved_url,
            "https://cdn.example/img/b.png"
        );
        assert!(result.failed[0].reason.contains("404"));

        let html = std::fs::read_to_string(dir.path().join("index.html")).unwrap();
        assert!(html.contains(r#"href="css/a.css""#));
        assert!(html.contains(r#"src="js/app.js""#));
        assert!(html.contains(r#"src="videos/clip.mp4""#));
        assert!(html.contains(r#"src="https://cdn.example/img/b.png""#));

        assert_eq!(
            std::fs::read_to_string(dir.path().join("css/a.css")).unwrap(),
            "body {\n  margin: 0\n}\n"
        );
        assert!(!dir.path().join("images/b.png").exists());
    }

    #[tokio::test]
    async fn test_every_reference_dispatched_once() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(site());

        engine(fetcher.clone())
            .run("https://example.com/", dir.path())
            .await
            .unwrap();

        let mut calls = fetcher.calls();
        calls.sort();
        assert_eq!(
            calls,
            vec![
                "https://cdn.example/img/b.png",
                "https://example.com/",
                "https://example.com/css/a.css?v=1",
                "https://example.com/js/app.js",
                "https://example.com/media/clip.mp4",
            ]
        );
    }

    #[tokio::test]
    async fn test_results_in_document_order() {
        let dir = tempfile::tempdir().unwrap();
        let result = engine(Arc::new(site()))
            .run("https://example.com/", dir.path())
            .await
            .unwrap();

        let kinds: Vec<_> = result.succeeded.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ResourceKind::Stylesheet,
                ResourceKind::Script,
                ResourceKind::Video
            ]
        );
    }

    #[tokio::test]
    async fn test_status_transitions() {
        let dir = tempfile::tempdir().unwrap();
        let mut seen = Vec::new();

        engine(Arc::new(site()))
            .run_with_status("https://example.com/", dir.path(), |p| seen.push(p))
            .await
            .unwrap();

        let mut statuses: Vec<JobStatus> = seen.iter().map(|p| p.status).collect();
        statuses.dedup();
        assert_eq!(
            statuses,
            vec![
                JobStatus::FetchingRoot,
                JobStatus::ExtractingReferences,
                JobStatus::Downloading,
                JobStatus::Finalizing,
                JobStatus::Completed,
            ]
        );

        let settled: Vec<usize> = seen
            .iter()
            .filter(|p| p.status == JobStatus::Downloading && p.message.is_some())
            .map(|p| p.settled)
            .collect();
        assert_eq!(settled, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_root_failure_is_fatal_and_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("output");
        let mut last = None;

        let result = engine(Arc::new(StubFetcher::default()))
            .run_with_status("https://example.com/", &root, |p| last = Some(p.status))
            .await;

        assert!(matches!(
            result,
            Err(MirrorError::RootFetch(FetchError::HttpStatus { status: 404, .. }))
        ));
        assert_eq!(last, Some(JobStatus::Failed));
        assert!(!root.exists());
    }

    #[tokio::test]
    async fn test_all_asset_directories_exist() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = StubFetcher::default().text("https://example.com/", "<html></html>");

        let result = engine(Arc::new(fetcher))
            .run("https://example.com/", dir.path())
            .await
            .unwrap();

        assert_eq!(result.total(), 0);
        for sub in ["css", "js", "images", "videos"] {
            assert!(dir.path().join(sub).is_dir());
        }
        assert!(dir.path().join("index.html").is_file());
    }

    #[tokio::test]
    async fn test_colliding_names_get_suffixes() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = StubFetcher::default()
            .text(
                "https://example.com/",
                r#"<html><head><script src="/a/app.js"></script><script src="/b/app.js"></script></head></html>"#,
            )
            .text("https://example.com/a/app.js", "a();")
            .text("https://example.com/b/app.js", "b();");

        let result = engine(Arc::new(fetcher))
            .run("https://example.com/", dir.path())
            .await
            .unwrap();

        let paths: Vec<_> = result
            .succeeded
            .iter()
            .map(|r| r.destination_path.as_str())
            .collect();
        assert_eq!(paths, vec!["js/app.js", "js/app-1.js"]);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("js/app-1.js")).unwrap(),
            "b();\n"
        );
    }

    #[tokio::test]
    async fn test_concurrency_ceiling() {
        let dir = tempfile::tempdir().unwrap();
        let mut page = String::from("<html><body>");
        let mut fetcher = StubFetcher {
            delay: Some(Duration::from_millis(20)),
            ..Default::default()
        };
        for i in 0..8 {
            page.push_str(&format!(r#"<img src="/i{i}.png">"#));
            fetcher = fetcher.binary(&format!("https://example.com/i{i}.png"), b"png");
        }
        page.push_str("</body></html>");
        let fetcher = Arc::new(fetcher.text("https://example.com/", &page));

        let result = Mirror::builder()
            .fetcher(fetcher.clone())
            .max_concurrency(2)
            .build()
            .unwrap()
            .run("https://example.com/", dir.path())
            .await
            .unwrap();

        assert_eq!(result.succeeded.len(), 8);
        assert!(fetcher.max_in_flight.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_rewritten_xor_failed() {
        let dir = tempfile::tempdir().unwrap();
        let result = engine(Arc::new(site()))
            .run("https://example.com/", dir.path())
            .await
            .unwrap();

        let html = std::fs::read_to_string(&result.index_path).unwrap();
        for reference in &result.succeeded {
            assert!(html.contains(&format!("\"{}\"", reference.destination_path)));
            assert!(dir.path().join(&reference.destination_path).is_file());
        }
        for failed in &result.failed {
            assert!(html.contains(&format!("\"{}\"", failed.reference.original_value)));
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_job_can_be_spawned() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        let engine = engine(Arc::new(site()));

        let handle = tokio::spawn(async move { engine.run("https://example.com/", root).await });
        let result = handle.await.unwrap().unwrap();

        assert_eq!(result.succeeded.len(), 3);
        assert!(dir.path().join("index.html").is_file());
    }

    #[tokio::test]
    async fn test_write_failure_is_recorded_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the stylesheet file should go
        std::fs::create_dir_all(dir.path().join("css/a.css")).unwrap();

        let result = engine(Arc::new(site()))
            .run("https://example.com/", dir.path())
            .await
            .unwrap();

        let write_failures: Vec<_> = result
            .failed
            .iter()
            .filter(|f| matches!(f.error, ResourceError::Write { .. }))
            .collect();
        assert_eq!(write_failures.len(), 1);
        assert_eq!(write_failures[0].reference.kind, ResourceKind::Stylesheet);
        assert_eq!(result.succeeded.len(), 2);

        let html = std::fs::read_to_string(&result.index_path).unwrap();
        assert!(html.contains(r#"href="/css/a.css?v=1""#));
        assert!(html.contains(r#"src="js/app.js""#));
        assert!(html.contains(r#"src="videos/clip.mp4""#));
    }

    #[tokio::test]
    async fn test_unwritable_output_root_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("taken");
        std::fs::write(&root, b"").unwrap();
        let mut last = None;

        let result = engine(Arc::new(site()))
            .run_with_status("https://example.com/", &root, |p| last = Some(p.status))
            .await;

        match result {
            Err(MirrorError::Io { path, .. }) => assert!(path.starts_with(&root)),
            other => panic!("expected output error, got {other:?}"),
        }
        assert_eq!(last, Some(JobStatus::Failed));
    }

    #[tokio::test]
    async fn test_unwritable_index_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("index.html")).unwrap();

        let result = engine(Arc::new(site()))
            .run("https://example.com/", dir.path())
            .await;

        match result {
            Err(MirrorError::Io { path, .. }) => {
                assert_eq!(path, dir.path().join("index.html"))
            }
            other => panic!("expected output error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_base_element_is_dropped_from_index() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = StubFetcher::default()
            .text(
                "https://example.com/",
                r#"<html><head><base href="https://cdn.example/static/"></head><body><img src="logo.svg"></body></html>"#,
            )
            .binary("https://cdn.example/static/logo.svg", b"<svg/>");

        let result = engine(Arc::new(fetcher))
            .run("https://example.com/", dir.path())
            .await
            .unwrap();

        assert!(result.is_complete());
        let html = std::fs::read_to_string(&result.index_path).unwrap();
        assert!(!html.contains("<base"));
        assert!(html.contains(r#"src="images/logo.svg""#));
    }
}
