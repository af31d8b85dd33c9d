use std::fs;
use std::path::Path;

use bundler_core::{RunStatus, Selection};
use bundler_engine::{
    run_next_queued, BlogQueueFile, ChannelProgressSink, FailurePolicy, ListError,
    NoopProgressSink, Pipeline, PipelineConfig, PipelineError,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const POSTS: [&str; 3] = ["/2021/01/alpha.html", "/2020/06/beta.html", "/2019/02/gamma.html"];

fn feed(server: &MockServer, items: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><rss version="2.0"><channel><title>Blog</title><link>{}</link><description>d</description>{items}</channel></rss>"#,
        server.uri()
    )
}

/// One feed page holding every post; any later page is empty.
async fn blog_server() -> MockServer {
    let server = MockServer::start().await;
    let items: String = POSTS
        .iter()
        .enumerate()
        .map(|(i, p)| {
            format!(
                "<item><title>Post {i}</title><link>{}{p}</link></item>",
                server.uri()
            )
        })
        .collect();
    Mock::given(method("GET"))
        .and(path("/feeds/posts/default"))
        .and(query_param("start-index", "1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(feed(&server, &items), "application/rss+xml"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/feeds/posts/default"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(feed(&server, ""), "application/rss+xml"),
        )
        .with_priority(10)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/20\d\d/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            "<html><body><div class=\"post-body\"><p>chords here</p></div></body></html>",
            "text/html; charset=utf-8",
        ))
        .mount(&server)
        .await;
    server
}

fn config(root: &Path, feed_url: String) -> PipelineConfig {
    PipelineConfig {
        feed_url,
        feed_batch_size: 50,
        page_size: 2,
        retries: 0,
        state_dir: root.join("state"),
        output_dir: root.join("out"),
        page_prefix: "part".to_string(),
        ..PipelineConfig::default()
    }
}

#[tokio::test]
async fn full_run_fetches_and_exports() {
    bundler_logging::initialize_for_tests();
    let server = blog_server().await;
    let temp = TempDir::new().unwrap();
    let pipeline = Pipeline::new(config(temp.path(), server.uri())).unwrap();
    let (sink, mut events) = ChannelProgressSink::channel();

    let report = pipeline
        .run(&Selection::All, false, &CancellationToken::new(), &sink)
        .await
        .unwrap();

    assert_eq!(report.outcome.status, RunStatus::Completed);
    assert_eq!(report.outcome.fetched, 3);
    assert_eq!(report.export.page_count, 2);
    assert_eq!(report.export.missing, 0);
    let part1 = fs::read_to_string(temp.path().join("out/part1.html")).unwrap();
    assert!(part1.contains("chords here"));
    assert!(part1.contains(&format!("{}{}", server.uri(), POSTS[0])));
    assert!(temp.path().join("out/index.html").is_file());
    assert!(temp.path().join("state/posts_cache.json").is_file());
    assert!(pipeline.status().is_complete());

    drop(sink);
    let mut seen = 0;
    while events.recv().await.is_some() {
        seen += 1;
    }
    assert!(seen > 3);
}

#[tokio::test]
async fn first_n_selection_limits_the_run() {
    let server = blog_server().await;
    let temp = TempDir::new().unwrap();
    let pipeline = Pipeline::new(config(temp.path(), server.uri())).unwrap();

    let report = pipeline
        .run(
            &Selection::First(1),
            false,
            &CancellationToken::new(),
            &NoopProgressSink,
        )
        .await
        .unwrap();

    assert_eq!(report.outcome.total, 1);
    assert_eq!(report.export.page_count, 1);
    assert_eq!(pipeline.status().selected.len(), 1);
}

#[tokio::test]
async fn unknown_links_are_rejected() {
    let server = blog_server().await;
    let temp = TempDir::new().unwrap();
    let pipeline = Pipeline::new(config(temp.path(), server.uri())).unwrap();

    let err = pipeline
        .run(
            &Selection::links_from_csv("https://nowhere.example/2020/01/x.html"),
            false,
            &CancellationToken::new(),
            &NoopProgressSink,
        )
        .await
        .expect_err("no matching links");
    assert!(matches!(err, PipelineError::Selection(_)));
}

#[tokio::test]
async fn assemble_renders_without_fetching() {
    let server = blog_server().await;
    let temp = TempDir::new().unwrap();
    let pipeline = Pipeline::new(config(temp.path(), server.uri())).unwrap();
    pipeline.list_sources(true, &NoopProgressSink).await.unwrap();

    let summary = pipeline
        .assemble(&Selection::All, &NoopProgressSink)
        .await
        .unwrap();

    assert_eq!(summary.item_count, 3);
    assert_eq!(summary.missing, 3);
    let requests = server.received_requests().await.unwrap();
    assert!(requests.iter().all(|r| r.url.path() == "/feeds/posts/default"));
}

#[tokio::test]
async fn assemble_without_cached_listing_stays_offline() {
    let server = blog_server().await;
    let temp = TempDir::new().unwrap();
    let pipeline = Pipeline::new(config(temp.path(), server.uri())).unwrap();

    let err = pipeline
        .assemble(&Selection::All, &NoopProgressSink)
        .await
        .expect_err("nothing listed yet");

    assert!(matches!(err, PipelineError::Listing(ListError::NoCache(_))));
    assert!(err.to_string().contains("run first"));
    assert!(server.received_requests().await.unwrap().is_empty());
    assert!(!temp.path().join("out/index.html").exists());
}

#[tokio::test]
async fn batch_limited_run_resumes_to_completion() {
    let server = blog_server().await;
    let temp = TempDir::new().unwrap();
    let limited = PipelineConfig {
        batch_limit: Some(2),
        ..config(temp.path(), server.uri())
    };
    let pipeline = Pipeline::new(limited).unwrap();
    let token = CancellationToken::new();

    let first = pipeline
        .run(&Selection::All, false, &token, &NoopProgressSink)
        .await
        .unwrap();
    assert_eq!(first.outcome.status, RunStatus::BatchLimited);
    assert_eq!(first.export.missing, 1);

    let second = pipeline
        .run(&Selection::All, false, &token, &NoopProgressSink)
        .await
        .unwrap();
    assert_eq!(second.outcome.status, RunStatus::Completed);
    assert_eq!(second.outcome.fetched, 1);
    assert_eq!(second.export.missing, 0);
}

#[tokio::test]
async fn queued_blog_runs_in_its_own_directory_and_is_committed() {
    let server = blog_server().await;
    let temp = TempDir::new().unwrap();
    let base = config(temp.path(), String::new());
    let queue_file = BlogQueueFile::new(base.blog_queue_path());
    assert_eq!(queue_file.add([server.uri()]).unwrap(), 1);

    let run = run_next_queued(&base, &CancellationToken::new(), &NoopProgressSink)
        .await
        .unwrap()
        .expect("one blog queued");

    assert!(run.committed);
    assert_eq!(run.slug, "127.0.0.1");
    assert!(temp.path().join("out/127.0.0.1/part1.html").is_file());
    assert!(temp.path().join("state/127.0.0.1/results.json").is_file());
    let queue = queue_file.load();
    assert!(queue.pending.is_empty());
    assert_eq!(queue.done, vec![server.uri()]);

    let idle = run_next_queued(&base, &CancellationToken::new(), &NoopProgressSink)
        .await
        .unwrap();
    assert_eq!(idle, None);
}

#[tokio::test]
async fn cancelled_queued_blog_stays_queued() {
    let server = blog_server().await;
    let temp = TempDir::new().unwrap();
    let base = config(temp.path(), String::new());
    let queue_file = BlogQueueFile::new(base.blog_queue_path());
    queue_file.add([server.uri()]).unwrap();

    let token = CancellationToken::new();
    token.cancel();
    let run = run_next_queued(&base, &token, &NoopProgressSink)
        .await
        .unwrap()
        .expect("one blog queued");

    assert_eq!(run.report.outcome.status, RunStatus::Cancelled);
    assert!(!run.committed);
    assert_eq!(queue_file.load().pending, vec![server.uri()]);
}

#[tokio::test]
async fn queued_blog_with_failures_left_for_retry_is_not_committed() {
    let server = MockServer::start().await;
    let items = format!(
        "<item><title>Good</title><link>{uri}/2021/01/good.html</link></item>\
         <item><title>Broken</title><link>{uri}/2021/01/broken.html</link></item>",
        uri = server.uri()
    );
    Mock::given(method("GET"))
        .and(path("/feeds/posts/default"))
        .and(query_param("start-index", "1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(feed(&server, &items), "application/rss+xml"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/feeds/posts/default"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(feed(&server, ""), "application/rss+xml"),
        )
        .with_priority(10)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/2021/01/good.html"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            "<html><body><div class=\"post-body\">fine</div></body></html>",
            "text/html",
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/2021/01/broken.html"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let base = PipelineConfig {
        failure_policy: FailurePolicy::RetryNextRun,
        ..config(temp.path(), String::new())
    };
    let queue_file = BlogQueueFile::new(base.blog_queue_path());
    queue_file.add([server.uri()]).unwrap();

    let run = run_next_queued(&base, &CancellationToken::new(), &NoopProgressSink)
        .await
        .unwrap()
        .expect("one blog queued");

    assert_eq!(run.report.outcome.status, RunStatus::Completed);
    assert_eq!(
        run.report.outcome.remaining,
        vec![format!("{}/2021/01/broken.html", server.uri())]
    );
    assert!(!run.committed);
    let queue = queue_file.load();
    assert_eq!(queue.pending, vec![server.uri()]);
    assert!(queue.done.is_empty());
}
