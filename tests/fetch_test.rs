mod common;

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use common::{FakeLauncher, FakeRenderer, Reply, fast_browser_settings};
use websearch_relay::tools::FetchPageArgs;
use websearch_relay::{
    BrowserError, BrowserManager, FetchError, FetchPageTool, FetchSettings, PageFetcher, Tool,
    ToolError, ToolEvent, ToolEventBus,
};

const ARTICLE_URL: &str = "https://blog.example/post";

fn long_article(chars: usize) -> String {
    format!(
        "<html><head><title>Long read</title><script>var tracking = 1;</script></head>\
         <body><nav>Home | About</nav><p>{}</p><footer>© example</footer></body></html>",
        "a".repeat(chars)
    )
}

fn fetcher(renderer: Arc<FakeRenderer>) -> PageFetcher {
    PageFetcher::new(renderer, FetchSettings::default())
}

#[tokio::test]
async fn long_pages_are_truncated_to_the_default_length() {
    let renderer = Arc::new(FakeRenderer::new().page(ARTICLE_URL, long_article(8000)));

    let page = fetcher(renderer)
        .fetch(ARTICLE_URL, None, &CancellationToken::new())
        .await
        .expect("fetch succeeds");

    assert_eq!(page.url, ARTICLE_URL);
    assert_eq!(page.title, "Long read");
    assert_eq!(page.content.chars().count(), 5000);
    assert!(page.has_more);
    assert_eq!(page.total_length, 8000);
}

#[tokio::test]
async fn explicit_max_length_wins_and_short_pages_are_whole() {
    let renderer = Arc::new(FakeRenderer::new().page(ARTICLE_URL, long_article(300)));
    let fetcher = fetcher(renderer);
    let cancel = CancellationToken::new();

    let page = fetcher
        .fetch(ARTICLE_URL, Some(100), &cancel)
        .await
        .expect("fetch succeeds");
    assert_eq!(page.content.len(), 100);
    assert!(page.has_more);

    let page = fetcher
        .fetch(ARTICLE_URL, Some(1000), &cancel)
        .await
        .expect("fetch succeeds");
    assert_eq!(page.content, "a".repeat(300));
    assert!(!page.has_more);
    assert_eq!(page.total_length, 300);
}

#[tokio::test]
async fn readable_text_drops_chrome_and_keeps_paragraphs() {
    let html = "<html><head><title>Doc</title><style>p { color: red }</style></head><body>\
                <header>Site header</header><script>alert(1)</script>\
                <p>First paragraph.</p><p>Second   paragraph.</p>\
                <aside>Related links</aside></body></html>";
    let renderer = Arc::new(FakeRenderer::new().page(ARTICLE_URL, html));

    let page = fetcher(renderer)
        .fetch(ARTICLE_URL, None, &CancellationToken::new())
        .await
        .expect("fetch succeeds");

    assert_eq!(page.content, "First paragraph.\n\nSecond paragraph.");
    assert!(!page.has_more);
}

#[tokio::test]
async fn invalid_urls_never_reach_the_browser() {
    let renderer = Arc::new(FakeRenderer::new());
    let fetcher = fetcher(renderer.clone());
    let cancel = CancellationToken::new();

    assert!(matches!(
        fetcher.fetch("   ", None, &cancel).await,
        Err(FetchError::EmptyUrl)
    ));
    assert!(matches!(
        fetcher.fetch("ftp://files.example/a", None, &cancel).await,
        Err(FetchError::InvalidUrl(_))
    ));
    assert!(matches!(
        fetcher.fetch("not a url", None, &cancel).await,
        Err(FetchError::InvalidUrl(_))
    ));
    assert!(renderer.calls().is_empty());
}

#[tokio::test]
async fn render_failures_are_reported_with_their_cause() {
    let renderer = Arc::new(FakeRenderer::new().route(
        ARTICLE_URL,
        vec![Reply::Fail(BrowserError::Navigation {
            url: ARTICLE_URL.to_string(),
            message: "net::ERR_NAME_NOT_RESOLVED".to_string(),
        })],
    ));

    let err = fetcher(renderer)
        .fetch(ARTICLE_URL, None, &CancellationToken::new())
        .await
        .expect_err("navigation fails");

    assert!(matches!(err, FetchError::Render(BrowserError::Navigation { .. })));
    assert!(err.to_string().contains("ERR_NAME_NOT_RESOLVED"));
}

#[tokio::test]
async fn fetch_through_the_shared_browser_closes_its_tab() {
    let launcher = FakeLauncher::new();
    let manager = Arc::new(BrowserManager::with_launcher(
        launcher.clone(),
        &fast_browser_settings(),
    ));
    let fetcher = PageFetcher::new(manager.clone(), FetchSettings::default());

    let page = fetcher
        .fetch(ARTICLE_URL, None, &CancellationToken::new())
        .await
        .expect("fetch succeeds");

    assert_eq!(page.title, ARTICLE_URL);
    assert_eq!(page.content, format!("session 1 served {ARTICLE_URL}"));
    assert_eq!(manager.open_tab_count(), 0);
}

#[tokio::test]
async fn fetch_tool_reports_progress_and_errors() {
    let renderer = Arc::new(FakeRenderer::new().page(ARTICLE_URL, long_article(8000)));
    let events = Arc::new(ToolEventBus::new(16));
    let mut rx = events.subscribe();
    let tool = FetchPageTool::new(Arc::new(fetcher(renderer)), events.clone());
    let cancel = CancellationToken::new();

    let value = tool
        .call(json!({ "url": ARTICLE_URL, "max_length": 2000 }), &cancel)
        .await
        .expect("fetch succeeds");
    assert_eq!(value["has_more"], true);
    assert_eq!(value["total_length"], 8000);

    assert!(matches!(rx.recv().await, Ok(ToolEvent::Started { .. })));
    match rx.recv().await {
        Ok(ToolEvent::Finished { description, error, .. }) => {
            assert_eq!(description, "returned 2000 of 8000 characters");
            assert!(error.is_none());
        }
        other => panic!("unexpected event: {other:?}"),
    }

    let err = tool
        .execute(
            FetchPageArgs {
                url: "mailto:someone@example.com".to_string(),
                max_length: None,
            },
            &cancel,
        )
        .await
        .expect_err("not an http url");
    assert!(matches!(err, ToolError::InvalidArguments(_)));

    assert!(matches!(rx.recv().await, Ok(ToolEvent::Started { .. })));
    assert!(matches!(
        rx.recv().await,
        Ok(ToolEvent::Finished { error: Some(_), .. })
    ));
}

#[tokio::test]
async fn cancelled_fetch_surfaces_cancellation() {
    let launcher = FakeLauncher::new().with_navigate_delay(Duration::from_secs(30));
    let manager = Arc::new(BrowserManager::with_launcher(launcher, &fast_browser_settings()));
    let fetcher = PageFetcher::new(manager.clone(), FetchSettings::default());

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let err = tokio::time::timeout(Duration::from_secs(2), fetcher.fetch(ARTICLE_URL, None, &cancel))
        .await
        .expect("fetch unwinds after cancellation")
        .expect_err("cancelled");

    assert!(matches!(err, FetchError::Render(BrowserError::Cancelled)));
    assert_eq!(manager.open_tab_count(), 0);
}
