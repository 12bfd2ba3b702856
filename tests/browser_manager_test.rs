mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use common::{FakeLauncher, fast_browser_settings};
use websearch_relay::{BrowserError, BrowserManager, PageRenderer, RenderMode};

const TIMEOUT: Duration = Duration::from_secs(5);

fn manager(launcher: FakeLauncher) -> Arc<BrowserManager<FakeLauncher>> {
    Arc::new(BrowserManager::with_launcher(launcher, &fast_browser_settings()))
}

#[tokio::test]
async fn nothing_is_launched_until_first_render() {
    let launcher = FakeLauncher::new();
    let manager = manager(launcher.clone());

    assert_eq!(manager.launch_count(), 0);
    assert!(!manager.is_running().await);

    let page = manager
        .render("https://example.com/", RenderMode::Html, TIMEOUT, &CancellationToken::new())
        .await
        .expect("render succeeds");

    assert!(page.content.contains("served https://example.com/"));
    assert_eq!(manager.launch_count(), 1);
    assert!(manager.is_running().await);
    assert_eq!(manager.open_tab_count(), 0);
}

#[tokio::test]
async fn concurrent_renders_share_one_launch_and_stay_isolated() {
    let launcher = FakeLauncher::new().with_navigate_delay(Duration::from_millis(20));
    let manager = manager(launcher.clone());
    let cancel = CancellationToken::new();

    let handles: Vec<_> = (0..10)
        .map(|i| {
            let manager = Arc::clone(&manager);
            let cancel = cancel.clone();
            tokio::spawn(async move {
                let url = format!("https://site{i}.example/");
                let page = manager
                    .render(&url, RenderMode::Html, TIMEOUT, &cancel)
                    .await
                    .expect("render succeeds");
                (url, page)
            })
        })
        .collect();

    for handle in handles {
        let (url, page) = handle.await.expect("task completes");
        assert_eq!(page.url, url);
        assert!(page.content.contains(&format!("served {url}")));
    }

    assert_eq!(manager.launch_count(), 1);
    assert_eq!(launcher.stats.tabs_opened.load(Ordering::SeqCst), 10);
    assert_eq!(launcher.stats.tabs_closed.load(Ordering::SeqCst), 10);
    assert_eq!(manager.open_tab_count(), 0);
}

#[tokio::test]
async fn cancellation_returns_quickly_and_closes_the_tab() {
    let launcher = FakeLauncher::new().with_navigate_delay(Duration::from_secs(30));
    let manager = manager(launcher.clone());

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let started = tokio::time::Instant::now();
    let result = manager
        .render("https://slow.example/", RenderMode::Html, TIMEOUT, &cancel)
        .await;

    assert!(matches!(result, Err(BrowserError::Cancelled)));
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(manager.open_tab_count(), 0);
    assert_eq!(
        launcher.stats.tabs_opened.load(Ordering::SeqCst),
        launcher.stats.tabs_closed.load(Ordering::SeqCst)
    );
}

#[tokio::test]
async fn already_cancelled_token_never_launches() {
    let manager = manager(FakeLauncher::new());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = manager
        .render("https://example.com/", RenderMode::Text, TIMEOUT, &cancel)
        .await;

    assert!(matches!(result, Err(BrowserError::Cancelled)));
    assert_eq!(manager.launch_count(), 0);
}

#[tokio::test]
async fn timeout_releases_the_tab_and_keeps_the_session() {
    let launcher = FakeLauncher::new().with_navigate_delay(Duration::from_secs(30));
    let manager = manager(launcher.clone());

    let result = manager
        .render(
            "https://slow.example/",
            RenderMode::Html,
            Duration::from_millis(100),
            &CancellationToken::new(),
        )
        .await;

    match result {
        Err(BrowserError::Timeout { url, timeout }) => {
            assert_eq!(url, "https://slow.example/");
            assert_eq!(timeout, Duration::from_millis(100));
        }
        other => panic!("expected timeout, got {other:?}"),
    }
    assert_eq!(manager.open_tab_count(), 0);
    assert!(manager.is_running().await);
}

#[tokio::test]
async fn defunct_session_is_rebuilt_on_next_render() {
    let launcher = FakeLauncher::new();
    let manager = manager(launcher.clone());
    let cancel = CancellationToken::new();

    let first = manager
        .render("https://a.example/", RenderMode::Html, TIMEOUT, &cancel)
        .await
        .expect("first render");
    assert!(first.content.contains("session 1"));

    launcher.kill_current_session();
    assert!(!manager.is_running().await);

    let second = manager
        .render("https://b.example/", RenderMode::Html, TIMEOUT, &cancel)
        .await
        .expect("render after rebuild");

    assert!(second.content.contains("session 2"));
    assert_eq!(manager.launch_count(), 2);
    assert_eq!(launcher.stats.sessions_shut_down.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn shutdown_is_idempotent_and_relaunches_lazily() {
    let launcher = FakeLauncher::new();
    let manager = manager(launcher.clone());
    let cancel = CancellationToken::new();

    manager
        .render("https://a.example/", RenderMode::Html, TIMEOUT, &cancel)
        .await
        .expect("render");

    manager.shutdown().await;
    manager.shutdown().await;
    assert_eq!(launcher.stats.sessions_shut_down.load(Ordering::SeqCst), 1);
    assert!(!manager.is_running().await);

    manager
        .render("https://b.example/", RenderMode::Html, TIMEOUT, &cancel)
        .await
        .expect("render after shutdown");
    assert_eq!(manager.launch_count(), 2);
}
