//! ブラウザ起動とページ読み込み待機

use std::time::{Duration, Instant};

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::ScraperConfig;
use crate::error::ScraperError;

/// DOM 準備完了判定のポーリング間隔（ミリ秒）
const DOM_READY_CHECK_INTERVAL_MS: u64 = 100;

/// ブラウザを起動してイベントハンドラをバックグラウンドで回す
pub async fn launch(config: &ScraperConfig) -> Result<Browser, ScraperError> {
    info!("Launching browser (headless={})...", config.headless);

    // ユニークなユーザーデータディレクトリを生成
    let unique_id = format!(
        "{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    );
    let user_data_dir = std::env::temp_dir().join(format!("portal-scraper-{}", unique_id));

    let mut builder = BrowserConfig::builder()
        .window_size(1280, 800)
        .user_data_dir(&user_data_dir)
        .request_timeout(config.timeout);

    if let Some(chrome_path) = &config.chrome_path {
        builder = builder.chrome_executable(chrome_path);
    }

    if !config.headless {
        builder = builder.with_head();
    }

    builder = builder
        .no_sandbox()
        .arg("--disable-blink-features=AutomationControlled")
        .arg("--disable-dev-shm-usage")
        .arg("--disable-gpu");

    if config.debug {
        builder = builder.arg("--enable-logging=stderr").arg("--v=1");
    }

    let browser_config = builder
        .build()
        .map_err(|e| ScraperError::BrowserInit(format!("ブラウザ設定エラー: {}", e)))?;

    let (browser, mut handler) = Browser::launch(browser_config)
        .await
        .map_err(|e| ScraperError::BrowserInit(e.to_string()))?;

    // ブラウザイベントハンドラをバックグラウンドで実行
    tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            debug!("Browser event: {:?}", event);
        }
    });

    info!("Browser launched");
    Ok(browser)
}

/// ページを開いて DOMContentLoaded まで待つ
pub async fn open(page: &Page, url: &str, timeout: Duration) -> Result<(), ScraperError> {
    debug!("Navigating to {}", url);
    page.goto(url)
        .await
        .map_err(|e| ScraperError::Navigation(format!("{}: {}", url, e)))?;
    wait_dom_ready(page, timeout).await
}

/// `document.readyState` が `loading` を抜けるまで待機
pub async fn wait_dom_ready(page: &Page, timeout: Duration) -> Result<(), ScraperError> {
    let start = Instant::now();

    while start.elapsed() < timeout {
        match page.evaluate("document.readyState").await {
            Ok(val) => {
                let state = val.into_value::<String>().unwrap_or_default();
                if is_dom_ready(&state) {
                    debug!("DOM ready ({}) after {:?}", state, start.elapsed());
                    return Ok(());
                }
            }
            Err(e) => {
                // 遷移中はコンテキストが破棄されるので評価に失敗することがある
                debug!("readyState check error: {}", e);
            }
        }
        sleep(Duration::from_millis(DOM_READY_CHECK_INTERVAL_MS)).await;
    }

    warn!("DOM ready wait timed out after {:?}", start.elapsed());
    Err(ScraperError::Timeout(format!(
        "DOMが{}秒以内に読み込まれませんでした",
        timeout.as_secs()
    )))
}

/// `interactive` 以降なら DOMContentLoaded 済み
pub(crate) fn is_dom_ready(state: &str) -> bool {
    matches!(state, "interactive" | "complete")
}
