//! ドキュメントフレームの抽象化
//!
//! 行の取得・属性の読み取り・遷移だけを [`Frame`] として切り出し、
//! ページ送りやデータ抽出のロジックをブラウザから独立させる。
//! 実ブラウザ向けには iframe を CDP で直接操作する [`ChromeFrame`] を用意している。

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::page::{
    CreateIsolatedWorldParams, FrameId, FrameTree, GetFrameTreeParams, NavigateParams,
};
use chromiumoxide::cdp::js_protocol::runtime::{EvaluateParams, ExecutionContextId};
use chromiumoxide::Page;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, info};

use crate::error::ScraperError;

/// フレーム探索のポーリング間隔（ミリ秒）
const FRAME_POLL_INTERVAL_MS: u64 = 100;
/// 遷移前のドキュメントに付ける目印
const STALE_MARKER: &str = "data-portal-scraper-stale";
const WORLD_NAME: &str = "portal-scraper";

/// セル内の最初のリンク
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellLink {
    pub text: String,
    pub href: Option<String>,
}

/// テーブルセル
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableCell {
    pub text: String,
    pub link: Option<CellLink>,
}

/// テーブル行（直下の `td` を順に保持）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRow {
    pub cells: Vec<TableCell>,
}

/// `select` の選択肢
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

/// 行の絞り込み条件
#[derive(Debug, Clone, Copy)]
pub struct RowQuery<'a> {
    /// 行のCSSセレクタ
    pub rows: &'a str,
    /// 行内のリンクの `href` に含まれるべき文字列
    pub link_href_contains: &'a str,
}

#[async_trait]
pub trait Frame: Send + Sync {
    /// 現在のドキュメントの絶対URL
    async fn url(&self) -> Result<String, ScraperError>;

    /// 条件に合う行を取得
    async fn query_rows(&self, query: &RowQuery<'_>) -> Result<Vec<TableRow>, ScraperError>;

    /// セレクタに一致する要素数
    async fn count(&self, selector: &str) -> Result<usize, ScraperError>;

    /// 最初に一致した要素の属性値（要素・属性がなければ `None`）
    async fn attribute(&self, selector: &str, name: &str)
        -> Result<Option<String>, ScraperError>;

    /// 最初に一致した `select` の選択肢（ラベルは前後の空白を除去）
    async fn select_options(&self, selector: &str) -> Result<Vec<SelectOption>, ScraperError>;

    /// 指定URLへ遷移して DOMContentLoaded まで待つ
    async fn goto(&mut self, url: &str) -> Result<(), ScraperError>;
}

/// 現在のドキュメントに作った隔離ワールドのコンテキスト
///
/// ドキュメントが入れ替わるとコンテキストも破棄されるので、遷移時と評価失敗時に捨てる。
#[derive(Debug, Default)]
struct WorldContext(Mutex<Option<ExecutionContextId>>);

impl WorldContext {
    fn get(&self) -> Option<ExecutionContextId> {
        self.0.lock().ok().and_then(|id| *id)
    }

    fn set(&self, id: ExecutionContextId) {
        if let Ok(mut slot) = self.0.lock() {
            *slot = Some(id);
        }
    }

    fn clear(&self) {
        if let Ok(mut slot) = self.0.lock() {
            *slot = None;
        }
    }
}

/// Chrome 上の子フレームを CDP で操作するアダプタ
pub struct ChromeFrame {
    page: Arc<Page>,
    frame_id: FrameId,
    load_timeout: Duration,
    world: WorldContext,
}

impl ChromeFrame {
    pub fn new(page: Arc<Page>, frame_id: FrameId, load_timeout: Duration) -> Self {
        Self {
            page,
            frame_id,
            load_timeout,
            world: WorldContext::default(),
        }
    }

    /// 隔離ワールドのコンテキスト（なければ作成）
    async fn context_id(&self) -> Result<ExecutionContextId, ScraperError> {
        if let Some(id) = self.world.get() {
            return Ok(id);
        }

        let mut world = CreateIsolatedWorldParams::new(self.frame_id.clone());
        world.world_name = Some(WORLD_NAME.to_string());

        let id = self
            .page
            .execute(world)
            .await
            .map_err(|e| ScraperError::JavaScript(format!("実行コンテキスト作成: {}", e)))?
            .result
            .execution_context_id;
        self.world.set(id);
        Ok(id)
    }

    /// フレーム内の隔離ワールドで式を評価
    async fn evaluate<T: DeserializeOwned>(&self, expression: &str) -> Result<T, ScraperError> {
        let result = self.evaluate_in_world(expression).await;
        if result.is_err() {
            self.world.clear();
        }
        result
    }

    async fn evaluate_in_world<T: DeserializeOwned>(
        &self,
        expression: &str,
    ) -> Result<T, ScraperError> {
        let context_id = self.context_id().await?;

        let params = EvaluateParams::builder()
            .expression(expression)
            .context_id(context_id)
            .return_by_value(true)
            .await_promise(true)
            .build()
            .map_err(ScraperError::JavaScript)?;

        let response = self
            .page
            .execute(params)
            .await
            .map_err(|e| ScraperError::JavaScript(e.to_string()))?
            .result;

        if let Some(details) = response.exception_details {
            return Err(ScraperError::JavaScript(details.text));
        }

        let value = response.result.value.unwrap_or(serde_json::Value::Null);
        Ok(serde_json::from_value(value)?)
    }

    async fn wait_loaded(&self) -> Result<(), ScraperError> {
        let start = Instant::now();
        let check = format!(
            "document.readyState !== 'loading' && !document.documentElement.hasAttribute('{}')",
            STALE_MARKER
        );

        while start.elapsed() < self.load_timeout {
            match self.evaluate::<bool>(&check).await {
                Ok(true) => {
                    debug!("Frame loaded after {:?}", start.elapsed());
                    return Ok(());
                }
                Ok(false) => {}
                // 遷移中はコンテキストが破棄されるので評価に失敗することがある
                Err(e) => debug!("Frame load check error: {}", e),
            }
            sleep(Duration::from_millis(FRAME_POLL_INTERVAL_MS)).await;
        }

        Err(ScraperError::Timeout(format!(
            "フレームが{}秒以内に読み込まれませんでした",
            self.load_timeout.as_secs()
        )))
    }
}

#[async_trait]
impl Frame for ChromeFrame {
    async fn url(&self) -> Result<String, ScraperError> {
        self.evaluate("document.location.href").await
    }

    async fn query_rows(&self, query: &RowQuery<'_>) -> Result<Vec<TableRow>, ScraperError> {
        let script = format!(
            r#"
            (() => {{
                const rows = Array.from(document.querySelectorAll({rows}));
                return rows
                    .filter(r => Array.from(r.querySelectorAll('a'))
                        .some(a => (a.getAttribute('href') || '').includes({mark})))
                    .map(r => ({{
                        cells: Array.from(r.children)
                            .filter(c => c.tagName === 'TD')
                            .map(td => {{
                                const a = td.querySelector('a');
                                return {{
                                    text: td.innerText || '',
                                    link: a ? {{ text: a.innerText || '', href: a.getAttribute('href') }} : null
                                }};
                            }})
                    }}));
            }})()
            "#,
            rows = js_string(query.rows),
            mark = js_string(query.link_href_contains),
        );
        self.evaluate(&script).await
    }

    async fn count(&self, selector: &str) -> Result<usize, ScraperError> {
        let script = format!(
            "document.querySelectorAll({}).length",
            js_string(selector)
        );
        self.evaluate(&script).await
    }

    async fn attribute(
        &self,
        selector: &str,
        name: &str,
    ) -> Result<Option<String>, ScraperError> {
        let script = format!(
            "(() => {{ const el = document.querySelector({}); return el ? el.getAttribute({}) : null; }})()",
            js_string(selector),
            js_string(name)
        );
        self.evaluate(&script).await
    }

    async fn select_options(&self, selector: &str) -> Result<Vec<SelectOption>, ScraperError> {
        let script = format!(
            r#"
            (() => {{
                const select = document.querySelector({});
                if (!select) return [];
                return Array.from(select.querySelectorAll('option'))
                    .map(o => ({{ value: o.value, label: (o.textContent || '').trim() }}));
            }})()
            "#,
            js_string(selector)
        );
        self.evaluate(&script).await
    }

    async fn goto(&mut self, url: &str) -> Result<(), ScraperError> {
        debug!("Frame navigating to {}", url);

        // 古いドキュメントの readyState を新しいものと取り違えないよう目印を付ける
        let mark = format!(
            "document.documentElement.setAttribute('{}', '1'); true",
            STALE_MARKER
        );
        if let Err(e) = self.evaluate::<bool>(&mark).await {
            debug!("Failed to mark stale document: {}", e);
        }
        self.world.clear();

        let params = NavigateParams::builder()
            .url(url)
            .frame_id(self.frame_id.clone())
            .build()
            .map_err(ScraperError::Navigation)?;

        let response = self
            .page
            .execute(params)
            .await
            .map_err(|e| ScraperError::Navigation(format!("{}: {}", url, e)))?
            .result;

        if let Some(error_text) = response.error_text {
            return Err(ScraperError::Navigation(format!("{}: {}", url, error_text)));
        }

        self.wait_loaded().await
    }
}

/// URLがパターンに一致する子フレームが現れるまで待機
pub async fn wait_for_frame(
    page: Arc<Page>,
    url_pattern: &Regex,
    timeout: Duration,
) -> Result<ChromeFrame, ScraperError> {
    info!("Waiting for frame matching {}...", url_pattern);
    let start = Instant::now();

    while start.elapsed() < timeout {
        match page.execute(GetFrameTreeParams::default()).await {
            Ok(response) => {
                let frames = child_frames(&response.result.frame_tree);
                if let Some((id, url)) = frames
                    .into_iter()
                    .find(|(_, url)| url_pattern.is_match(url))
                {
                    info!("Frame found: {}", url);
                    return Ok(ChromeFrame::new(page.clone(), id, timeout));
                }
            }
            Err(e) => debug!("Frame tree fetch error: {}", e),
        }
        sleep(Duration::from_millis(FRAME_POLL_INTERVAL_MS)).await;
    }

    Err(ScraperError::FrameNotFound(format!(
        "URLが {} に一致するフレームが現れませんでした",
        url_pattern
    )))
}

/// メインフレームを除く全フレーム（メインのURLにも一覧のパスが含まれるため）
fn child_frames(tree: &FrameTree) -> Vec<(FrameId, String)> {
    let mut frames = Vec::new();
    for child in tree.child_frames.iter().flatten() {
        frames.push((child.frame.id.clone(), child.frame.url.clone()));
        frames.extend(child_frames(child));
    }
    frames
}

/// JavaScript の文字列リテラルとして埋め込む
fn js_string(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}
