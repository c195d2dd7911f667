use std::collections::BTreeMap;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::task::{Context, Poll};

use tower::Service;
use tracing::{debug, error, info};

use crate::config::ScraperConfig;
use crate::error::ScraperError;
use crate::portal::PortalScraper;
use crate::projects::ProjectsScraper;
use crate::results::{RunResults, PORTAL_TEST_NAME, PROJECTS_TEST_NAME};
use crate::traits::Scraper;

/// 収集リクエスト
#[derive(Debug, Clone)]
pub struct ReportRequest {
    pub username: String,
    pub password: String,
    pub researcher_id: Option<String>,
    pub results_path: PathBuf,
    pub headless: bool,
}

impl ReportRequest {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            researcher_id: None,
            results_path: PathBuf::from(crate::config::DEFAULT_RESULTS_PATH),
            headless: true,
        }
    }

    pub fn with_researcher_id(mut self, id: impl Into<String>) -> Self {
        self.researcher_id = Some(id.into());
        self
    }

    pub fn with_results_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.results_path = path.into();
        self
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }
}

impl From<ReportRequest> for ScraperConfig {
    fn from(req: ReportRequest) -> Self {
        let mut config = ScraperConfig::new(req.username, req.password)
            .with_results_path(req.results_path)
            .with_headless(req.headless);
        if let Some(id) = req.researcher_id {
            config = config.with_researcher_id(id);
        }
        config
    }
}

/// 収集結果
#[derive(Debug)]
pub struct Report {
    pub results_path: PathBuf,
    pub results: RunResults,
    /// 失敗したジョブ名とエラー内容
    pub failures: BTreeMap<String, String>,
}

impl Report {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// ポータルとdiawebの両方を収集して結果ファイルに書き出す
///
/// 片方のジョブが失敗しても、もう片方の結果は保存する。
pub async fn run_report(config: ScraperConfig) -> Result<Report, ScraperError> {
    let mut results = RunResults::new();
    let mut failures = BTreeMap::new();

    let mut portal = PortalScraper::new(config.clone());
    match portal.execute().await {
        Ok(stats) => results.add(PORTAL_TEST_NAME, &stats)?,
        Err(e) => {
            error!("{} failed: {}", PORTAL_TEST_NAME, e);
            close_after_failure(&mut portal, PORTAL_TEST_NAME).await;
            failures.insert(PORTAL_TEST_NAME.to_string(), e.to_string());
        }
    }

    let mut projects = ProjectsScraper::new(config.clone());
    match projects.execute().await {
        Ok(courses) => results.add(PROJECTS_TEST_NAME, &courses)?,
        Err(e) => {
            error!("{} failed: {}", PROJECTS_TEST_NAME, e);
            close_after_failure(&mut projects, PROJECTS_TEST_NAME).await;
            failures.insert(PROJECTS_TEST_NAME.to_string(), e.to_string());
        }
    }

    results.save(&config.results_path)?;
    Ok(Report {
        results_path: config.results_path,
        results,
        failures,
    })
}

/// 失敗したジョブのブラウザを閉じる（閉じられなくても結果の保存は続ける）
async fn close_after_failure<S: Scraper>(scraper: &mut S, name: &str) -> bool {
    match scraper.close().await {
        Ok(()) => true,
        Err(e) => {
            debug!("Failed to close {} after failure: {}", name, e);
            false
        }
    }
}

/// tower::Serviceを実装したレポートサービス
#[derive(Debug, Clone, Default)]
pub struct ReportService {}

impl ReportService {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Service<ReportRequest> for ReportService {
    type Response = Report;
    type Error = ScraperError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: ReportRequest) -> Self::Future {
        info!("レポートリクエスト受信: user={}", req.username);

        Box::pin(async move {
            let report = run_report(req.into()).await?;

            info!(
                "レポート完了: path={:?}, tests={}, failures={}",
                report.results_path,
                report.results.tests.len(),
                report.failures.len()
            );

            Ok(report)
        })
    }
}
