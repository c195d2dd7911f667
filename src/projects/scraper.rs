//! diaweb の指導プロジェクト (TFG) スクレイパー

use std::sync::{Arc, LazyLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chromiumoxide::browser::Browser;
use chromiumoxide::Page;
use regex::Regex;
use tokio::time::sleep;
use tracing::{debug, info};
use url::Url;

use crate::browser;
use crate::config::ScraperConfig;
use crate::error::ScraperError;
use crate::frame::{self, Frame, SelectOption};
use crate::traits::Scraper;

use super::harvest::harvest_course;
use super::types::CourseProjects;

const DIAWEB_INDEX_URL: &str = "https://diaweb.usal.es/diaweb/index.jsp";
const LISTING_PATH: &str = "/diaweb/personal/proyectos/proyectosDirigidos.jsp";
const LISTING_URL: &str =
    "https://diaweb.usal.es/diaweb/personal/proyectos/proyectosDirigidos.jsp";
const COURSE_SELECT: &str = r#"select[name="cod_curso_academico"]"#;
const SELECT_POLL_INTERVAL_MS: u64 = 100;

static LISTING_FRAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)proyectosDirigidos\.jsp").unwrap());

pub struct ProjectsScraper {
    config: ScraperConfig,
    browser: Option<Browser>,
    page: Option<Arc<Page>>,
}

impl ProjectsScraper {
    pub fn new(config: ScraperConfig) -> Self {
        Self {
            config,
            browser: None,
            page: None,
        }
    }

    fn get_page(&self) -> Result<&Arc<Page>, ScraperError> {
        self.page
            .as_ref()
            .ok_or_else(|| ScraperError::BrowserInit("ブラウザが初期化されていません".into()))
    }

    /// 一覧を iframe で表示する diaweb のトップページ
    fn index_url(&self) -> String {
        format!(
            "{}?url={}&parametros=persona={}&tipo={}",
            DIAWEB_INDEX_URL, LISTING_PATH, self.config.diaweb_persona, self.config.diaweb_kind
        )
    }
}

/// 学年ごとの一覧URL
pub fn course_url(persona: &str, kind: &str, course_code: &str) -> Result<Url, ScraperError> {
    Ok(Url::parse_with_params(
        LISTING_URL,
        &[
            ("persona", persona),
            ("tipo", kind),
            ("cod_curso_academico", course_code),
        ],
    )?)
}

/// 学年 `select` の有効な選択肢か（空値とプレースホルダ `-1` を除く）
pub fn is_course_option(option: &SelectOption) -> bool {
    !option.value.is_empty() && option.value != "-1"
}

/// 学年 `select` が現れるまで待って選択肢を返す
pub async fn wait_for_courses<F: Frame + ?Sized>(
    frame: &F,
    timeout: Duration,
) -> Result<Vec<SelectOption>, ScraperError> {
    let start = Instant::now();

    loop {
        if frame.count(COURSE_SELECT).await? > 0 {
            break;
        }
        if start.elapsed() >= timeout {
            return Err(ScraperError::ElementNotFound(format!(
                "学年の選択欄 ({})",
                COURSE_SELECT
            )));
        }
        sleep(Duration::from_millis(SELECT_POLL_INTERVAL_MS)).await;
    }

    let options: Vec<SelectOption> = frame
        .select_options(COURSE_SELECT)
        .await?
        .into_iter()
        .filter(is_course_option)
        .collect();
    debug!("Available courses: {:?}", options);
    Ok(options)
}

/// 全学年を順番に取得
pub async fn collect_courses<F: Frame + ?Sized>(
    frame: &mut F,
    config: &ScraperConfig,
) -> Result<Vec<CourseProjects>, ScraperError> {
    let courses = wait_for_courses(&*frame, config.frame_timeout).await?;
    info!("{} courses to harvest", courses.len());

    let mut all = Vec::with_capacity(courses.len());
    for course in courses {
        let url = course_url(&config.diaweb_persona, &config.diaweb_kind, &course.value)?;
        frame.goto(url.as_str()).await?;

        let harvest = harvest_course(frame, &course.label, config.max_pages).await?;
        info!(
            "Curso {}: {} trabajos ({} pages{})",
            course.label,
            harvest.projects.len(),
            harvest.pages_visited,
            if harvest.truncated { ", truncated" } else { "" }
        );
        all.push(CourseProjects::from_harvest(course.label, harvest));
    }

    Ok(all)
}

#[async_trait]
impl Scraper for ProjectsScraper {
    type Output = Vec<CourseProjects>;

    async fn initialize(&mut self) -> Result<(), ScraperError> {
        let browser = browser::launch(&self.config).await?;
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| ScraperError::BrowserInit(e.to_string()))?;

        self.browser = Some(browser);
        self.page = Some(Arc::new(page));
        Ok(())
    }

    /// 一覧は公開ページなのでログイン不要
    async fn login(&mut self) -> Result<(), ScraperError> {
        Ok(())
    }

    async fn collect(&mut self) -> Result<Self::Output, ScraperError> {
        let page = self.get_page()?.clone();
        info!("Collecting supervised projects...");

        browser::open(&page, &self.index_url(), self.config.timeout).await?;

        let mut frame =
            frame::wait_for_frame(page, &LISTING_FRAME_RE, self.config.frame_timeout).await?;
        collect_courses(&mut frame, &self.config).await
    }

    async fn close(&mut self) -> Result<(), ScraperError> {
        info!("ブラウザを終了中...");
        self.page = None;
        if let Some(mut browser) = self.browser.take() {
            if let Err(e) = browser.close().await {
                debug!("Failed to close browser: {}", e);
            }
        }
        Ok(())
    }
}
