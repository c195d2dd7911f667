//! 研究者ポータル (produccioncientifica) スクレイパー実装

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chromiumoxide::browser::Browser;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::browser;
use crate::config::ScraperConfig;
use crate::error::ScraperError;
use crate::traits::Scraper;

use super::parse::{chart_series_data, number_in_parens, parse_funding};
use super::types::{ChartData, Funding, PortalStats};

const IDENTITY_PROVIDER: &str = "Universidad de Salamanca";
const USERNAME_INPUT: &str = r#"input[name="adAS_username"], input#username, input[type="text"]"#;
const PASSWORD_INPUT: &str = r#"input[name="adAS_password"], input#password, input[type="password"]"#;
const SUBMIT_BUTTON: &str = "#submit_ok";
/// 要素出現待ちのポーリング間隔（ミリ秒）
const ELEMENT_POLL_INTERVAL_MS: u64 = 200;

pub struct PortalScraper {
    config: ScraperConfig,
    browser: Option<Browser>,
    page: Option<Arc<Page>>,
}

impl PortalScraper {
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

    fn publication_types_url(&self) -> String {
        self.config
            .researcher_url("publicaciones/byAgrTipoPublicacion")
    }

    fn theses_url(&self) -> String {
        self.config.researcher_url("tesis")
    }

    fn funding_url(&self) -> String {
        format!(
            "{}/financiaciones?personaId={}&size=400",
            self.config.portal_base_url.trim_end_matches('/'),
            self.config.researcher_id
        )
    }

    fn jif_quartiles_url(&self) -> String {
        format!(
            "{}/indicadores/jif/byQuartiles?persona={}",
            self.config.portal_base_url.trim_end_matches('/'),
            self.config.researcher_id
        )
    }

    async fn open(&self, page: &Page, url: &str) -> Result<(), ScraperError> {
        browser::open(page, url, self.config.timeout).await
    }

    /// 文字列を返すスクリプトを評価（空文字は `None`）
    async fn eval_text(&self, page: &Page, script: &str) -> Result<Option<String>, ScraperError> {
        let text = page
            .evaluate(script)
            .await
            .map_err(|e| ScraperError::JavaScript(e.to_string()))?
            .into_value::<String>()
            .map_err(|e| ScraperError::Json(e.to_string()))?;
        Ok(Some(text).filter(|t| !t.is_empty()))
    }

    /// スクリプトが値を返すまで待機
    async fn wait_text(
        &self,
        page: &Page,
        script: &str,
        what: &str,
    ) -> Result<String, ScraperError> {
        let start = Instant::now();
        let timeout = self.config.frame_timeout;

        while start.elapsed() < timeout {
            match self.eval_text(page, script).await {
                Ok(Some(text)) => return Ok(text),
                Ok(None) => {}
                Err(e) => debug!("{} check error: {}", what, e),
            }
            sleep(Duration::from_millis(ELEMENT_POLL_INTERVAL_MS)).await;
        }

        Err(ScraperError::ElementNotFound(what.to_string()))
    }

    /// JSONを返すページの `series[0].data`
    async fn chart_data(&self, page: &Page) -> Result<ChartData, ScraperError> {
        let body = self
            .eval_text(page, "document.body ? document.body.textContent : ''")
            .await?
            .unwrap_or_default();
        let data = chart_series_data(&body)?;
        for item in &data {
            debug!("{}: {}", item["name"], item["y"]);
        }
        Ok(data)
    }

    async fn publication_types(&self, page: &Page) -> Result<ChartData, ScraperError> {
        info!("=== Publication Types ===");
        self.open(page, &self.publication_types_url()).await?;
        self.chart_data(page).await
    }

    async fn supervised_theses(&self, page: &Page) -> Result<Option<u32>, ScraperError> {
        self.open(page, &self.theses_url()).await?;
        let heading = self
            .wait_text(
                page,
                r#"
                (() => {
                    const h = Array.from(document.querySelectorAll('h2.investigador-tesis__title'))
                        .find(h => h.innerText.includes('Supervised Theses'));
                    return h ? h.innerText : '';
                })()
                "#,
                "Supervised Theses 見出し",
            )
            .await?;

        let count = number_in_parens(&heading);
        info!("Numero de Tesis Dirigidas: {:?}", count);
        Ok(count)
    }

    async fn funding(&self, page: &Page) -> Result<Funding, ScraperError> {
        self.open(page, &self.funding_url()).await?;
        let heading = self
            .wait_text(
                page,
                r#"
                (() => {
                    const h = Array.from(document.querySelectorAll('h3'))
                        .find(h => /funding/i.test(h.innerText));
                    return h ? h.innerText : '';
                })()
                "#,
                "funding 見出し",
            )
            .await?;

        let funding = parse_funding(&heading);
        info!(
            "Total proyectos financiados: {:?}, total dinero: {:?}",
            funding.total_projects, funding.total_money
        );
        Ok(funding)
    }

    /// 一致する要素をJavaScriptでクリック（出現まで待機）
    async fn click_when_present(
        &self,
        page: &Page,
        script: &str,
        what: &str,
    ) -> Result<(), ScraperError> {
        self.wait_text(page, script, what).await.map(|_| ())
    }

    async fn debug_screenshot(&self, page: &Page, label: &str) {
        if !self.config.debug {
            return;
        }
        if let Ok(screenshot) = page
            .screenshot(ScreenshotParams::builder().full_page(true).build())
            .await
        {
            use base64::Engine;
            let encoded = base64::engine::general_purpose::STANDARD.encode(&screenshot);
            debug!("{} screenshot: data:image/png;base64,{}", label, encoded);
        }
    }
}

#[async_trait]
impl Scraper for PortalScraper {
    type Output = PortalStats;

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

    /// 認証が必要なページを開き、フェデレーションのログイン画面を通過する
    async fn login(&mut self) -> Result<(), ScraperError> {
        let page = self.get_page()?.clone();
        info!("ログイン処理開始...");

        self.open(&page, &self.jif_quartiles_url()).await?;

        // 所属機関を選択
        let pick_provider = format!(
            r#"
            (() => {{
                const p = Array.from(document.querySelectorAll('p.fed-info-idp-name'))
                    .find(p => p.textContent.includes({}));
                if (!p) return '';
                p.click();
                return 'ok';
            }})()
            "#,
            serde_json::Value::String(IDENTITY_PROVIDER.to_string())
        );
        self.click_when_present(&page, &pick_provider, "所属機関の選択肢")
            .await?;
        self.click_when_present(
            &page,
            "(() => { const b = document.querySelector('#selected-button'); if (!b) return ''; b.click(); return 'ok'; })()",
            "所属機関の決定ボタン",
        )
        .await?;
        debug!("Identity provider selected");

        // ログインフォームの出現を待つ
        self.click_when_present(
            &page,
            &format!(
                "document.querySelector({}) ? 'ok' : ''",
                serde_json::Value::String(SUBMIT_BUTTON.to_string())
            ),
            "ログインフォーム",
        )
        .await?;

        page.find_element(USERNAME_INPUT)
            .await
            .map_err(|e| ScraperError::ElementNotFound(format!("ユーザー名入力欄: {}", e)))?
            .click()
            .await
            .map_err(|e| ScraperError::Login(format!("ユーザー名入力欄クリック: {}", e)))?
            .type_str(&self.config.username)
            .await
            .map_err(|e| ScraperError::Login(format!("ユーザー名入力: {}", e)))?;
        debug!("ユーザー名入力完了");

        page.find_element(PASSWORD_INPUT)
            .await
            .map_err(|e| ScraperError::ElementNotFound(format!("パスワード入力欄: {}", e)))?
            .click()
            .await
            .map_err(|e| ScraperError::Login(format!("パスワード入力欄クリック: {}", e)))?
            .type_str(&self.config.password)
            .await
            .map_err(|e| ScraperError::Login(format!("パスワード入力: {}", e)))?;
        debug!("パスワード入力完了");

        self.debug_screenshot(&page, "Login").await;

        page.find_element(SUBMIT_BUTTON)
            .await
            .map_err(|e| ScraperError::ElementNotFound(format!("ログインボタン: {}", e)))?
            .click()
            .await
            .map_err(|e| ScraperError::Login(format!("ログインボタンクリック: {}", e)))?;

        page.wait_for_navigation()
            .await
            .map_err(|e| ScraperError::Navigation(e.to_string()))?;
        browser::wait_dom_ready(&page, self.config.timeout).await?;

        // フォームが残っていれば認証失敗
        let still_on_form = self
            .eval_text(
                &page,
                &format!(
                    "document.querySelector({}) ? 'form' : ''",
                    serde_json::Value::String(SUBMIT_BUTTON.to_string())
                ),
            )
            .await?
            .is_some();
        if still_on_form {
            self.debug_screenshot(&page, "Login failure").await;
            return Err(ScraperError::Login("ログイン後もログイン画面のままです".into()));
        }

        info!("ログイン完了");
        Ok(())
    }

    async fn collect(&mut self) -> Result<Self::Output, ScraperError> {
        let page = self.get_page()?.clone();

        let publication_types = self.publication_types(&page).await?;
        let supervised_theses = self.supervised_theses(&page).await?;
        let funding = self.funding(&page).await?;

        let manual = &self.config.manual_metrics;
        info!("IP Projects: {:?}", manual.projects_by_type);
        info!(
            "TFM: {}, Practicas: {}, Patentes: {}, Registros: {}, Cursos impartidos: {}, Cursos recibidos: {}",
            manual.tfm_supervisadas,
            manual.practicas_supervisadas,
            manual.patentes,
            manual.registros_de_utilidad,
            manual.cursos_docentes_impartidos,
            manual.cursos_docentes_recibidos
        );

        info!("=== Publications by JIF Quartiles ===");
        self.open(&page, &self.jif_quartiles_url()).await?;
        let quartiles = self.chart_data(&page).await?;

        Ok(PortalStats::new(
            publication_types,
            supervised_theses,
            funding,
            manual,
            quartiles,
        ))
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
