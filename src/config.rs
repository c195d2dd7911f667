use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_PORTAL_BASE_URL: &str = "https://produccioncientifica.usal.es";
pub const DEFAULT_RESULTS_PATH: &str = "test-results/extracted-data/all-results.json";
/// ページ送りの安全上限
pub const DEFAULT_MAX_PAGES: usize = 200;

/// ページから取得せず手入力で管理している指標
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualMetrics {
    pub projects_by_type: ProjectsByType,
    pub tfm_supervisadas: u32,
    pub practicas_supervisadas: u32,
    pub patentes: u32,
    pub registros_de_utilidad: u32,
    pub cursos_docentes_impartidos: u32,
    pub cursos_docentes_recibidos: u32,
}

/// IPとして参加したプロジェクトの種別ごとの件数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectsByType {
    pub ip_nacionales: u32,
    pub ip_regionales: u32,
    pub ip_innovacion_docente: u32,
    pub otros: u32,
}

impl Default for ManualMetrics {
    fn default() -> Self {
        Self {
            projects_by_type: ProjectsByType {
                ip_nacionales: 1,
                ip_regionales: 2,
                ip_innovacion_docente: 13,
                otros: 90,
            },
            tfm_supervisadas: 11,
            practicas_supervisadas: 89,
            patentes: 5,
            registros_de_utilidad: 70,
            cursos_docentes_impartidos: 21,
            cursos_docentes_recibidos: 41,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScraperConfig {
    /// 研究者ポータルのベースURL
    pub portal_base_url: String,
    pub researcher_id: String,
    pub username: String,
    pub password: String,
    /// diaweb 側の教員ID
    pub diaweb_persona: String,
    /// diaweb のプロジェクト種別 (P = TFG)
    pub diaweb_kind: String,
    pub results_path: PathBuf,
    pub headless: bool,
    /// CDPリクエストのタイムアウト
    pub timeout: Duration,
    /// フレーム・要素の出現待ちタイムアウト
    pub frame_timeout: Duration,
    pub max_pages: usize,
    pub debug: bool,
    pub chrome_path: Option<PathBuf>,
    pub manual_metrics: ManualMetrics,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            portal_base_url: DEFAULT_PORTAL_BASE_URL.to_string(),
            researcher_id: "57921".to_string(),
            username: String::new(),
            password: String::new(),
            diaweb_persona: "343".to_string(),
            diaweb_kind: "P".to_string(),
            results_path: PathBuf::from(DEFAULT_RESULTS_PATH),
            headless: true,
            timeout: Duration::from_secs(60),
            frame_timeout: Duration::from_secs(15),
            max_pages: DEFAULT_MAX_PAGES,
            debug: false,
            chrome_path: None,
            manual_metrics: ManualMetrics::default(),
        }
    }
}

impl ScraperConfig {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            ..Default::default()
        }
    }

    pub fn with_researcher_id(mut self, id: impl Into<String>) -> Self {
        self.researcher_id = id.into();
        self
    }

    pub fn with_portal_base_url(mut self, url: impl Into<String>) -> Self {
        self.portal_base_url = url.into();
        self
    }

    pub fn with_diaweb_persona(mut self, persona: impl Into<String>) -> Self {
        self.diaweb_persona = persona.into();
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

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_frame_timeout(mut self, timeout: Duration) -> Self {
        self.frame_timeout = timeout;
        self
    }

    /// 1学年あたりのページ数上限（最低1ページ）
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_chrome_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.chrome_path = Some(path.into());
        self
    }

    pub fn with_manual_metrics(mut self, metrics: ManualMetrics) -> Self {
        self.manual_metrics = metrics;
        self
    }

    /// ポータル上の研究者ページのURL
    pub fn researcher_url(&self, suffix: &str) -> String {
        format!(
            "{}/investigadores/{}/{}",
            self.portal_base_url.trim_end_matches('/'),
            self.researcher_id,
            suffix.trim_start_matches('/')
        )
    }
}
