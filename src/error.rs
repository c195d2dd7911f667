use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("ブラウザ初期化エラー: {0}")]
    BrowserInit(String),

    #[error("ナビゲーションエラー: {0}")]
    Navigation(String),

    #[error("ログインエラー: {0}")]
    Login(String),

    #[error("タイムアウト: {0}")]
    Timeout(String),

    #[error("要素が見つかりません: {0}")]
    ElementNotFound(String),

    #[error("フレームが見つかりません: {0}")]
    FrameNotFound(String),

    #[error("JavaScript実行エラー: {0}")]
    JavaScript(String),

    #[error("データ抽出エラー: {0}")]
    Extraction(String),

    #[error("JSON解析エラー: {0}")]
    Json(String),

    #[error("URLが不正です: {0}")]
    InvalidUrl(String),

    #[error("ファイル操作エラー: {0}")]
    FileIO(#[from] std::io::Error),
}

impl ScraperError {
    /// 要素・フレームの探索に失敗したエラーか
    pub fn is_lookup_failure(&self) -> bool {
        matches!(
            self,
            ScraperError::ElementNotFound(_)
                | ScraperError::FrameNotFound(_)
                | ScraperError::Timeout(_)
        )
    }
}

impl From<serde_json::Error> for ScraperError {
    fn from(e: serde_json::Error) -> Self {
        ScraperError::Json(e.to_string())
    }
}

impl From<url::ParseError> for ScraperError {
    fn from(e: url::ParseError) -> Self {
        ScraperError::InvalidUrl(e.to_string())
    }
}
