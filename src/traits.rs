use async_trait::async_trait;

use crate::error::ScraperError;

#[async_trait]
pub trait Scraper: Send + Sync {
    type Output: Send;

    /// ブラウザ初期化
    async fn initialize(&mut self) -> Result<(), ScraperError>;

    /// ログイン実行
    async fn login(&mut self) -> Result<(), ScraperError>;

    /// データ収集
    async fn collect(&mut self) -> Result<Self::Output, ScraperError>;

    /// リソース解放
    async fn close(&mut self) -> Result<(), ScraperError>;

    /// 一括実行（initialize → login → collect → close）
    async fn execute(&mut self) -> Result<Self::Output, ScraperError> {
        self.initialize().await?;
        self.login().await?;
        let output = self.collect().await?;
        self.close().await?;
        Ok(output)
    }
}
