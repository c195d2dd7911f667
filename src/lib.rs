//! スクレイパーライブラリ
//!
//! - 研究者ポータル (produccioncientifica.usal.es) から論文・資金・論文指導の指標を取得
//! - diaweb から学年ごとの指導プロジェクト (TFG) 一覧をページ送りしながら取得
//! - 結果を1つのJSONファイル (`all-results.json`) にまとめる
//! - 結果ファイルからダッシュボード表示用の集計値を作る
//!
//! # 使用例
//!
//! ```rust,ignore
//! use portal_scraper::{ReportRequest, ReportService};
//! use tower::Service;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut service = ReportService::new();
//!
//!     let request = ReportRequest::new("user", "password")
//!         .with_results_path("./all-results.json")
//!         .with_headless(false);
//!
//!     let report = service.call(request).await.unwrap();
//!     println!("saved: {:?}", report.results_path);
//! }
//! ```
//!
//! # TFG 一覧のみ
//!
//! ```rust,ignore
//! use portal_scraper::{ProjectsScraper, Scraper, ScraperConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut scraper = ProjectsScraper::new(ScraperConfig::default().with_max_pages(50));
//!     let courses = scraper.execute().await.unwrap();
//!     for c in &courses {
//!         println!("{}: {}", c.course, c.count);
//!     }
//! }
//! ```

pub mod browser;
pub mod config;
pub mod error;
pub mod frame;
pub mod portal;
pub mod projects;
pub mod results;
pub mod service;
pub mod summary;
pub mod traits;

#[cfg(test)]
mod testing;

// 主要な型をリエクスポート
pub use config::{ManualMetrics, ScraperConfig};
pub use error::ScraperError;
pub use frame::{ChromeFrame, Frame};
pub use portal::{PortalScraper, PortalStats};
pub use projects::{CourseProjects, Project, ProjectsScraper};
pub use results::RunResults;
pub use service::{Report, ReportRequest, ReportService};
pub use summary::DashboardSummary;
pub use traits::Scraper;
