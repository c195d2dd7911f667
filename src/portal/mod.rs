//! 研究者ポータル スクレイパーモジュール
//!
//! 公開ページの指標と、ログイン後のJIF四分位別の論文数を取得する

pub mod parse;
mod scraper;
mod types;

pub use scraper::PortalScraper;
pub use types::{ChartData, Funding, PortalStats};
