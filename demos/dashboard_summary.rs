use std::path::PathBuf;

use portal_scraper::config::DEFAULT_RESULTS_PATH;
use portal_scraper::DashboardSummary;

fn main() {
    // ログ設定
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_RESULTS_PATH));

    println!("=== Dashboard ({}) ===\n", path.display());

    match DashboardSummary::load(&path) {
        Ok(summary) => {
            for screen in summary.screens() {
                println!("{}", screen.title);
                for counter in &screen.counters {
                    println!("  {:<14} {}", counter.label, counter.display_value());
                }
            }
        }
        Err(e) => {
            eprintln!("✗ エラー: {}", e);
        }
    }
}
