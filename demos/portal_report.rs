use portal_scraper::{ReportRequest, ReportService};
use tower::Service;

#[tokio::main]
async fn main() {
    // ログ設定
    tracing_subscriber::fmt()
        .with_env_filter("info,portal_scraper=debug")
        .init();

    // 環境変数から認証情報を取得
    let username = std::env::var("USAL_USERNAME")
        .expect("USAL_USERNAME environment variable not set");
    let password = std::env::var("USAL_PASSWORD")
        .expect("USAL_PASSWORD environment variable not set");

    let mut request = ReportRequest::new(&username, &password)
        .with_headless(false);  // デバッグ用に表示モード
    if let Ok(id) = std::env::var("USAL_RESEARCHER_ID") {
        request = request.with_researcher_id(id);
    }

    println!("=== Portal Report ===");

    let mut service = ReportService::new();
    match service.call(request).await {
        Ok(report) => {
            println!("保存先: {:?}", report.results_path);
            for (name, error) in &report.failures {
                eprintln!("✗ {}: {}", name, error);
            }
        }
        Err(e) => {
            eprintln!("エラー: {}", e);
        }
    }
}
