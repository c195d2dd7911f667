use portal_scraper::{ProjectsScraper, Scraper, ScraperConfig};

#[tokio::main]
async fn main() {
    // ログ設定
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let mut config = ScraperConfig::default().with_headless(false);
    if let Ok(persona) = std::env::var("DIAWEB_PERSONA") {
        config = config.with_diaweb_persona(persona);
    }
    if let Ok(chrome) = std::env::var("CHROME_PATH") {
        config = config.with_chrome_path(chrome);
    }

    println!("=== TFG Harvest ===\n");

    let mut scraper = ProjectsScraper::new(config);
    match scraper.execute().await {
        Ok(courses) => {
            for course in &courses {
                println!("Curso {}: {} trabajos", course.course, course.count);
                for p in &course.projects {
                    println!("  - [{}] {} ({})", p.publication_id.as_deref().unwrap_or("-"), p.title, p.student);
                }
            }
        }
        Err(e) => {
            eprintln!("✗ エラー: {}", e);
        }
    }
}
