//! ページのテキストから数値を取り出す

use std::sync::LazyLock;

use regex::Regex;

use crate::error::ScraperError;

use super::types::{ChartData, Funding};

static PAREN_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\((\d+)\)").unwrap());
static FIRST_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)").unwrap());
static EURO_AMOUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"€\s*([\d,]+\.\d{2})").unwrap());

/// `Tesis dirigidas (10)` のような括弧内の件数
pub fn number_in_parens(text: &str) -> Option<u32> {
    PAREN_NUMBER_RE
        .captures(text)
        .and_then(|caps| caps[1].parse().ok())
}

/// 資金獲得の見出し（例: `12 projects with funding: € 1,234.50`）
pub fn parse_funding(heading: &str) -> Funding {
    Funding {
        total_projects: FIRST_NUMBER_RE
            .captures(heading)
            .and_then(|caps| caps[1].parse().ok()),
        total_money: EURO_AMOUNT_RE
            .captures(heading)
            .map(|caps| caps[1].to_string()),
    }
}

/// グラフAPIのJSON本文から `series[0].data` を取り出す
pub fn chart_series_data(body: &str) -> Result<ChartData, ScraperError> {
    let body = body.trim();
    if body.is_empty() {
        return Err(ScraperError::Extraction("ページ本文が空です".into()));
    }

    let json: serde_json::Value = serde_json::from_str(body)?;
    json.get("series")
        .and_then(|s| s.get(0))
        .and_then(|s| s.get("data"))
        .and_then(|d| d.as_array())
        .cloned()
        .ok_or_else(|| ScraperError::Extraction("series[0].data がありません".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_in_parens() {
        assert_eq!(number_in_parens("Supervised Theses (10)"), Some(10));
        assert_eq!(number_in_parens("Supervised Theses"), None);
        assert_eq!(number_in_parens("(x) and (7)"), Some(7));
    }

    #[test]
    fn test_parse_funding() {
        let funding = parse_funding("85 projects with funding € 2,695,566.00");
        assert_eq!(funding.total_projects, Some(85));
        assert_eq!(funding.total_money.as_deref(), Some("2,695,566.00"));
    }

    #[test]
    fn test_parse_funding_without_amount() {
        let funding = parse_funding("Funding");
        assert_eq!(funding.total_projects, None);
        assert_eq!(funding.total_money, None);
    }

    #[test]
    fn test_chart_series_data() {
        let body = r#"{"series":[{"name":"Tipos","data":[{"name":"Artículo","y":120},{"name":"Libro","y":4}]}]}"#;
        let data = chart_series_data(body).unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data[1]["name"], "Libro");
    }

    #[test]
    fn test_chart_series_data_errors() {
        assert!(matches!(
            chart_series_data("  "),
            Err(ScraperError::Extraction(_))
        ));
        assert!(matches!(
            chart_series_data("<html>login</html>"),
            Err(ScraperError::Json(_))
        ));
        assert!(matches!(
            chart_series_data(r#"{"series":[]}"#),
            Err(ScraperError::Extraction(_))
        ));
    }
}
