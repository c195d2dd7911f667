//! 一覧テーブルの行から [`Project`] を取り出す

use std::sync::LazyLock;

use regex::Regex;

use crate::error::ScraperError;
use crate::frame::{TableCell, TableRow};

use super::types::Project;

const STUDENT_CELL: usize = 1;
const YEAR_CELL: usize = 3;
const MONTH_CELL: usize = 4;
const PROGRAM_CELL: usize = 5;

static PUBLICATION_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"cod_publicacion=(\d+)").unwrap());

/// 行を1件のプロジェクトに変換
///
/// 必要なセルやタイトルリンクが欠けている行はエラーにする。
pub fn extract_project(row: &TableRow, course: &str) -> Result<Project, ScraperError> {
    let link = cell(row, 0, "タイトル")?
        .link
        .as_ref()
        .ok_or_else(|| ScraperError::Extraction("タイトルのリンクがありません".into()))?;

    let publication_id = link.href.as_deref().and_then(parse_publication_id);

    Ok(Project {
        course: course.to_string(),
        publication_id,
        title: normalize_whitespace(&link.text),
        student: normalize_whitespace(&cell(row, STUDENT_CELL, "学生")?.text),
        year: normalize_whitespace(&cell(row, YEAR_CELL, "年")?.text),
        month: normalize_whitespace(&cell(row, MONTH_CELL, "月")?.text),
        program: normalize_whitespace(&cell(row, PROGRAM_CELL, "課程")?.text),
    })
}

fn cell<'a>(row: &'a TableRow, index: usize, what: &str) -> Result<&'a TableCell, ScraperError> {
    row.cells.get(index).ok_or_else(|| {
        ScraperError::Extraction(format!(
            "{}のセル (列{}) がありません: 列数={}",
            what,
            index,
            row.cells.len()
        ))
    })
}

/// 詳細リンクの `href` から `cod_publicacion` を取り出す
pub fn parse_publication_id(href: &str) -> Option<String> {
    PUBLICATION_ID_RE
        .captures(href)
        .map(|caps| caps[1].to_string())
}

/// 連続する空白を1つにまとめて前後を削る
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
