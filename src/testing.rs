//! テスト用のインメモリ [`Frame`]

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::ScraperError;
use crate::frame::{CellLink, Frame, RowQuery, SelectOption, TableCell, TableRow};
use crate::projects::pager::PagerDirection;

/// 1ページ分の内容
#[derive(Debug, Clone, Default)]
pub struct FakePage {
    pub url: String,
    pub rows: Vec<TableRow>,
    /// セレクタ -> onclick（`None` は属性なし）
    pub controls: HashMap<&'static str, Option<String>>,
    pub options: Vec<SelectOption>,
}

impl FakePage {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            ..Default::default()
        }
    }

    pub fn with_row(mut self, row: TableRow) -> Self {
        self.rows.push(row);
        self
    }

    pub fn with_control(mut self, direction: PagerDirection, onclick: &str) -> Self {
        self.controls
            .insert(direction.selector(), Some(onclick.to_string()));
        self
    }

    /// `onclick` を持たないページ送り画像
    pub fn with_bare_control(mut self, direction: PagerDirection) -> Self {
        self.controls.insert(direction.selector(), None);
        self
    }

    pub fn with_option(mut self, value: &str, label: &str) -> Self {
        self.options.push(SelectOption {
            value: value.to_string(),
            label: label.to_string(),
        });
        self
    }

    pub fn with_next(self, onclick: &str) -> Self {
        self.with_control(PagerDirection::Next, onclick)
    }
}

/// URLでページを切り替えるだけのフレーム
#[derive(Debug)]
pub struct FakeFrame {
    pages: Vec<FakePage>,
    current: usize,
    navigations: usize,
}

impl FakeFrame {
    pub fn new(pages: Vec<FakePage>) -> Self {
        Self {
            pages,
            current: 0,
            navigations: 0,
        }
    }

    pub fn current_url(&self) -> &str {
        &self.pages[self.current].url
    }

    pub fn navigations(&self) -> usize {
        self.navigations
    }

    fn page(&self) -> &FakePage {
        &self.pages[self.current]
    }
}

#[async_trait]
impl Frame for FakeFrame {
    async fn url(&self) -> Result<String, ScraperError> {
        Ok(self.page().url.clone())
    }

    async fn query_rows(&self, query: &RowQuery<'_>) -> Result<Vec<TableRow>, ScraperError> {
        Ok(self
            .page()
            .rows
            .iter()
            .filter(|row| {
                row.cells.iter().any(|cell| {
                    cell.link
                        .as_ref()
                        .and_then(|l| l.href.as_deref())
                        .is_some_and(|href| href.contains(query.link_href_contains))
                })
            })
            .cloned()
            .collect())
    }

    async fn count(&self, selector: &str) -> Result<usize, ScraperError> {
        let page = self.page();
        let is_select = selector.starts_with("select") && !page.options.is_empty();
        Ok(usize::from(page.controls.contains_key(selector) || is_select))
    }

    async fn attribute(
        &self,
        selector: &str,
        name: &str,
    ) -> Result<Option<String>, ScraperError> {
        if name != "onclick" {
            return Ok(None);
        }
        Ok(self.page().controls.get(selector).cloned().flatten())
    }

    async fn select_options(&self, _selector: &str) -> Result<Vec<SelectOption>, ScraperError> {
        Ok(self.page().options.clone())
    }

    async fn goto(&mut self, url: &str) -> Result<(), ScraperError> {
        let index = self
            .pages
            .iter()
            .position(|p| p.url == url)
            .ok_or_else(|| ScraperError::Navigation(format!("unknown url: {}", url)))?;
        self.current = index;
        self.navigations += 1;
        Ok(())
    }
}

/// 一覧テーブルと同じ並びの行を作る
pub fn project_row(
    href: Option<&str>,
    title: &str,
    student: &str,
    year: &str,
    month: &str,
    program: &str,
) -> TableRow {
    let text = |s: &str| TableCell {
        text: s.to_string(),
        link: None,
    };
    TableRow {
        cells: vec![
            TableCell {
                text: title.to_string(),
                link: Some(CellLink {
                    text: title.to_string(),
                    href: href.map(str::to_string),
                }),
            },
            text(student),
            text("Tutor"),
            text(year),
            text(month),
            text(program),
        ],
    }
}

/// `cod_publicacion` 付きの行
pub fn identified_row(id: u32, title: &str) -> TableRow {
    let href = format!("verProyectoLeidoPersonal.jsp?cod_publicacion={}", id);
    project_row(Some(&href), title, "Alumno", "2024", "Julio", "Grado")
}
