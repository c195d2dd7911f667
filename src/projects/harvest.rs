//! 学年ごとの一覧をページ送りしながら全件取得する

use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::error::ScraperError;
use crate::frame::{Frame, RowQuery};

use super::pager::{self, PagerDirection, PagerMove};
use super::row::extract_project;
use super::types::CourseHarvest;

/// プロジェクト行の選択条件（詳細ページへのリンクを持つ行）
pub const PROJECT_ROWS: RowQuery<'static> = RowQuery {
    rows: "#tabla0 > tbody > tr",
    link_href_contains: "verProyectoLeidoPersonal.jsp",
};

/// フレームが1ページ目を表示している状態から、最終ページまでを取得
///
/// `max_pages` に達した場合はそこまでの結果を返す（0 は 1 として扱う）。
/// 行の抽出に失敗したら即座に中断する。
pub async fn harvest_course<F: Frame + ?Sized>(
    frame: &mut F,
    course: &str,
    max_pages: usize,
) -> Result<CourseHarvest, ScraperError> {
    let max_pages = max_pages.max(1);
    let mut harvest = CourseHarvest::default();
    let mut seen = HashSet::new();

    while harvest.pages_visited < max_pages {
        let rows = frame.query_rows(&PROJECT_ROWS).await?;
        harvest.pages_visited += 1;

        let before = harvest.projects.len();
        for row in &rows {
            let project = extract_project(row, course)?;
            if seen.insert(project.key()) {
                harvest.projects.push(project);
            }
        }
        debug!(
            "Course {} page {}: {} rows, {} new",
            course,
            harvest.pages_visited,
            rows.len(),
            harvest.projects.len() - before
        );

        if harvest.pages_visited == max_pages {
            harvest.truncated = pager::is_available(&*frame, PagerDirection::Next).await?;
            if harvest.truncated {
                warn!(
                    "Course {}: page limit {} reached, stopping with {} projects",
                    course,
                    max_pages,
                    harvest.projects.len()
                );
            }
            break;
        }

        if pager::goto_next(frame).await? == PagerMove::Stay {
            break;
        }
    }

    info!(
        "Course {}: {} projects over {} pages",
        course,
        harvest.projects.len(),
        harvest.pages_visited
    );
    Ok(harvest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{identified_row, project_row, FakeFrame, FakePage};

    const PAGE1: &str = "https://diaweb.usal.es/diaweb/personal/proyectos/proyectosDirigidos.jsp?persona=343&tipo=P";

    fn page_url(n: usize) -> String {
        format!("{}&indice_pagina={}", PAGE1, n)
    }

    fn next_to(n: usize) -> String {
        format!(
            "javascript: location.href='proyectosDirigidos.jsp?persona=343&amp;tipo=P&amp;indice_pagina={}';",
            n
        )
    }

    fn titles(harvest: &CourseHarvest) -> Vec<&str> {
        harvest.projects.iter().map(|p| p.title.as_str()).collect()
    }

    #[tokio::test]
    async fn test_three_pages_union_in_first_seen_order() {
        let mut frame = FakeFrame::new(vec![
            FakePage::new(&page_url(1))
                .with_row(identified_row(1, "A"))
                .with_row(identified_row(2, "B"))
                .with_next(&next_to(2)),
            FakePage::new(&page_url(2))
                .with_row(identified_row(2, "B"))
                .with_row(identified_row(3, "C"))
                .with_next(&next_to(3)),
            FakePage::new(&page_url(3)).with_row(identified_row(4, "D")),
        ]);

        let harvest = harvest_course(&mut frame, "2023-2024", 200).await.unwrap();

        assert_eq!(titles(&harvest), vec!["A", "B", "C", "D"]);
        assert_eq!(harvest.pages_visited, 3);
        assert!(!harvest.truncated);
        assert!(harvest.projects.iter().all(|p| p.course == "2023-2024"));
    }

    #[tokio::test]
    async fn test_no_next_control_returns_first_page() {
        let mut frame = FakeFrame::new(vec![
            FakePage::new(&page_url(1))
                .with_row(identified_row(1, "A"))
                .with_row(identified_row(2, "B")),
            FakePage::new(&page_url(2)).with_row(identified_row(3, "C")),
        ]);

        let harvest = harvest_course(&mut frame, "2023-2024", 200).await.unwrap();

        assert_eq!(titles(&harvest), vec!["A", "B"]);
        assert_eq!(harvest.pages_visited, 1);
        assert_eq!(frame.navigations(), 0);
    }

    #[tokio::test]
    async fn test_page_cap_stops_endless_pager() {
        // 2ページが互いを「次」として指し続ける
        let mut frame = FakeFrame::new(vec![
            FakePage::new(&page_url(1))
                .with_row(identified_row(1, "A"))
                .with_next(&next_to(2)),
            FakePage::new(&page_url(2))
                .with_row(identified_row(2, "B"))
                .with_next(&next_to(1)),
        ]);

        let harvest = harvest_course(&mut frame, "2023-2024", 2).await.unwrap();

        assert_eq!(harvest.pages_visited, 2);
        assert_eq!(frame.navigations(), 1);
        assert!(harvest.truncated);
        assert_eq!(titles(&harvest), vec!["A", "B"]);
    }

    #[tokio::test]
    async fn test_rows_without_detail_link_are_ignored() {
        let header = project_row(Some("ordenar.jsp?campo=titulo"), "Título", "Alumno", "Año", "Mes", "Titulación");
        let mut frame = FakeFrame::new(vec![FakePage::new(&page_url(1))
            .with_row(header)
            .with_row(identified_row(1, "A"))]);

        let harvest = harvest_course(&mut frame, "2023-2024", 200).await.unwrap();
        assert_eq!(titles(&harvest), vec!["A"]);
    }

    #[tokio::test]
    async fn test_synthetic_keys_dedup_across_pages() {
        let row = || {
            project_row(
                Some("verProyectoLeidoPersonal.jsp?sin_codigo=1"),
                "Sin  código",
                "Luis",
                "2023",
                "Julio",
                "Grado",
            )
        };
        let mut frame = FakeFrame::new(vec![
            FakePage::new(&page_url(1)).with_row(row()).with_next(&next_to(2)),
            FakePage::new(&page_url(2)).with_row(row()),
        ]);

        let harvest = harvest_course(&mut frame, "2022-2023", 200).await.unwrap();

        assert_eq!(harvest.projects.len(), 1);
        assert_eq!(harvest.projects[0].title, "Sin código");
        assert!(harvest.projects[0].publication_id.is_none());
    }

    #[tokio::test]
    async fn test_malformed_row_aborts_harvest() {
        let mut broken = identified_row(2, "B");
        broken.cells.truncate(1);

        let mut frame = FakeFrame::new(vec![
            FakePage::new(&page_url(1))
                .with_row(identified_row(1, "A"))
                .with_next(&next_to(2)),
            FakePage::new(&page_url(2)).with_row(broken),
        ]);

        let err = harvest_course(&mut frame, "2023-2024", 200).await.unwrap_err();
        assert!(matches!(err, ScraperError::Extraction(_)));
    }

    #[tokio::test]
    async fn test_fields_are_whitespace_normalized() {
        let row = project_row(
            Some("verProyectoLeidoPersonal.jsp?cod_publicacion=8"),
            "\n  Análisis   de\tdatos ",
            " María  José\nGarcía ",
            "2024",
            "Julio",
            "  Máster   en IA ",
        );
        let mut frame = FakeFrame::new(vec![FakePage::new(&page_url(1)).with_row(row)]);

        let harvest = harvest_course(&mut frame, "2023-2024", 200).await.unwrap();
        for p in &harvest.projects {
            for field in [&p.title, &p.student, &p.program] {
                assert_eq!(field.trim(), field);
                assert!(!field.contains("  "));
                assert!(!field.contains('\n') && !field.contains('\t'));
            }
        }
    }

    #[tokio::test]
    async fn test_zero_page_cap_still_reads_first_page() {
        let mut frame = FakeFrame::new(vec![
            FakePage::new(&page_url(1))
                .with_row(identified_row(1, "A"))
                .with_next(&next_to(2)),
            FakePage::new(&page_url(2)).with_row(identified_row(2, "B")),
        ]);

        let harvest = harvest_course(&mut frame, "2023-2024", 0).await.unwrap();

        assert_eq!(titles(&harvest), vec!["A"]);
        assert_eq!(harvest.pages_visited, 1);
        assert!(harvest.truncated);
        assert_eq!(frame.navigations(), 0);
    }
}
