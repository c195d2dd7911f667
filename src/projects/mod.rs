//! 指導プロジェクト (TFG) スクレイパーモジュール
//!
//! diaweb の iframe 内にある一覧を学年ごとにページ送りしながら取得する

pub mod harvest;
pub mod pager;
pub mod row;
mod scraper;
mod types;

pub use harvest::{harvest_course, PROJECT_ROWS};
pub use pager::{PagerDirection, PagerMove};
pub use scraper::{collect_courses, course_url, ProjectsScraper};
pub use types::{CourseHarvest, CourseProjects, Project, ProjectKey};
