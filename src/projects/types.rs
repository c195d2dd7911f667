//! TFG (指導プロジェクト) 関連の型定義

use serde::{Deserialize, Serialize};

/// 指導したプロジェクト1件（一覧テーブルの1行）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    #[serde(rename = "curso")]
    pub course: String,
    #[serde(rename = "cod_publicacion")]
    pub publication_id: Option<String>,
    #[serde(rename = "titulo")]
    pub title: String,
    #[serde(rename = "alumno")]
    pub student: String,
    #[serde(rename = "anio")]
    pub year: String,
    #[serde(rename = "mes")]
    pub month: String,
    #[serde(rename = "titulacion")]
    pub program: String,
}

/// 重複排除用のキー
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProjectKey {
    /// `cod_publicacion` が取れた場合
    Identified(String),
    /// 取れなかった場合は行の内容で識別
    Synthetic {
        course: String,
        title: String,
        student: String,
        year: String,
        month: String,
    },
}

impl Project {
    pub fn key(&self) -> ProjectKey {
        match &self.publication_id {
            Some(id) => ProjectKey::Identified(id.clone()),
            None => ProjectKey::Synthetic {
                course: self.course.clone(),
                title: self.title.clone(),
                student: self.student.clone(),
                year: self.year.clone(),
                month: self.month.clone(),
            },
        }
    }
}

/// 1学年分のハーベスト結果
#[derive(Debug, Clone, Default)]
pub struct CourseHarvest {
    /// 初出順・重複なし
    pub projects: Vec<Project>,
    pub pages_visited: usize,
    /// ページ数上限で打ち切った
    pub truncated: bool,
}

/// 結果ファイルに書き出す学年ごとの集計
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseProjects {
    #[serde(rename = "curso")]
    pub course: String,
    pub count: usize,
    #[serde(rename = "proyectos")]
    pub projects: Vec<Project>,
    /// ページ数上限で打ち切った（打ち切っていなければ出力しない）
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub truncated: bool,
}

impl CourseProjects {
    pub fn new(course: impl Into<String>, projects: Vec<Project>) -> Self {
        Self {
            course: course.into(),
            count: projects.len(),
            projects,
            truncated: false,
        }
    }

    pub fn from_harvest(course: impl Into<String>, harvest: CourseHarvest) -> Self {
        Self {
            truncated: harvest.truncated,
            ..Self::new(course, harvest.projects)
        }
    }
}
