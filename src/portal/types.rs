//! 研究者ポータル関連の型定義

use serde::{Deserialize, Serialize};

use crate::config::{ManualMetrics, ProjectsByType};

/// グラフ用JSON (`series[0].data`) をそのまま保持
pub type ChartData = Vec<serde_json::Value>;

/// 資金獲得の見出しから取れる値
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Funding {
    pub total_projects: Option<u32>,
    /// 表示のまま (例: `2,695,566.00`)
    pub total_money: Option<String>,
}

/// ポータルから集めた指標（結果ファイルの `login-automatico`）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortalStats {
    pub publication_types: ChartData,
    pub supervised_theses: Option<u32>,
    pub funding: Funding,
    pub projects_by_type: ProjectsByType,
    pub tfm_supervisadas: u32,
    pub practicas_supervisadas: u32,
    pub patentes: u32,
    pub registros_de_utilidad: u32,
    #[serde(rename = "cursosdocentesImpartidos")]
    pub cursos_docentes_impartidos: u32,
    #[serde(rename = "cursosdocentesRecibidos")]
    pub cursos_docentes_recibidos: u32,
    #[serde(rename = "publicationsByJIFQuartiles")]
    pub publications_by_jif_quartiles: ChartData,
}

impl PortalStats {
    /// ページから取った値と手入力の指標をまとめる
    pub fn new(
        publication_types: ChartData,
        supervised_theses: Option<u32>,
        funding: Funding,
        manual: &ManualMetrics,
        publications_by_jif_quartiles: ChartData,
    ) -> Self {
        Self {
            publication_types,
            supervised_theses,
            funding,
            projects_by_type: manual.projects_by_type.clone(),
            tfm_supervisadas: manual.tfm_supervisadas,
            practicas_supervisadas: manual.practicas_supervisadas,
            patentes: manual.patentes,
            registros_de_utilidad: manual.registros_de_utilidad,
            cursos_docentes_impartidos: manual.cursos_docentes_impartidos,
            cursos_docentes_recibidos: manual.cursos_docentes_recibidos,
            publications_by_jif_quartiles,
        }
    }
}
