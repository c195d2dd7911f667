//! 結果ファイルからダッシュボード表示用の集計値を作る
//!
//! `all-results.json` の `tests` をそのまま読み、画面ごとのカウンタにまとめる。
//! 値が欠けている・数値にならない場合は 0 として扱う。

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::error::ScraperError;
use crate::results::{RunResults, PORTAL_TEST_NAME, PROJECTS_TEST_NAME};

static MONEY_CHARS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^0-9,.\-]").unwrap());

const QUARTILES: [&str; 4] = ["Q1", "Q2", "Q3", "Q4"];

/// 画面上の1カウンタ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Counter {
    pub label: &'static str,
    pub value: i64,
}

impl Counter {
    fn new(label: &'static str, value: i64) -> Self {
        Self { label, value }
    }

    /// 表示用の文字列（金額は `.` 区切り）
    pub fn display_value(&self) -> String {
        if self.label == "FINANCIACION" {
            format_thousands(self.value)
        } else {
            self.value.to_string()
        }
    }
}

/// タイトル付きのカウンタ群
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screen {
    pub title: &'static str,
    pub counters: Vec<Counter>,
}

/// JIF四分位ごとの論文数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Quartiles {
    pub q1: i64,
    pub q2: i64,
    pub q3: i64,
    pub q4: i64,
}

/// 指導実績
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Supervisions {
    /// 全学年の `count` の合計
    pub tfg: i64,
    pub tfm: i64,
    pub theses: i64,
    pub internships: i64,
}

/// IPとして参加したプロジェクト
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LeadProjects {
    pub national: i64,
    pub regional: i64,
    pub teaching_innovation: i64,
    pub other: i64,
}

impl LeadProjects {
    pub fn total(&self) -> i64 {
        self.national + self.regional + self.teaching_innovation + self.other
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TeachingCourses {
    pub taught: i64,
    pub received: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Registrations {
    pub patents: i64,
    pub utility_models: i64,
}

/// 全体の要約
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Overview {
    pub projects: i64,
    /// 種別ごとの件数と四分位ごとの件数の合計
    pub publications: i64,
}

/// 公的資金プロジェクト
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OfficialFunding {
    pub projects: i64,
    /// 小数点以下を丸めた金額
    pub money: i64,
}

/// ダッシュボードの全画面分の集計
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DashboardSummary {
    pub quartiles: Quartiles,
    pub supervisions: Supervisions,
    pub lead_projects: LeadProjects,
    pub teaching: TeachingCourses,
    pub registrations: Registrations,
    pub overview: Overview,
    pub funding: OfficialFunding,
}

impl DashboardSummary {
    pub fn from_results(results: &RunResults) -> Self {
        let null = Value::Null;
        let portal = results.get(PORTAL_TEST_NAME).unwrap_or(&null);
        let projects = results.get(PROJECTS_TEST_NAME).unwrap_or(&null);

        let summary = Self {
            quartiles: quartiles(portal),
            supervisions: supervisions(portal, projects),
            lead_projects: lead_projects(portal),
            teaching: TeachingCourses {
                taught: to_int(&portal["cursosdocentesImpartidos"]),
                received: to_int(&portal["cursosdocentesRecibidos"]),
            },
            registrations: Registrations {
                patents: to_int(&portal["patentes"]),
                utility_models: to_int(&portal["registrosDeUtilidad"]),
            },
            overview: Overview {
                projects: lead_projects(portal).total(),
                publications: sum_y(&portal["publicationTypes"])
                    + sum_y(&portal["publicationsByJIFQuartiles"]),
            },
            funding: OfficialFunding {
                projects: to_int(&portal["funding"]["totalProjects"]),
                money: money_to_int(&portal["funding"]["totalMoney"]),
            },
        };
        debug!("Dashboard summary: {:?}", summary);
        summary
    }

    pub fn load(path: &Path) -> Result<Self, ScraperError> {
        Ok(Self::from_results(&RunResults::load(path)?))
    }

    /// 表示順の画面一覧
    pub fn screens(&self) -> Vec<Screen> {
        let screen = |title, counters| Screen { title, counters };
        vec![
            screen(
                "PUBLICACIONES",
                vec![
                    Counter::new("Q1", self.quartiles.q1),
                    Counter::new("Q2", self.quartiles.q2),
                    Counter::new("Q3", self.quartiles.q3),
                    Counter::new("Q4", self.quartiles.q4),
                ],
            ),
            screen(
                "DIRECCIONES",
                vec![
                    Counter::new("TFG", self.supervisions.tfg),
                    Counter::new("TFM", self.supervisions.tfm),
                    Counter::new("TESIS", self.supervisions.theses),
                    Counter::new("PRAC", self.supervisions.internships),
                ],
            ),
            screen(
                "IP. PROYECTOS",
                vec![
                    Counter::new("NAC", self.lead_projects.national),
                    Counter::new("REG", self.lead_projects.regional),
                    Counter::new("INDO", self.lead_projects.teaching_innovation),
                    Counter::new("OTRO", self.lead_projects.other),
                ],
            ),
            screen(
                "CURSO DOCENTE",
                vec![
                    Counter::new("IMPARTIDOS", self.teaching.taught),
                    Counter::new("RECIBIDOS", self.teaching.received),
                ],
            ),
            screen(
                "REGISTROS",
                vec![
                    Counter::new("PATENTES", self.registrations.patents),
                    Counter::new("PROPIEDADES", self.registrations.utility_models),
                ],
            ),
            screen(
                "RESUMEN",
                vec![
                    Counter::new("PROYECTOS", self.overview.projects),
                    Counter::new("PUBLICACIONES", self.overview.publications),
                ],
            ),
            screen(
                "PRO. OFICIALES",
                vec![
                    Counter::new("PROYECTOS", self.funding.projects),
                    Counter::new("FINANCIACION", self.funding.money),
                ],
            ),
        ]
    }
}

fn quartiles(portal: &Value) -> Quartiles {
    let mut q = [0i64; 4];
    for item in portal["publicationsByJIFQuartiles"].as_array().into_iter().flatten() {
        let key = item["key"]
            .as_str()
            .filter(|k| !k.is_empty())
            .or_else(|| item["name"].as_str())
            .unwrap_or_default()
            .trim()
            .to_uppercase();
        if let Some(i) = QUARTILES.iter().position(|k| *k == key) {
            q[i] = to_int(&item["y"]);
        }
    }
    Quartiles {
        q1: q[0],
        q2: q[1],
        q3: q[2],
        q4: q[3],
    }
}

fn supervisions(portal: &Value, projects: &Value) -> Supervisions {
    Supervisions {
        tfg: projects
            .as_array()
            .into_iter()
            .flatten()
            .map(|course| to_int(&course["count"]))
            .sum(),
        tfm: to_int(&portal["tfmSupervisadas"]),
        theses: to_int(&portal["supervisedTheses"]),
        internships: to_int(&portal["practicasSupervisadas"]),
    }
}

fn lead_projects(portal: &Value) -> LeadProjects {
    let by_type = &portal["projectsByType"];
    LeadProjects {
        national: to_int(&by_type["ipNacionales"]),
        regional: to_int(&by_type["ipRegionales"]),
        teaching_innovation: to_int(&by_type["ipInnovacionDocente"]),
        other: to_int(&by_type["otros"]),
    }
}

/// 整数として読めない値は 0
fn to_int(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        Value::Bool(b) => i64::from(*b),
        _ => 0,
    }
}

fn sum_y(items: &Value) -> i64 {
    items
        .as_array()
        .into_iter()
        .flatten()
        .map(|item| to_int(&item["y"]))
        .sum()
}

/// 表示されている金額を整数に丸める
///
/// `2,695,566.00` と `2.695.566,00` のどちらの書き方も受け付ける。
pub fn money_to_int(value: &Value) -> i64 {
    let raw = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return 0,
    };
    let cleaned = MONEY_CHARS_RE.replace_all(&raw, "");

    let us = cleaned.replace(',', "");
    if let Ok(f) = us.parse::<f64>() {
        return f.round_ties_even() as i64;
    }

    let es = cleaned.replace('.', "").replace(',', ".");
    if let Ok(f) = es.parse::<f64>() {
        return f.round_ties_even() as i64;
    }

    cleaned
        .chars()
        .filter(char::is_ascii_digit)
        .collect::<String>()
        .parse()
        .unwrap_or(0)
}

/// `.` で3桁ごとに区切る（負数は 0）
pub fn format_thousands(n: i64) -> String {
    let digits = n.max(0).to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn results(portal: Value, projects: Value) -> RunResults {
        let mut results = RunResults::new();
        results.add(PORTAL_TEST_NAME, &portal).unwrap();
        results.add(PROJECTS_TEST_NAME, &projects).unwrap();
        results
    }

    fn sample() -> RunResults {
        results(
            json!({
                "publicationTypes": [
                    { "name": "Artículo", "y": 120 },
                    { "name": "Libro", "y": "3" },
                    { "name": "Otro" }
                ],
                "supervisedTheses": 10,
                "funding": { "totalProjects": 12, "totalMoney": "2,695,566.00" },
                "projectsByType": {
                    "ipNacionales": 1, "ipRegionales": 2, "ipInnovacionDocente": 13, "otros": 90
                },
                "tfmSupervisadas": 11,
                "practicasSupervisadas": 89,
                "patentes": 5,
                "registrosDeUtilidad": 70,
                "cursosdocentesImpartidos": 21,
                "cursosdocentesRecibidos": 41,
                "publicationsByJIFQuartiles": [
                    { "name": "Q1", "y": 30 },
                    { "key": "q3", "name": "ignored", "y": 4 },
                    { "name": "Sin cuartil", "y": 7 }
                ]
            }),
            json!([
                { "curso": "2023-2024", "count": 7, "proyectos": [] },
                { "curso": "2022-2023", "count": 5, "proyectos": [] }
            ]),
        )
    }

    #[test]
    fn test_quartiles_default_to_zero() {
        let summary = DashboardSummary::from_results(&sample());
        assert_eq!(
            summary.quartiles,
            Quartiles {
                q1: 30,
                q2: 0,
                q3: 4,
                q4: 0
            }
        );
    }

    #[test]
    fn test_supervisions_sum_tfg_counts() {
        let summary = DashboardSummary::from_results(&sample());
        assert_eq!(
            summary.supervisions,
            Supervisions {
                tfg: 12,
                tfm: 11,
                theses: 10,
                internships: 89
            }
        );
    }

    #[test]
    fn test_lead_projects_teaching_and_registrations() {
        let summary = DashboardSummary::from_results(&sample());
        assert_eq!(summary.lead_projects.total(), 106);
        assert_eq!(summary.lead_projects.teaching_innovation, 13);
        assert_eq!(
            summary.teaching,
            TeachingCourses {
                taught: 21,
                received: 41
            }
        );
        assert_eq!(
            summary.registrations,
            Registrations {
                patents: 5,
                utility_models: 70
            }
        );
    }

    #[test]
    fn test_overview_adds_types_and_quartiles() {
        let summary = DashboardSummary::from_results(&sample());
        assert_eq!(summary.overview.projects, 106);
        // 120 + 3 + 0 と 30 + 4 + 7
        assert_eq!(summary.overview.publications, 164);
    }

    #[test]
    fn test_official_funding() {
        let summary = DashboardSummary::from_results(&sample());
        assert_eq!(
            summary.funding,
            OfficialFunding {
                projects: 12,
                money: 2_695_566
            }
        );
    }

    #[test]
    fn test_money_formats() {
        assert_eq!(money_to_int(&json!("2,695,566.00")), 2_695_566);
        assert_eq!(money_to_int(&json!("2.695.566,00")), 2_695_566);
        assert_eq!(money_to_int(&json!(" 1.234.567,49 €")), 1_234_567);
        assert_eq!(money_to_int(&json!("$ 1,500.50")), 1_500);
        assert_eq!(money_to_int(&json!(4200)), 4200);
        assert_eq!(money_to_int(&Value::Null), 0);
        assert_eq!(money_to_int(&json!("n/a")), 0);
    }

    #[test]
    fn test_missing_jobs_give_zeroes() {
        let summary = DashboardSummary::from_results(&RunResults::new());
        assert_eq!(summary, DashboardSummary::default());
    }

    #[test]
    fn test_screens_order_and_display() {
        let screens = DashboardSummary::from_results(&sample()).screens();
        let titles: Vec<_> = screens.iter().map(|s| s.title).collect();
        assert_eq!(
            titles,
            vec![
                "PUBLICACIONES",
                "DIRECCIONES",
                "IP. PROYECTOS",
                "CURSO DOCENTE",
                "REGISTROS",
                "RESUMEN",
                "PRO. OFICIALES"
            ]
        );

        let money = &screens[6].counters[1];
        assert_eq!(money.label, "FINANCIACION");
        assert_eq!(money.display_value(), "2.695.566");
        assert_eq!(screens[1].counters[0].display_value(), "12");
    }

    #[test]
    fn test_format_thousands() {
        assert_eq!(format_thousands(0), "0");
        assert_eq!(format_thousands(999), "999");
        assert_eq!(format_thousands(1000), "1.000");
        assert_eq!(format_thousands(2_695_566), "2.695.566");
        assert_eq!(format_thousands(-5), "0");
    }
}
