//! 収集結果の集約とJSON出力

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ScraperError;

pub const PORTAL_TEST_NAME: &str = "login-automatico";
pub const PROJECTS_TEST_NAME: &str = "recuperacion-tfg";

/// 全ジョブの結果 (`all-results.json`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResults {
    pub timestamp: DateTime<Utc>,
    pub tests: BTreeMap<String, serde_json::Value>,
}

impl Default for RunResults {
    fn default() -> Self {
        Self::new()
    }
}

impl RunResults {
    pub fn new() -> Self {
        Self {
            timestamp: Utc::now(),
            tests: BTreeMap::new(),
        }
    }

    /// ジョブ結果を追加（同名は上書き）
    pub fn add<T: Serialize>(&mut self, name: &str, data: &T) -> Result<(), ScraperError> {
        self.tests
            .insert(name.to_string(), serde_json::to_value(data)?);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
        self.tests.get(name)
    }

    /// 整形済みJSONとして保存（親ディレクトリがなければ作成）
    pub fn save(&self, path: &Path) -> Result<(), ScraperError> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }

        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        info!("Saved all results to {}", path.display());
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, ScraperError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projects::{CourseProjects, Project};

    #[test]
    fn test_add_and_overwrite() {
        let mut results = RunResults::new();
        results.add(PORTAL_TEST_NAME, &serde_json::json!({ "patentes": 5 })).unwrap();
        results.add(PORTAL_TEST_NAME, &serde_json::json!({ "patentes": 6 })).unwrap();

        assert_eq!(results.tests.len(), 1);
        assert_eq!(results.get(PORTAL_TEST_NAME).unwrap()["patentes"], 6);
    }

    #[test]
    fn test_save_creates_directories() {
        let dir = std::env::temp_dir().join(format!(
            "portal-scraper-results-{}",
            std::process::id()
        ));
        let path = dir.join("extracted-data").join("all-results.json");

        let mut results = RunResults::new();
        let courses = vec![CourseProjects::new(
            "2023-2024",
            vec![Project {
                course: "2023-2024".into(),
                publication_id: Some("1".into()),
                title: "Titulo".into(),
                student: "Alumno".into(),
                year: "2024".into(),
                month: "Julio".into(),
                program: "Grado".into(),
            }],
        )];
        results.add(PROJECTS_TEST_NAME, &courses).unwrap();
        results.save(&path).unwrap();

        let loaded = RunResults::load(&path).unwrap();
        let tfg = &loaded.get(PROJECTS_TEST_NAME).unwrap()[0];
        assert_eq!(tfg["curso"], "2023-2024");
        assert_eq!(tfg["count"], 1);
        assert_eq!(tfg["proyectos"][0]["cod_publicacion"], "1");

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
