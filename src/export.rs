//! JSON export of analysis results
//!
//! Files are named `chess-<type>-<username>-<YYYY-MM-DD>.json` and carry a
//! small header (`username`, `export_date`, `analysis_type`) ahead of the
//! payload.

use crate::error::ExportError;
use crate::models::{AdvancedAnalysis, Game, GameStats, QuickAnalysis};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;

/// Games included in a basic export
pub const GAMES_SAMPLE_LEN: usize = 5;

pub const EXPORT_VERSION: &str = "3.1";

#[derive(Serialize)]
struct BasicExport<'a> {
    username: &'a str,
    export_date: String,
    analysis_type: &'static str,
    stats: &'a GameStats,
    games_sample: &'a [Game],
}

pub struct Exporter {
    dir: PathBuf,
}

impl Exporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn export_basic(&self, analysis: &QuickAnalysis) -> Result<PathBuf, ExportError> {
        self.export_basic_at(analysis, Utc::now())
    }

    pub fn export_advanced(&self, analysis: &AdvancedAnalysis) -> Result<PathBuf, ExportError> {
        self.export_advanced_at(analysis, Utc::now())
    }

    pub(crate) fn export_basic_at(
        &self,
        analysis: &QuickAnalysis,
        now: DateTime<Utc>,
    ) -> Result<PathBuf, ExportError> {
        let sample = &analysis.games[..analysis.games.len().min(GAMES_SAMPLE_LEN)];
        let export = BasicExport {
            username: &analysis.username,
            export_date: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            analysis_type: "basic",
            stats: &analysis.stats,
            games_sample: sample,
        };
        let json = serde_json::to_string_pretty(&export)?;
        self.write("basic", &analysis.username, now, json)
    }

    pub(crate) fn export_advanced_at(
        &self,
        analysis: &AdvancedAnalysis,
        now: DateTime<Utc>,
    ) -> Result<PathBuf, ExportError> {
        let mut value = serde_json::to_value(analysis)?;
        if let Value::Object(map) = &mut value {
            map.insert(
                "export_date".to_string(),
                Value::from(now.to_rfc3339_opts(SecondsFormat::Millis, true)),
            );
            map.insert("analysis_type".to_string(), Value::from("advanced"));
            map.insert("export_version".to_string(), Value::from(EXPORT_VERSION));
        }
        let json = serde_json::to_string_pretty(&value)?;
        self.write("advanced", &analysis.username, now, json)
    }

    fn write(
        &self,
        kind: &str,
        username: &str,
        now: DateTime<Utc>,
        json: String,
    ) -> Result<PathBuf, ExportError> {
        std::fs::create_dir_all(&self.dir).map_err(|source| ExportError::Write {
            path: self.dir.clone(),
            source,
        })?;

        let path = self.dir.join(file_name(kind, username, now));
        std::fs::write(&path, json).map_err(|source| ExportError::Write {
            path: path.clone(),
            source,
        })?;

        tracing::info!("Exported {} analysis to {}", kind, path.display());
        Ok(path)
    }
}

fn file_name(kind: &str, username: &str, now: DateTime<Utc>) -> String {
    let safe: String = username
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("chess-{}-{}-{}.json", kind, safe, now.format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 9, 12, 30, 0).unwrap()
    }

    #[test]
    fn test_basic_export_writes_stats_and_sample() {
        let dir = TempDir::new().unwrap();
        let exporter = Exporter::new(dir.path());
        let analysis = fixtures::quick("magnus", 12);

        let path = exporter.export_basic_at(&analysis, noon()).unwrap();
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "chess-basic-magnus-2024-03-09.json"
        );

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("\n  \"username\""), "not pretty-printed");
        let json: Value = serde_json::from_str(&content).unwrap();
        assert_eq!(json["username"], "magnus");
        assert_eq!(json["analysis_type"], "basic");
        assert_eq!(json["export_date"], "2024-03-09T12:30:00.000Z");
        assert_eq!(json["stats"]["total_games"], 12);
        assert_eq!(json["games_sample"].as_array().unwrap().len(), GAMES_SAMPLE_LEN);
    }

    #[test]
    fn test_basic_export_with_few_games() {
        let dir = TempDir::new().unwrap();
        let exporter = Exporter::new(dir.path());
        let path = exporter
            .export_basic_at(&fixtures::quick("magnus", 2), noon())
            .unwrap();
        let json: Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(json["games_sample"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_advanced_export_carries_version() {
        let dir = TempDir::new().unwrap();
        let exporter = Exporter::new(dir.path().join("nested"));
        let path = exporter
            .export_advanced_at(&fixtures::advanced("hikaru"), noon())
            .unwrap();
        assert!(path.ends_with("chess-advanced-hikaru-2024-03-09.json"));

        let json: Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(json["analysis_type"], "advanced");
        assert_eq!(json["export_version"], EXPORT_VERSION);
        assert_eq!(json["total_analyzed"], 50);
        assert_eq!(json["username"], "hikaru");
    }

    #[test]
    fn test_unwritable_directory_is_reported() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();

        let exporter = Exporter::new(blocker.join("exports"));
        let err = exporter
            .export_basic_at(&fixtures::quick("magnus", 1), noon())
            .unwrap_err();
        assert!(matches!(err, ExportError::Write { .. }));
    }

    #[test]
    fn test_file_name_sanitizes_username() {
        assert_eq!(
            file_name("basic", "a b/c", noon()),
            "chess-basic-a_b_c-2024-03-09.json"
        );
    }
}
