use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::chapters::ChapterId;
use crate::status::{Outcome, Outcomes, StartStatus};

pub const STATISTICS_FILE: &str = "statistics.csv";
pub const TIME_FORMAT: &str = "%d%m%Y_%H%M%S";

/// Column layout of `statistics.csv`, kept compatible with older files.
#[derive(Debug, Serialize, Deserialize)]
struct CsvRow {
    #[serde(rename = "Time start")]
    time_start: String,
    #[serde(rename = "Time end")]
    time_end: String,
    #[serde(rename = "Level start")]
    level_start: u32,
    #[serde(rename = "Level End")]
    level_end: u32,
    duration: i64,
    #[serde(rename = "Chapter")]
    chapter: ChapterId,
    #[serde(rename = "Start status")]
    start_status: u32,
    #[serde(rename = "End status")]
    end_status: u32,
    #[serde(rename = "Outcomes", default)]
    outcomes: String,
}

/// One finished session. Built once when the session terminates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatisticsRecord {
    pub session_start: DateTime<Local>,
    pub session_end: DateTime<Local>,
    pub level_start: u32,
    pub level_end: u32,
    pub duration_seconds: i64,
    pub chapter: ChapterId,
    pub start_status: StartStatus,
    pub outcomes: Outcomes,
}

impl StatisticsRecord {
    pub fn end_status_code(&self) -> u32 {
        self.outcomes.code()
    }

    fn to_row(&self) -> CsvRow {
        let outcomes: Vec<&str> = self.outcomes.as_slice().iter().map(|o| o.label()).collect();
        CsvRow {
            time_start: self.session_start.format(TIME_FORMAT).to_string(),
            time_end: self.session_end.format(TIME_FORMAT).to_string(),
            level_start: self.level_start,
            level_end: self.level_end,
            duration: self.duration_seconds,
            chapter: self.chapter,
            start_status: self.start_status.code(),
            end_status: self.end_status_code(),
            outcomes: outcomes.join(";"),
        }
    }

    fn from_row(row: CsvRow) -> Option<Self> {
        let outcomes = row
            .outcomes
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .filter_map(|s| s.parse::<Outcome>().ok())
            .collect();
        Some(Self {
            session_start: parse_time(&row.time_start)?,
            session_end: parse_time(&row.time_end)?,
            level_start: row.level_start,
            level_end: row.level_end,
            duration_seconds: row.duration,
            chapter: row.chapter,
            start_status: StartStatus::from_code(row.start_status),
            outcomes,
        })
    }
}

fn parse_time(text: &str) -> Option<DateTime<Local>> {
    let naive = NaiveDateTime::parse_from_str(text, TIME_FORMAT).ok()?;
    Local.from_local_datetime(&naive).earliest()
}

/// Append-only destination for finished sessions. Implementations log and
/// swallow their own I/O failures.
pub trait StatisticsSink: Send {
    fn record(&mut self, record: &StatisticsRecord);
}

/// `datas/statistics.csv` in the data folder.
#[derive(Debug, Clone)]
pub struct CsvStatistics {
    path: PathBuf,
}

impl CsvStatistics {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_data_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join("datas").join(STATISTICS_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one row; the header goes in first when the file is new or empty.
    fn append(&self, record: &StatisticsRecord) -> csv::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        let empty = file.metadata()?.len() == 0;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(empty)
            .from_writer(file);
        writer.serialize(record.to_row())?;
        writer.flush()?;
        Ok(())
    }

    /// Parses every row back; malformed rows are skipped.
    pub fn read_all(&self) -> Result<Vec<StatisticsRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_path(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        let mut records = Vec::new();
        for (index, row) in reader.deserialize::<CsvRow>().enumerate() {
            match row.ok().and_then(StatisticsRecord::from_row) {
                Some(record) => records.push(record),
                None => warn!("skipping malformed statistics row {}", index + 2),
            }
        }
        Ok(records)
    }
}

impl StatisticsSink for CsvStatistics {
    fn record(&mut self, record: &StatisticsRecord) {
        match self.append(record) {
            Ok(()) => debug!("statistics row appended to {}", self.path.display()),
            Err(err) => warn!("could not write statistics to {}: {err}", self.path.display()),
        }
    }
}

/// Keeps records in memory. Clones share the list.
#[derive(Debug, Clone, Default)]
pub struct MemoryStatistics {
    records: Arc<Mutex<Vec<StatisticsRecord>>>,
}

impl MemoryStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<StatisticsRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn records(&self) -> Vec<StatisticsRecord> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl StatisticsSink for MemoryStatistics {
    fn record(&mut self, record: &StatisticsRecord) {
        self.lock().push(record.clone());
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatisticsSummary {
    pub sessions: usize,
    pub wins: usize,
    pub total_seconds: i64,
    pub best_level: u32,
    pub outcomes: BTreeMap<String, usize>,
}

impl StatisticsSummary {
    pub fn from_records(records: &[StatisticsRecord]) -> Self {
        let mut summary = Self {
            sessions: records.len(),
            ..Self::default()
        };
        for record in records {
            if record.outcomes.contains(Outcome::WonGame) {
                summary.wins += 1;
            }
            summary.total_seconds += record.duration_seconds.max(0);
            summary.best_level = summary.best_level.max(record.level_end);
            for outcome in record.outcomes.as_slice() {
                *summary.outcomes.entry(outcome.label().to_string()).or_default() += 1;
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use std::time::{SystemTime, UNIX_EPOCH};

    use super::*;

    fn record(outcomes: &[Outcome]) -> StatisticsRecord {
        let start = parse_time("01022024_101500").unwrap();
        let end = parse_time("01022024_102000").unwrap();
        StatisticsRecord {
            session_start: start,
            session_end: end,
            level_start: 0,
            level_end: 20,
            duration_seconds: (end - start).num_seconds(),
            chapter: 6,
            start_status: StartStatus::Normal,
            outcomes: outcomes.iter().copied().collect(),
        }
    }

    fn temp_csv(name: &str) -> PathBuf {
        let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
        std::env::temp_dir()
            .join(format!("cavebot-stats-{name}-{nanos}"))
            .join(STATISTICS_FILE)
    }

    #[test]
    fn rows_use_legacy_columns() {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer
            .serialize(record(&[Outcome::ProbablyStuck, Outcome::WonGame]).to_row())
            .unwrap();
        let text = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        assert_eq!(
            text,
            "Time start,Time end,Level start,Level End,duration,Chapter,Start status,End status,Outcomes\n\
             01022024_101500,01022024_102000,0,20,300,6,1,14,probably_stuck;won_game\n"
        );
    }

    #[test]
    fn csv_appends_and_reads_back() {
        let path = temp_csv("append");
        let mut sink = CsvStatistics::new(&path);
        sink.record(&record(&[Outcome::WonGame]));
        sink.record(&record(&[Outcome::MainScreen]));

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().filter(|l| l.starts_with("Time start")).count(), 1);
        let rows = sink.read_all().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], record(&[Outcome::WonGame]));

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn empty_file_gets_a_header_before_the_first_row() {
        let path = temp_csv("empty");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "").unwrap();

        let mut sink = CsvStatistics::new(&path);
        sink.record(&record(&[Outcome::YouDied]));

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("Time start,"));
        assert_eq!(sink.read_all().unwrap(), vec![record(&[Outcome::YouDied])]);

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn rows_without_outcomes_column_still_load() {
        let path = temp_csv("legacy");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(
            &path,
            "Time start,Time end,Level start,Level End,duration,Chapter,Start status,End status\n\
             01022024_101500,01022024_102000,0,20,300,6,1,5\n\
             garbage,row\n",
        )
        .unwrap();

        let rows = CsvStatistics::new(&path).read_all().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].level_end, 20);
        assert!(rows[0].outcomes.is_empty());

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn summary_counts_wins_and_outcomes() {
        let records = [
            record(&[Outcome::WonGame]),
            record(&[Outcome::YouDied, Outcome::AltEndgame]),
        ];
        let summary = StatisticsSummary::from_records(&records);
        assert_eq!(summary.sessions, 2);
        assert_eq!(summary.wins, 1);
        assert_eq!(summary.total_seconds, 600);
        assert_eq!(summary.outcomes.get("you_died"), Some(&1));
    }
}
