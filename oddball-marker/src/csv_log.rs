use crate::error::Result;
use crate::sink::MarkerSink;
use chrono::{Local, NaiveDate};
use oddball_core::Marker;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

const HEADER: [&str; 3] = ["ux time", "human time", "message"];

/// Append-only CSV log, one row per marker, flushed on every write.
pub struct CsvMarkerLog {
    path: PathBuf,
    writer: csv::Writer<File>,
}

impl CsvMarkerLog {
    /// Opens today's log, `<dir>/<YYYY-MM-DD>.csv`.
    pub fn open_daily(dir: impl AsRef<Path>) -> Result<Self> {
        Self::open(Self::daily_path(dir, Local::now().date_naive()))
    }

    pub fn daily_path(dir: impl AsRef<Path>, date: NaiveDate) -> PathBuf {
        dir.as_ref().join(format!("{}.csv", date.format("%Y-%m-%d")))
    }

    /// Opens `path` for appending, creating parent directories and writing the
    /// header only when the file is new or empty.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let is_new = fs::metadata(&path).map(|m| m.len() == 0).unwrap_or(true);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if is_new {
            writer.write_record(HEADER)?;
            writer.flush()?;
        }

        log::info!("Marker log: {}", path.display());
        Ok(Self { path, writer })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MarkerSink for CsvMarkerLog {
    fn name(&self) -> &str {
        "csv"
    }

    fn publish(&mut self, marker: &Marker) -> Result<()> {
        self.writer.serialize(marker)?;
        self.writer.flush()?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker(ns: u64, message: &str) -> Marker {
        Marker {
            unix_ns: ns,
            human_time: "12:00:00".into(),
            message: message.into(),
        }
    }

    #[test]
    fn daily_path_uses_iso_date() {
        let date = NaiveDate::from_ymd_opt(2024, 11, 5).unwrap();
        assert_eq!(
            CsvMarkerLog::daily_path("data", date),
            Path::new("data").join("2024-11-05.csv")
        );
    }

    #[test]
    fn writes_header_once_and_appends_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("log.csv");

        let mut log = CsvMarkerLog::open(&path).unwrap();
        log.publish(&marker(1, "APP START")).unwrap();
        drop(log);

        let mut log = CsvMarkerLog::open(&path).unwrap();
        log.publish(&marker(2, "SHOT COUNT: 1")).unwrap();
        log.publish(&marker(3, "note, with comma")).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(
            contents,
            "ux time,human time,message\n\
             1,12:00:00,APP START\n\
             2,12:00:00,SHOT COUNT: 1\n\
             3,12:00:00,\"note, with comma\"\n"
        );
    }

    #[test]
    fn rows_read_back_as_markers() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = CsvMarkerLog::open_daily(dir.path()).unwrap();
        log.publish(&marker(42, "TRIGGER")).unwrap();

        let mut reader = csv::Reader::from_path(log.path()).unwrap();
        let rows: Vec<Marker> = reader.deserialize().map(|r| r.unwrap()).collect();
        assert_eq!(rows, vec![marker(42, "TRIGGER")]);
    }
}
