//! SQLite-backed columnar snapshot of feature rows, for analytical replay.
//! One column per feature field plus a small key/value meta table.

use crate::event::Vocabulary;
use crate::features::{FeatureRow, FeatureSnapshot};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

pub struct SnapshotStore {
    conn: Connection,
}

impl SnapshotStore {
    /// Open or create the snapshot DB at `path`.
    pub fn open(path: &Path) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS feature_snapshot (
                protocol TEXT NOT NULL,
                source TEXT NOT NULL,
                kind TEXT NOT NULL,
                count_1h INTEGER NOT NULL,
                count_24h INTEGER NOT NULL,
                count_7d INTEGER NOT NULL,
                expected_1h REAL NOT NULL,
                surge_ratio REAL NOT NULL,
                as_of TEXT NOT NULL,
                PRIMARY KEY (protocol, source, kind)
            );
            CREATE TABLE IF NOT EXISTS snapshot_meta (k TEXT PRIMARY KEY, v TEXT);
            "#,
        )?;
        Ok(Self { conn })
    }

    /// Replace all rows and meta in one transaction.
    pub fn replace(
        &mut self,
        snapshot: &FeatureSnapshot,
        schema_version: &str,
        anomaly_count: usize,
    ) -> Result<(), rusqlite::Error> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM feature_snapshot", [])?;
        tx.execute("DELETE FROM snapshot_meta", [])?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO feature_snapshot \
                 (protocol, source, kind, count_1h, count_24h, count_7d, expected_1h, surge_ratio, as_of) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for row in &snapshot.rows {
                insert.execute(params![
                    row.protocol.as_str(),
                    row.source.as_str(),
                    row.kind.as_str(),
                    row.count_1h as i64,
                    row.count_24h as i64,
                    row.count_7d as i64,
                    row.expected_1h,
                    row.surge_ratio,
                    timestamp(row.as_of),
                ])?;
            }
            let mut meta = tx.prepare("INSERT INTO snapshot_meta (k, v) VALUES (?1, ?2)")?;
            meta.execute(params!["schema_version", schema_version])?;
            meta.execute(params!["as_of", timestamp(snapshot.as_of)])?;
            meta.execute(params!["row_count", snapshot.rows.len().to_string()])?;
            meta.execute(params!["anomaly_count", anomaly_count.to_string()])?;
        }
        tx.commit()
    }

    /// Rows in group-key order.
    pub fn rows(&self) -> Result<Vec<FeatureRow>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT protocol, source, kind, count_1h, count_24h, count_7d, expected_1h, surge_ratio, as_of \
             FROM feature_snapshot",
        )?;
        let mut rows = stmt
            .query_map([], |row| {
                Ok(FeatureRow {
                    protocol: label_column(row, 0)?,
                    source: label_column(row, 1)?,
                    kind: label_column(row, 2)?,
                    count_1h: count_column(row, 3)?,
                    count_24h: count_column(row, 4)?,
                    count_7d: count_column(row, 5)?,
                    expected_1h: row.get(6)?,
                    surge_ratio: row.get(7)?,
                    as_of: time_column(row, 8)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        rows.sort_by_key(FeatureRow::group_key);
        Ok(rows)
    }

    pub fn meta(&self, key: &str) -> Result<Option<String>, rusqlite::Error> {
        self.conn
            .query_row("SELECT v FROM snapshot_meta WHERE k = ?1", params![key], |row| row.get(0))
            .optional()
    }

    pub fn close(self) -> Result<(), rusqlite::Error> {
        self.conn.close().map_err(|(_, e)| e)
    }
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn conversion_error(idx: usize, ty: Type, msg: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, ty, msg.into())
}

fn label_column<T: Vocabulary>(row: &Row<'_>, idx: usize) -> Result<T, rusqlite::Error> {
    let text: String = row.get(idx)?;
    T::parse(&text).ok_or_else(|| conversion_error(idx, Type::Text, format!("unknown label {text:?}")))
}

fn count_column(row: &Row<'_>, idx: usize) -> Result<u64, rusqlite::Error> {
    let n: i64 = row.get(idx)?;
    u64::try_from(n).map_err(|_| conversion_error(idx, Type::Integer, format!("negative count {n}")))
}

fn time_column(row: &Row<'_>, idx: usize) -> Result<DateTime<Utc>, rusqlite::Error> {
    let text: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, Type::Text, format!("bad timestamp {text:?}: {e}")))
}
