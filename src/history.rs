//! Barcode history ledger
//!
//! One row per barcode: a monotonically increasing scan counter plus a
//! snapshot of the most recently observed product metadata. The snapshot is
//! last-write-wins: every touch overwrites all fields with the caller's
//! values, blanks included.

use crate::database::{now_timestamp, DbResult};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

/// Metadata observed for a barcode at touch time.
#[derive(Debug, Clone, Default)]
pub struct Snapshot<'a> {
    pub name: &'a str,
    pub category: Option<&'a str>,
    pub weight_volume: Option<&'a str>,
    pub tags: Option<&'a str>,
    pub is_vegetarian: bool,
    pub is_vegan: bool,
}

/// A barcode history row (for API responses)
#[derive(Debug, Clone, Serialize)]
pub struct BarcodeHistoryEntry {
    pub id: i64,
    pub ean: String,
    pub name: Option<String>,
    pub category: Option<String>,
    pub weight_volume: Option<String>,
    pub tags: Option<String>,
    pub is_vegetarian: bool,
    pub is_vegan: bool,
    pub scan_count: i64,
    pub last_scanned: Option<String>,
}

/// Record an observation of `ean`: insert with scan_count 1 on first sight,
/// otherwise increment the counter and overwrite the snapshot fields.
///
/// Wraps the read-modify-write in its own transaction so concurrent touches
/// of the same barcode cannot lose an increment.
pub fn touch(conn: &mut Connection, ean: &str, snapshot: &Snapshot<'_>) -> DbResult<()> {
    let tx = conn.transaction()?;
    touch_tx(&tx, ean, snapshot)?;
    tx.commit()
}

/// Inner touch for callers that already hold a transaction (product create
/// and delete run it atomically with the row mutation).
pub fn touch_tx(conn: &Connection, ean: &str, snapshot: &Snapshot<'_>) -> DbResult<()> {
    let existing: Option<(i64, i64)> = conn
        .query_row(
            "SELECT id, scan_count FROM barcode_history WHERE ean = ?1",
            params![ean],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    match existing {
        Some((id, scan_count)) => {
            conn.execute(
                "UPDATE barcode_history
                 SET scan_count = ?1, last_scanned = ?2, name = ?3, category = ?4,
                     weight_volume = ?5, tags = ?6, is_vegetarian = ?7, is_vegan = ?8
                 WHERE id = ?9",
                params![
                    scan_count + 1,
                    now_timestamp(),
                    snapshot.name,
                    snapshot.category,
                    snapshot.weight_volume,
                    snapshot.tags,
                    snapshot.is_vegetarian,
                    snapshot.is_vegan,
                    id,
                ],
            )?;
        }
        None => {
            conn.execute(
                "INSERT INTO barcode_history
                 (ean, name, category, weight_volume, tags, is_vegetarian, is_vegan,
                  scan_count, last_scanned)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1, ?8)",
                params![
                    ean,
                    snapshot.name,
                    snapshot.category,
                    snapshot.weight_volume,
                    snapshot.tags,
                    snapshot.is_vegetarian,
                    snapshot.is_vegan,
                    now_timestamp(),
                ],
            )?;
        }
    }
    Ok(())
}

/// Most recently scanned barcodes, newest first.
pub fn list(conn: &Connection, limit: i64) -> DbResult<Vec<BarcodeHistoryEntry>> {
    let mut stmt = conn.prepare(
        "SELECT id, ean, name, category, weight_volume, tags,
                is_vegetarian, is_vegan, scan_count, last_scanned
         FROM barcode_history
         ORDER BY last_scanned DESC
         LIMIT ?1",
    )?;

    let entries: DbResult<Vec<BarcodeHistoryEntry>> = stmt
        .query_map(params![limit], |row| {
            Ok(BarcodeHistoryEntry {
                id: row.get(0)?,
                ean: row.get(1)?,
                name: row.get(2)?,
                category: row.get(3)?,
                weight_volume: row.get(4)?,
                tags: row.get(5)?,
                is_vegetarian: row.get(6)?,
                is_vegan: row.get(7)?,
                scan_count: row.get(8)?,
                last_scanned: row.get(9)?,
            })
        })?
        .collect();
    entries
}
