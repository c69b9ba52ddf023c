//! Read-only aggregation queries over the inventory
//!
//! Two tiers: the overview used by the dashboard and an advanced variant
//! with waste tracking, category rollups and scan-frequency data. Monetary
//! aggregates are rounded to 2 decimal places; NULL aggregates render as 0.

use crate::database::{date_days_from_now, today_date, DbResult};
use rusqlite::{params, Connection};
use serde::Serialize;

/// Per-location rollup
#[derive(Debug, Serialize)]
pub struct LocationStats {
    pub location: Option<String>,
    pub products: i64,
    pub items: i64,
}

/// Basic inventory statistics
#[derive(Debug, Serialize)]
pub struct Statistics {
    pub total_products: i64,
    pub total_items: i64,
    pub total_value: f64,
    pub expiring_soon: i64,
    pub expired: i64,
    pub by_location: Vec<LocationStats>,
    pub recent_additions_count: i64,
    pub recent_additions_value: f64,
}

/// Expired items rollup
#[derive(Debug, Serialize)]
pub struct WasteStats {
    pub count: i64,
    pub value: f64,
}

/// Per-category rollup
#[derive(Debug, Serialize)]
pub struct CategoryStats {
    pub category: String,
    pub count: i64,
    pub items: i64,
}

/// Most-scanned barcode history entries
#[derive(Debug, Serialize)]
pub struct TopScanned {
    pub name: Option<String>,
    pub count: i64,
    pub last_scanned: Option<String>,
}

/// Average price per category (categories with at least one priced item)
#[derive(Debug, Serialize)]
pub struct CategoryAvgPrice {
    pub category: String,
    pub avg_price: f64,
}

/// Advanced statistics: waste, category breakdown, scan frequency
#[derive(Debug, Serialize)]
pub struct AdvancedStatistics {
    pub waste: WasteStats,
    pub by_category: Vec<CategoryStats>,
    pub top_scanned: Vec<TopScanned>,
    pub weekly_additions: i64,
    pub avg_by_category: Vec<CategoryAvgPrice>,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Basic statistics as of today.
pub fn overview(conn: &Connection) -> DbResult<Statistics> {
    overview_at(
        conn,
        &today_date(),
        &date_days_from_now(7),
        &date_days_from_now(-30),
    )
}

/// Inner query that accepts explicit dates — used in tests.
fn overview_at(
    conn: &Connection,
    today: &str,
    week_from_now: &str,
    thirty_days_ago: &str,
) -> DbResult<Statistics> {
    let (total_products, total_items, total_value): (i64, Option<i64>, Option<f64>) = conn
        .query_row(
            "SELECT COUNT(*), SUM(quantity), SUM(price * quantity) FROM products",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;

    let expiring_soon: i64 = conn.query_row(
        "SELECT COUNT(*) FROM products WHERE expiry_date <= ?1 AND expiry_date >= ?2",
        params![week_from_now, today],
        |row| row.get(0),
    )?;

    let expired: i64 = conn.query_row(
        "SELECT COUNT(*) FROM products WHERE expiry_date < ?1",
        params![today],
        |row| row.get(0),
    )?;

    let by_location = {
        let mut stmt = conn.prepare(
            "SELECT location, COUNT(*), SUM(quantity) FROM products GROUP BY location",
        )?;
        let rows: DbResult<Vec<LocationStats>> = stmt
            .query_map([], |row| {
                Ok(LocationStats {
                    location: row.get(0)?,
                    products: row.get(1)?,
                    items: row.get::<_, Option<i64>>(2)?.unwrap_or(0),
                })
            })?
            .collect();
        rows?
    };

    let (recent_count, recent_value): (i64, Option<f64>) = conn.query_row(
        "SELECT COUNT(*), SUM(price * quantity) FROM products WHERE created_at >= ?1",
        params![thirty_days_ago],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    Ok(Statistics {
        total_products,
        total_items: total_items.unwrap_or(0),
        total_value: round2(total_value.unwrap_or(0.0)),
        expiring_soon,
        expired,
        by_location,
        recent_additions_count: recent_count,
        recent_additions_value: round2(recent_value.unwrap_or(0.0)),
    })
}

/// Advanced statistics as of today.
pub fn advanced(conn: &Connection) -> DbResult<AdvancedStatistics> {
    advanced_at(conn, &today_date(), &date_days_from_now(-7))
}

/// Inner query that accepts explicit dates — used in tests.
fn advanced_at(conn: &Connection, today: &str, week_ago: &str) -> DbResult<AdvancedStatistics> {
    let (waste_count, waste_value): (i64, Option<f64>) = conn.query_row(
        "SELECT COUNT(*), SUM(price * quantity) FROM products WHERE expiry_date < ?1",
        params![today],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    let by_category = {
        let mut stmt = conn.prepare(
            "SELECT category, COUNT(*), SUM(quantity) FROM products
             WHERE category IS NOT NULL AND category != ''
             GROUP BY category",
        )?;
        let rows: DbResult<Vec<CategoryStats>> = stmt
            .query_map([], |row| {
                Ok(CategoryStats {
                    category: row.get(0)?,
                    count: row.get(1)?,
                    items: row.get::<_, Option<i64>>(2)?.unwrap_or(0),
                })
            })?
            .collect();
        rows?
    };

    let top_scanned = {
        let mut stmt = conn.prepare(
            "SELECT name, scan_count, last_scanned FROM barcode_history
             ORDER BY scan_count DESC LIMIT 5",
        )?;
        let rows: DbResult<Vec<TopScanned>> = stmt
            .query_map([], |row| {
                Ok(TopScanned {
                    name: row.get(0)?,
                    count: row.get(1)?,
                    last_scanned: row.get(2)?,
                })
            })?
            .collect();
        rows?
    };

    let weekly_additions: i64 = conn.query_row(
        "SELECT COUNT(*) FROM products WHERE created_at >= ?1",
        params![week_ago],
        |row| row.get(0),
    )?;

    let avg_by_category = {
        let mut stmt = conn.prepare(
            "SELECT category, AVG(price) FROM products
             WHERE category IS NOT NULL AND category != '' AND price > 0
             GROUP BY category",
        )?;
        let rows: DbResult<Vec<CategoryAvgPrice>> = stmt
            .query_map([], |row| {
                Ok(CategoryAvgPrice {
                    category: row.get(0)?,
                    avg_price: round2(row.get(1)?),
                })
            })?
            .collect();
        rows?
    };

    Ok(AdvancedStatistics {
        waste: WasteStats {
            count: waste_count,
            value: round2(waste_value.unwrap_or(0.0)),
        },
        by_category,
        top_scanned,
        weekly_additions,
        avg_by_category,
    })
}
