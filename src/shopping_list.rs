//! Shopping list repository
//!
//! Manual CRUD plus auto-generation from expired and low-stock products.
//! Listing puts unchecked items first, newest first within each group.

use crate::database::DbResult;
use crate::error::Result;
use crate::sanitize::{parse_quantity, require_name, sanitize_text};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A shopping list row (for API responses)
#[derive(Debug, Clone, Serialize)]
pub struct ShoppingItem {
    pub id: i64,
    pub name: String,
    pub quantity: i64,
    pub category: Option<String>,
    pub checked: bool,
    pub notes: Option<String>,
    pub created_at: Option<String>,
}

/// Raw create/update request body.
#[derive(Debug, Default, Deserialize)]
pub struct ShoppingItemInput {
    pub name: Option<String>,
    pub quantity: Option<Value>,
    pub category: Option<String>,
    #[serde(default)]
    pub checked: bool,
    pub notes: Option<String>,
}

/// All items, unchecked first, newest first.
pub fn list(conn: &Connection) -> DbResult<Vec<ShoppingItem>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, quantity, category, checked, notes, created_at
         FROM shopping_list
         ORDER BY checked ASC, created_at DESC",
    )?;
    let items: DbResult<Vec<ShoppingItem>> = stmt
        .query_map([], |row| {
            Ok(ShoppingItem {
                id: row.get(0)?,
                name: row.get(1)?,
                quantity: row.get(2)?,
                category: row.get(3)?,
                checked: row.get(4)?,
                notes: row.get(5)?,
                created_at: row.get(6)?,
            })
        })?
        .collect();
    items
}

/// Add an item. Name is required; quantity defaults to 1.
pub fn create(conn: &Connection, input: &ShoppingItemInput) -> Result<i64> {
    let name = require_name(input.name.clone(), 200, "Name")?;
    let quantity = parse_quantity(input.quantity.as_ref())?;

    conn.execute(
        "INSERT INTO shopping_list (name, quantity, category, notes) VALUES (?1, ?2, ?3, ?4)",
        params![
            name,
            quantity,
            sanitize_text(input.category.clone(), 50),
            sanitize_text(input.notes.clone(), 500),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Full replace of name, quantity and checked state. Rows that don't exist
/// are silently ignored (blind update, matching delete below).
pub fn update(conn: &Connection, id: i64, input: &ShoppingItemInput) -> Result<()> {
    let name = require_name(input.name.clone(), 200, "Name")?;
    let quantity = parse_quantity(input.quantity.as_ref())?;

    conn.execute(
        "UPDATE shopping_list SET checked = ?1, name = ?2, quantity = ?3 WHERE id = ?4",
        params![input.checked, name, quantity, id],
    )?;
    Ok(())
}

/// Remove an item by id (blind delete).
pub fn delete(conn: &Connection, id: i64) -> DbResult<()> {
    conn.execute("DELETE FROM shopping_list WHERE id = ?1", params![id])?;
    Ok(())
}

/// Remove every checked item.
pub fn clear_checked(conn: &Connection) -> DbResult<()> {
    conn.execute("DELETE FROM shopping_list WHERE checked = 1", [])?;
    Ok(())
}

/// Note attached to auto-generated entries.
const GENERATED_NOTE: &str = "Auto-generated";

/// Generate entries from products that are expired or down to their last
/// unit, skipping names already on the list (checked or not). Returns the
/// number of rows inserted.
pub fn generate(conn: &mut Connection) -> DbResult<usize> {
    generate_at(conn, &crate::database::today_date())
}

/// Inner generate that accepts an explicit date — used in tests.
fn generate_at(conn: &mut Connection, today: &str) -> DbResult<usize> {
    let tx = conn.transaction()?;

    let candidates: Vec<(String, Option<String>)> = {
        let mut stmt = tx.prepare(
            "SELECT DISTINCT name, category FROM products
             WHERE (expiry_date < ?1 OR quantity <= 1)
             AND name NOT IN (SELECT name FROM shopping_list)",
        )?;
        let rows: DbResult<Vec<(String, Option<String>)>> = stmt
            .query_map(params![today], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect();
        rows?
    };

    let mut added = 0;
    {
        let mut insert = tx.prepare_cached(
            "INSERT INTO shopping_list (name, quantity, category, notes) VALUES (?1, 1, ?2, ?3)",
        )?;
        for (name, category) in &candidates {
            insert.execute(params![name, category, GENERATED_NOTE])?;
            added += 1;
        }
    }

    tx.commit()?;
    log::info!("Generated {} shopping list entries", added);
    Ok(added)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{apply_migrations, init_schema};
    use crate::error::AppError;
    use serde_json::json;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        apply_migrations(&conn).unwrap();
        conn
    }

    fn add_product(conn: &Connection, name: &str, quantity: i64, expiry: Option<&str>) {
        conn.execute(
            "INSERT INTO products (name, quantity, expiry_date) VALUES (?1, ?2, ?3)",
            params![name, quantity, expiry],
        )
        .unwrap();
    }

    #[test]
    fn create_and_list_roundtrip() {
        let conn = test_conn();
        let id = create(
            &conn,
            &ShoppingItemInput {
                name: Some(" Eggs ".to_string()),
                quantity: Some(json!(12)),
                category: Some("Dairy".to_string()),
                ..Default::default()
            },
        )
        .unwrap();

        let items = list(&conn).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, id);
        assert_eq!(items[0].name, "Eggs");
        assert_eq!(items[0].quantity, 12);
        assert!(!items[0].checked);
    }

    #[test]
    fn create_rejects_empty_name() {
        let conn = test_conn();
        assert!(matches!(
            create(&conn, &ShoppingItemInput::default()),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn list_orders_unchecked_first() {
        let conn = test_conn();
        for name in ["first", "second"] {
            create(
                &conn,
                &ShoppingItemInput {
                    name: Some(name.to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        }
        let id = list(&conn).unwrap()[0].id;
        update(
            &conn,
            id,
            &ShoppingItemInput {
                name: Some("first".to_string()),
                checked: true,
                ..Default::default()
            },
        )
        .unwrap();

        let items = list(&conn).unwrap();
        assert!(!items[0].checked);
        assert!(items[1].checked);
    }

    #[test]
    fn update_replaces_name_quantity_checked() {
        let conn = test_conn();
        let id = create(
            &conn,
            &ShoppingItemInput {
                name: Some("Eggs".to_string()),
                ..Default::default()
            },
        )
        .unwrap();

        update(
            &conn,
            id,
            &ShoppingItemInput {
                name: Some("Free-range eggs".to_string()),
                quantity: Some(json!(6)),
                checked: true,
                ..Default::default()
            },
        )
        .unwrap();

        let items = list(&conn).unwrap();
        assert_eq!(items[0].name, "Free-range eggs");
        assert_eq!(items[0].quantity, 6);
        assert!(items[0].checked);
    }

    #[test]
    fn clear_checked_removes_only_checked_rows() {
        let conn = test_conn();
        let a = create(
            &conn,
            &ShoppingItemInput {
                name: Some("keep".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        let b = create(
            &conn,
            &ShoppingItemInput {
                name: Some("done".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        update(
            &conn,
            b,
            &ShoppingItemInput {
                name: Some("done".to_string()),
                checked: true,
                ..Default::default()
            },
        )
        .unwrap();

        clear_checked(&conn).unwrap();

        let items = list(&conn).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, a);
    }

    #[test]
    fn delete_removes_row() {
        let conn = test_conn();
        let id = create(
            &conn,
            &ShoppingItemInput {
                name: Some("Eggs".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        delete(&conn, id).unwrap();
        assert!(list(&conn).unwrap().is_empty());
        // Deleting again is a silent no-op.
        delete(&conn, id).unwrap();
    }

    #[test]
    fn generate_picks_expired_and_low_stock() {
        let mut conn = test_conn();
        add_product(&conn, "Old Milk", 3, Some("2026-01-01"));
        add_product(&conn, "Last Apple", 1, Some("2099-01-01"));
        add_product(&conn, "Plenty", 10, Some("2099-01-01"));

        let added = generate_at(&mut conn, "2026-08-07").unwrap();
        assert_eq!(added, 2);

        let names: Vec<String> = list(&conn).unwrap().into_iter().map(|i| i.name).collect();
        assert!(names.contains(&"Old Milk".to_string()));
        assert!(names.contains(&"Last Apple".to_string()));
        assert!(!names.contains(&"Plenty".to_string()));
    }

    #[test]
    fn generate_skips_names_already_listed_even_checked() {
        let mut conn = test_conn();
        add_product(&conn, "Old Milk", 1, Some("2026-01-01"));
        let id = create(
            &conn,
            &ShoppingItemInput {
                name: Some("Old Milk".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        update(
            &conn,
            id,
            &ShoppingItemInput {
                name: Some("Old Milk".to_string()),
                checked: true,
                ..Default::default()
            },
        )
        .unwrap();

        let added = generate_at(&mut conn, "2026-08-07").unwrap();
        assert_eq!(added, 0);
        assert_eq!(list(&conn).unwrap().len(), 1);
    }

    #[test]
    fn generate_deduplicates_product_names() {
        let mut conn = test_conn();
        add_product(&conn, "Old Milk", 1, Some("2026-01-01"));
        add_product(&conn, "Old Milk", 1, Some("2026-02-01"));

        let added = generate_at(&mut conn, "2026-08-07").unwrap();
        assert_eq!(added, 1);
    }

    #[test]
    fn generate_marks_entries() {
        let mut conn = test_conn();
        add_product(&conn, "Old Milk", 1, Some("2026-01-01"));
        generate_at(&mut conn, "2026-08-07").unwrap();

        let items = list(&conn).unwrap();
        assert_eq!(items[0].quantity, 1);
        assert_eq!(items[0].notes.as_deref(), Some(GENERATED_NOTE));
    }
}
