//! Product repository
//!
//! CRUD over the `products` table plus batch operations and duplicate
//! detection. Create and delete fold the product's metadata into the
//! barcode history ledger inside the same transaction; batch delete
//! deliberately does neither (see DESIGN.md).

use crate::database::{today_date, DbResult};
use crate::error::{AppError, Result};
use crate::history::{self, Snapshot};
use crate::image_store::ImageStore;
use crate::sanitize::{parse_price, parse_product_quantity, require_name, sanitize_text};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A product row (for API responses)
#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub id: i64,
    pub ean: Option<String>,
    pub name: String,
    pub expiry_date: Option<String>,
    pub purchase_date: Option<String>,
    pub location: Option<String>,
    pub quantity: i64,
    pub weight_volume: Option<String>,
    pub notes: Option<String>,
    pub is_vegetarian: bool,
    pub is_vegan: bool,
    pub price: f64,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub tags: Option<String>,
    pub scan_count: i64,
    pub last_scanned: Option<String>,
    pub created_at: Option<String>,
}

/// Raw create/update request body. Numeric fields arrive as arbitrary JSON
/// values and are coerced during validation.
#[derive(Debug, Default, Deserialize)]
pub struct ProductInput {
    pub ean: Option<String>,
    pub name: Option<String>,
    pub expiry_date: Option<String>,
    pub purchase_date: Option<String>,
    pub location: Option<String>,
    pub quantity: Option<Value>,
    pub weight_volume: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub is_vegetarian: bool,
    #[serde(default)]
    pub is_vegan: bool,
    pub price: Option<Value>,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub tags: Option<String>,
}

/// Sanitized, validated product fields ready for a SQL statement.
struct ValidatedProduct {
    ean: Option<String>,
    name: String,
    expiry_date: Option<String>,
    purchase_date: Option<String>,
    location: Option<String>,
    quantity: i64,
    weight_volume: Option<String>,
    notes: Option<String>,
    is_vegetarian: bool,
    is_vegan: bool,
    price: f64,
    category: Option<String>,
    tags: Option<String>,
}

/// Validate and sanitize an inbound product body.
///
/// `default_purchase_to_today` applies only on create; updates replace the
/// field with exactly what the client sent.
fn validate(input: &ProductInput, default_purchase_to_today: bool) -> Result<ValidatedProduct> {
    let name = require_name(input.name.clone(), 200, "Product name")?;
    let quantity = parse_product_quantity(input.quantity.as_ref())?;
    let price = parse_price(input.price.as_ref())?;

    let purchase_date = match (&input.purchase_date, default_purchase_to_today) {
        (None, true) => Some(today_date()),
        _ => sanitize_text(input.purchase_date.clone(), 20),
    };

    Ok(ValidatedProduct {
        ean: sanitize_text(input.ean.clone(), 50),
        name,
        expiry_date: sanitize_text(input.expiry_date.clone(), 20),
        purchase_date,
        location: sanitize_text(input.location.clone(), 100),
        quantity,
        weight_volume: sanitize_text(input.weight_volume.clone(), 50),
        notes: sanitize_text(input.notes.clone(), 1000),
        is_vegetarian: input.is_vegetarian,
        is_vegan: input.is_vegan,
        price,
        category: sanitize_text(input.category.clone(), 50),
        tags: sanitize_text(input.tags.clone(), 200),
    })
}

impl ValidatedProduct {
    fn history_snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            name: &self.name,
            category: self.category.as_deref(),
            weight_volume: self.weight_volume.as_deref(),
            tags: self.tags.as_deref(),
            is_vegetarian: self.is_vegetarian,
            is_vegan: self.is_vegan,
        }
    }
}

fn product_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Product> {
    Ok(Product {
        id: row.get(0)?,
        ean: row.get(1)?,
        name: row.get(2)?,
        expiry_date: row.get(3)?,
        purchase_date: row.get(4)?,
        location: row.get(5)?,
        quantity: row.get(6)?,
        weight_volume: row.get(7)?,
        notes: row.get(8)?,
        is_vegetarian: row.get(9)?,
        is_vegan: row.get(10)?,
        price: row.get(11)?,
        image_url: row.get(12)?,
        category: row.get(13)?,
        tags: row.get(14)?,
        scan_count: row.get(15)?,
        last_scanned: row.get(16)?,
        created_at: row.get(17)?,
    })
}

const PRODUCT_COLUMNS: &str = "id, ean, name, expiry_date, purchase_date, location, quantity, \
     weight_volume, notes, is_vegetarian, is_vegan, price, image_url, category, tags, \
     scan_count, last_scanned, created_at";

/// All products, unfiltered.
pub fn list(conn: &Connection) -> DbResult<Vec<Product>> {
    let mut stmt = conn.prepare(&format!("SELECT {} FROM products", PRODUCT_COLUMNS))?;
    let products: DbResult<Vec<Product>> = stmt.query_map([], product_from_row)?.collect();
    products
}

/// Create a product and return its id.
///
/// Inline data-URI images are persisted through the image store and the
/// stored URL replaces the raw payload; a failed save falls back to empty.
/// A non-empty barcode also touches the history ledger, atomically with the
/// insert.
pub fn create(conn: &mut Connection, images: &ImageStore, input: &ProductInput) -> Result<i64> {
    let product = validate(input, true)?;

    let image_url = match input.image_url.as_deref() {
        Some(raw) if raw.starts_with("data:image") => {
            images.save_data_uri(raw).unwrap_or_default()
        }
        Some(raw) => raw.to_string(),
        None => String::new(),
    };

    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO products
         (ean, name, expiry_date, purchase_date, location, quantity, weight_volume,
          notes, is_vegetarian, is_vegan, price, image_url, category, tags)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            product.ean,
            product.name,
            product.expiry_date,
            product.purchase_date,
            product.location,
            product.quantity,
            product.weight_volume,
            product.notes,
            product.is_vegetarian,
            product.is_vegan,
            product.price,
            image_url,
            product.category,
            product.tags,
        ],
    )?;
    let id = tx.last_insert_rowid();

    if let Some(ean) = product.ean.as_deref().filter(|e| !e.is_empty()) {
        history::touch_tx(&tx, ean, &product.history_snapshot())?;
    }

    tx.commit()?;
    Ok(id)
}

/// Full replace of all mutable fields of an existing product.
///
/// Image handling: a new inline image supersedes (and afterwards deletes)
/// the old managed file; an empty reference clears it; an absent reference
/// preserves it; any other value is stored verbatim.
pub fn update(
    conn: &mut Connection,
    images: &ImageStore,
    id: i64,
    input: &ProductInput,
) -> Result<()> {
    let product = validate(input, false)?;

    let tx = conn.transaction()?;
    let old_image: Option<String> = tx
        .query_row(
            "SELECT image_url FROM products WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )
        .optional()?
        .ok_or_else(|| AppError::NotFound(format!("Product with ID {} not found", id)))?;
    let old_image = old_image.unwrap_or_default();

    let raw = input.image_url.as_deref().unwrap_or_default();
    let mut stale_image: Option<String> = None;
    let image_url = if raw.starts_with("data:image") {
        match images.save_data_uri(raw) {
            Some(new_url) => {
                if ImageStore::is_managed(&old_image) {
                    stale_image = Some(old_image.clone());
                }
                new_url
            }
            // Save failed: keep the prior reference untouched.
            None => old_image.clone(),
        }
    } else if raw.is_empty() && !old_image.is_empty() {
        if ImageStore::is_managed(&old_image) {
            stale_image = Some(old_image.clone());
        }
        String::new()
    } else if raw.is_empty() {
        old_image.clone()
    } else {
        raw.to_string()
    };

    tx.execute(
        "UPDATE products SET
             name = ?1, expiry_date = ?2, purchase_date = ?3, location = ?4,
             quantity = ?5, weight_volume = ?6, notes = ?7, is_vegetarian = ?8,
             is_vegan = ?9, price = ?10, image_url = ?11, category = ?12, tags = ?13
         WHERE id = ?14",
        params![
            product.name,
            product.expiry_date,
            product.purchase_date,
            product.location,
            product.quantity,
            product.weight_volume,
            product.notes,
            product.is_vegetarian,
            product.is_vegan,
            product.price,
            image_url,
            product.category,
            product.tags,
            id,
        ],
    )?;
    tx.commit()?;

    // Old file removal happens only after the new reference is durable.
    if let Some(url) = stale_image {
        images.delete(&url);
    }
    Ok(())
}

/// Delete a product, folding its metadata into the barcode history first so
/// deletion is non-destructive to the ledger. The managed image file is
/// removed best-effort after commit.
pub fn delete(conn: &mut Connection, images: &ImageStore, id: i64) -> Result<()> {
    let tx = conn.transaction()?;

    struct Doomed {
        image_url: Option<String>,
        ean: Option<String>,
        name: String,
        category: Option<String>,
        weight_volume: Option<String>,
        tags: Option<String>,
        is_vegetarian: bool,
        is_vegan: bool,
    }

    let doomed = tx
        .query_row(
            "SELECT image_url, ean, name, category, weight_volume, tags,
                    is_vegetarian, is_vegan
             FROM products WHERE id = ?1",
            params![id],
            |row| {
                Ok(Doomed {
                    image_url: row.get(0)?,
                    ean: row.get(1)?,
                    name: row.get(2)?,
                    category: row.get(3)?,
                    weight_volume: row.get(4)?,
                    tags: row.get(5)?,
                    is_vegetarian: row.get(6)?,
                    is_vegan: row.get(7)?,
                })
            },
        )
        .optional()?
        .ok_or_else(|| AppError::NotFound(format!("Product with ID {} not found", id)))?;

    if let Some(ean) = doomed.ean.as_deref().filter(|e| !e.is_empty()) {
        let snapshot = Snapshot {
            name: &doomed.name,
            category: doomed.category.as_deref(),
            weight_volume: doomed.weight_volume.as_deref(),
            tags: doomed.tags.as_deref(),
            is_vegetarian: doomed.is_vegetarian,
            is_vegan: doomed.is_vegan,
        };
        history::touch_tx(&tx, ean, &snapshot)?;
    }

    tx.execute("DELETE FROM products WHERE id = ?1", params![id])?;
    tx.commit()?;

    if let Some(url) = doomed.image_url.as_deref().filter(|u| ImageStore::is_managed(u)) {
        images.delete(url);
    }
    Ok(())
}

/// Batch request body for `POST /products/batch`.
#[derive(Debug, Default, Deserialize)]
pub struct BatchRequest {
    pub operation: Option<String>,
    #[serde(default)]
    pub product_ids: Vec<i64>,
    pub location: Option<String>,
}

/// Apply a batch operation across all given ids in one bulk statement.
///
/// Unlike single delete, batch delete does not touch barcode history and
/// does not remove image files.
pub fn batch(conn: &Connection, request: &BatchRequest) -> Result<usize> {
    let operation = request.operation.as_deref().unwrap_or_default();
    if operation.is_empty() || request.product_ids.is_empty() {
        return Err(AppError::Validation(
            "Operation and product_ids are required".to_string(),
        ));
    }

    let placeholders = vec!["?"; request.product_ids.len()].join(",");
    match operation {
        "delete" => {
            let sql = format!("DELETE FROM products WHERE id IN ({})", placeholders);
            conn.execute(&sql, params_from_iter(request.product_ids.iter()))?;
        }
        "update_location" => {
            let location = sanitize_text(request.location.clone(), 100);
            let sql = format!(
                "UPDATE products SET location = ? WHERE id IN ({})",
                placeholders
            );
            let mut values: Vec<rusqlite::types::Value> =
                Vec::with_capacity(request.product_ids.len() + 1);
            values.push(location.into());
            values.extend(request.product_ids.iter().map(|id| (*id).into()));
            conn.execute(&sql, params_from_iter(values))?;
        }
        _ => return Err(AppError::Validation("Invalid operation".to_string())),
    }
    Ok(request.product_ids.len())
}

/// Duplicate check result
#[derive(Debug, Serialize)]
pub struct DuplicateCheck {
    pub found: bool,
    pub duplicates: Vec<Product>,
}

/// Find potential duplicates: all products sharing a non-empty barcode, or,
/// only when the barcode finds nothing, up to 5 case-insensitive name
/// matches. Capped at 5 rows total.
pub fn check_duplicate(
    conn: &Connection,
    ean: Option<&str>,
    name: Option<&str>,
) -> DbResult<DuplicateCheck> {
    let mut duplicates: Vec<Product> = Vec::new();

    if let Some(ean) = ean.filter(|e| !e.is_empty()) {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM products WHERE ean = ?1 AND ean != ''",
            PRODUCT_COLUMNS
        ))?;
        let matches: DbResult<Vec<Product>> =
            stmt.query_map(params![ean], product_from_row)?.collect();
        duplicates.extend(matches?);
    }

    if duplicates.is_empty() {
        if let Some(name) = name.filter(|n| !n.is_empty()) {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM products WHERE LOWER(name) = LOWER(?1) LIMIT 5",
                PRODUCT_COLUMNS
            ))?;
            let matches: DbResult<Vec<Product>> =
                stmt.query_map(params![name], product_from_row)?.collect();
            duplicates.extend(matches?);
        }
    }

    duplicates.truncate(5);
    Ok(DuplicateCheck {
        found: !duplicates.is_empty(),
        duplicates,
    })
}
