//! Open Food Facts API client for barcode lookups
//!
//! Uses async reqwest with a fixed short timeout. "Not found" is a normal
//! outcome, reported as `Ok(None)`; timeout and connection failures are
//! distinct error kinds so the web layer can map them to 504 vs 502.

use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Production API base URL
const OFF_BASE_URL: &str = "https://world.openfoodfacts.org";

/// Upstream request timeout
const LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

const USER_AGENT: &str = "KitchenInventory/1.0";

/// Errors from the external product database
#[derive(Debug, Error)]
pub enum LookupError {
    /// The upstream API did not answer within the timeout
    #[error("upstream request timed out")]
    Timeout,
    /// Connection-level failure reaching the upstream API
    #[error("upstream request failed: {0}")]
    Unavailable(reqwest::Error),
    /// The upstream API answered with an error status
    #[error("upstream returned HTTP {0}")]
    Status(reqwest::StatusCode),
    /// The upstream response body could not be decoded
    #[error("failed to decode upstream response: {0}")]
    Decode(reqwest::Error),
}

/// Whether a string is a plausible EAN: 8 to 13 ASCII digits.
pub fn is_valid_ean(ean: &str) -> bool {
    (8..=13).contains(&ean.len()) && ean.bytes().all(|b| b.is_ascii_digit())
}

/// Raw Open Food Facts response envelope
#[derive(Debug, Deserialize)]
struct OffResponse {
    #[serde(default)]
    status: i64,
    #[serde(default)]
    product: Option<OffProduct>,
}

#[derive(Debug, Default, Deserialize)]
struct OffProduct {
    #[serde(default)]
    product_name: Option<String>,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    quantity: Option<String>,
    #[serde(default)]
    brands: Option<String>,
    #[serde(default)]
    categories: Option<String>,
}

/// Product metadata derived from a successful lookup
#[derive(Debug, Clone, PartialEq)]
pub struct ScanInfo {
    pub name: String,
    pub image_url: String,
    pub quantity: String,
    pub brands: String,
    pub category: String,
    pub is_vegetarian: bool,
    pub is_vegan: bool,
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

impl ScanInfo {
    fn from_product(product: OffProduct) -> Self {
        let name = product
            .product_name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "Unknown product".to_string());
        let categories = product.categories.unwrap_or_default();
        let category = categories
            .split(',')
            .next()
            .unwrap_or("")
            .trim()
            .to_string();
        let categories_lower = categories.to_lowercase();

        Self {
            name: truncate_chars(&name, 200),
            image_url: truncate_chars(&product.image_url.unwrap_or_default(), 500),
            quantity: truncate_chars(&product.quantity.unwrap_or_default(), 50),
            brands: truncate_chars(&product.brands.unwrap_or_default(), 200),
            category,
            is_vegetarian: categories_lower.contains("vegetarian"),
            is_vegan: categories_lower.contains("vegan"),
        }
    }
}

/// Client for the external product database
pub struct LookupClient {
    base_url: String,
    client: reqwest::Client,
}

impl Default for LookupClient {
    fn default() -> Self {
        Self::new()
    }
}

impl LookupClient {
    pub fn new() -> Self {
        Self::with_base_url(OFF_BASE_URL)
    }

    /// Client against an explicit base URL — used in tests.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Look up a barcode. `Ok(None)` means the upstream database does not
    /// know the product; errors distinguish timeout from other failures.
    pub async fn lookup(&self, ean: &str) -> Result<Option<ScanInfo>, LookupError> {
        let url = format!("{}/api/v0/product/{}.json", self.base_url, ean);
        log::debug!("Looking up barcode {} at {}", ean, url);

        let response = self
            .client
            .get(&url)
            .timeout(LOOKUP_TIMEOUT)
            .header("User-Agent", USER_AGENT)
            .send()
            .await
            .map_err(classify_send_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::Status(status));
        }

        let body: OffResponse = response.json().await.map_err(classify_body_error)?;
        if body.status == 1 {
            Ok(Some(ScanInfo::from_product(body.product.unwrap_or_default())))
        } else {
            Ok(None)
        }
    }
}

fn classify_send_error(e: reqwest::Error) -> LookupError {
    if e.is_timeout() {
        LookupError::Timeout
    } else {
        LookupError::Unavailable(e)
    }
}

fn classify_body_error(e: reqwest::Error) -> LookupError {
    if e.is_timeout() {
        LookupError::Timeout
    } else {
        LookupError::Decode(e)
    }
}

#[cfg(test)]
#[path = "openfoodfacts_tests.rs"]
mod tests;
