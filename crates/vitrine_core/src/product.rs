//! Product domain record.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::agent::RawProduct;

const NAME_KEYS: &[&str] = &["titulo", "nome", "name"];
const PRICE_KEYS: &[&str] = &["preco", "preço", "price"];
const RATING_KEYS: &[&str] = &["rating", "avaliação", "avaliacao"];
const IMAGE_KEYS: &[&str] = &["imagem", "image_url"];
const URL_KEYS: &[&str] = &["url", "url_produto"];
const DESCRIPTION_KEYS: &[&str] = &["descricao", "descrição", "description"];

/// A normalized product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    /// Always present; 0.0 when the source had no usable price
    pub price: f64,
    pub rating: Option<f64>,
    pub image_url: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
}

impl Product {
    pub fn new(name: impl Into<String>, price: f64) -> Self {
        Self {
            name: name.into(),
            price,
            rating: None,
            image_url: None,
            url: None,
            description: None,
        }
    }

    pub fn with_rating(mut self, rating: f64) -> Self {
        self.rating = Some(rating);
        self
    }

    /// Map an upstream product mapping onto fixed field names.
    ///
    /// Field names are resolved through their Portuguese and English aliases;
    /// the first alias present wins.
    pub fn from_raw(raw: &RawProduct) -> Self {
        Self {
            name: first(raw, NAME_KEYS)
                .and_then(as_text)
                .unwrap_or_default(),
            price: first(raw, PRICE_KEYS).and_then(as_price).unwrap_or(0.0),
            rating: first(raw, RATING_KEYS)
                .and_then(as_price)
                .filter(|r| *r != 0.0),
            image_url: first(raw, IMAGE_KEYS).and_then(as_text),
            url: first(raw, URL_KEYS).and_then(as_text),
            description: first(raw, DESCRIPTION_KEYS).and_then(as_text),
        }
    }
}

impl From<&RawProduct> for Product {
    fn from(raw: &RawProduct) -> Self {
        Self::from_raw(raw)
    }
}

fn first<'a>(raw: &'a RawProduct, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| raw.get(*key))
        .find(|value| !value.is_null())
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn as_price(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_price(s),
        _ => None,
    }
}

fn number_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"-?\d[\d.,]*").ok()).as_ref()
}

/// Parse a price such as `"R$ 1.234,56"`, `"99.90"` or `"4,5"`.
///
/// When a comma is present it is taken as the decimal separator and dots as
/// thousands separators. Without a comma, dots that only ever precede groups
/// of exactly three digits (`"1.299"`, `"2.499.000"`) are thousands separators.
pub fn parse_price(raw: &str) -> Option<f64> {
    let cleaned = raw.replace("R$", "");
    let number = number_pattern()?.find(cleaned.trim())?.as_str();
    let normalized = if number.contains(',') {
        number.replace('.', "").replace(',', ".")
    } else if is_thousands_grouped(number) {
        number.replace('.', "")
    } else {
        number.to_string()
    };
    normalized.trim_end_matches('.').parse::<f64>().ok()
}

fn is_thousands_grouped(number: &str) -> bool {
    let mut groups = number.trim_start_matches('-').split('.');
    let lead = groups.next().unwrap_or_default();
    let rest: Vec<&str> = groups.collect();
    !rest.is_empty()
        && (1..=3).contains(&lead.len())
        && rest.iter().all(|g| g.len() == 3 && g.bytes().all(|b| b.is_ascii_digit()))
}

/// Aggregate price statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductStatistics {
    pub average_price: f64,
    pub min_price: f64,
    pub max_price: f64,
    pub product_count: usize,
}

impl ProductStatistics {
    pub fn from_products(products: &[Product]) -> Self {
        if products.is_empty() {
            return Self {
                average_price: 0.0,
                min_price: 0.0,
                max_price: 0.0,
                product_count: 0,
            };
        }

        let prices: Vec<f64> = products.iter().map(|p| p.price).collect();
        Self {
            average_price: prices.iter().sum::<f64>() / prices.len() as f64,
            min_price: prices.iter().copied().fold(f64::INFINITY, f64::min),
            max_price: prices.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            product_count: products.len(),
        }
    }
}
