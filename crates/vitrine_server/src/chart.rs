//! Chart data (`dados_grafico`) derived from a product list.

use serde::{Deserialize, Serialize};
use vitrine_core::Product;

const LABEL_LIMIT: usize = 20;

/// Price series and summary for the dashboard chart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub precos: Vec<f64>,
    pub media: f64,
    pub minimo: f64,
    pub maximo: f64,
}

impl ChartData {
    /// Build from the products that have a positive price.
    pub fn from_products(products: &[Product]) -> Self {
        let priced: Vec<&Product> = products.iter().filter(|p| p.price > 0.0).collect();
        if priced.is_empty() {
            return Self::default();
        }

        let labels = priced
            .iter()
            .enumerate()
            .map(|(i, p)| label(&p.name, i + 1))
            .collect();
        let precos: Vec<f64> = priced.iter().map(|p| p.price).collect();

        Self {
            labels,
            media: precos.iter().sum::<f64>() / precos.len() as f64,
            minimo: precos.iter().copied().fold(f64::INFINITY, f64::min),
            maximo: precos.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            precos,
        }
    }
}

fn label(name: &str, position: usize) -> String {
    let name = name.trim();
    if name.is_empty() {
        return format!("Produto {}", position);
    }
    match name.char_indices().nth(LABEL_LIMIT) {
        Some((end, _)) => format!("{}...", &name[..end]),
        None => name.to_string(),
    }
}
