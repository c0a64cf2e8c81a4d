//! Products API
//!
//! GET /fetch-data - Run the pipeline and return products with chart data

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use vitrine_core::{PipelineRequest, Product};

use crate::chart::ChartData;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct FetchDataQuery {
    pub fetcher: Option<String>,
    pub processor: Option<String>,
    pub formatter: Option<String>,
    pub source: Option<String>,
}

impl From<FetchDataQuery> for PipelineRequest {
    fn from(query: FetchDataQuery) -> Self {
        PipelineRequest {
            source: query.source,
            fetcher: query.fetcher,
            processor: query.processor,
            formatter: query.formatter,
        }
    }
}

/// Body of `/fetch-data`; always served with HTTP 200.
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FetchDataResponse {
    Success {
        success: bool,
        produtos: Vec<Product>,
        dados_grafico: ChartData,
    },
    Failure {
        success: bool,
        error: String,
    },
}

impl FetchDataResponse {
    pub fn success(produtos: Vec<Product>) -> Self {
        let dados_grafico = ChartData::from_products(&produtos);
        Self::Success {
            success: true,
            produtos,
            dados_grafico,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self::Failure {
            success: false,
            error: error.into(),
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/fetch-data", get(fetch_data))
}

async fn fetch_data(
    State(state): State<AppState>,
    query: Result<Query<FetchDataQuery>, QueryRejection>,
) -> Json<FetchDataResponse> {
    let query = match query {
        Ok(Query(query)) => query,
        Err(rejection) => {
            warn!("Rejected /fetch-data query: {}", rejection.body_text());
            return Json(FetchDataResponse::failure(format!(
                "Invalid query parameters: {}",
                rejection.body_text()
            )));
        }
    };

    match state.orchestrator.run(query.into()).await {
        Ok(report) => {
            info!(
                "Run {} returned {} product(s) in {} ms",
                report.run_id,
                report.products.len(),
                report.duration_ms
            );
            Json(FetchDataResponse::success(report.products))
        }
        Err(e) => {
            error!("Failed to fetch or process data ({} stage): {}", e.stage(), e);
            Json(FetchDataResponse::failure(format!(
                "Failed to fetch or process data: {}",
                e
            )))
        }
    }
}
