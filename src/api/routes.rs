//! API route handlers.
//!
//! All endpoints return JSON. State is shared via `Arc<ApiState>`.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::estimator::commune::{CommuneAggregator, PriceMetrics};
use crate::estimator::ComparableSalesEstimator;
use crate::registry::cadastre::ParcelInfo;
use crate::registry::ParcelLookup;
use crate::types::{Coordinate, EstimateResult, KompasError};
use crate::valuation::deductions::DeductionItem;
use crate::valuation::{ValuationInputs, ValuationPolicy, ValuationReport};

/// Longest diagnostic echoed back in a server-error body.
const MAX_ERROR_DETAIL_CHARS: usize = 300;

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Shared state accessible by all route handlers.
pub struct ApiState {
    pub estimator: ComparableSalesEstimator,
    pub commune: CommuneAggregator,
    pub parcels: Arc<dyn ParcelLookup>,
    pub valuation: ValuationPolicy,
}

pub type AppState = Arc<ApiState>;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error body shape: `{ ok: false, error, details?, insee? }`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error: String,
    details: Option<String>,
    insee: Option<String>,
}

impl ApiError {
    pub fn from_kompas(err: KompasError) -> Self {
        match err {
            KompasError::InvalidInput(msg) => Self {
                status: StatusCode::BAD_REQUEST,
                error: msg,
                details: None,
                insee: None,
            },
            KompasError::NotFound(code) => Self {
                status: StatusCode::NOT_FOUND,
                error: "No DVF data for this commune.".to_string(),
                details: None,
                insee: Some(code),
            },
            KompasError::Transport { .. } => {
                warn!(error = %err, "Upstream registry unavailable");
                Self {
                    status: StatusCode::BAD_GATEWAY,
                    error: "Upstream registry unavailable".to_string(),
                    details: Some(truncate(&err.to_string(), MAX_ERROR_DETAIL_CHARS)),
                    insee: None,
                }
            }
            other => Self::server_error(&other),
        }
    }

    /// Catch-all for unexpected conditions.
    pub fn server_error(err: &dyn std::fmt::Display) -> Self {
        let details = truncate(&err.to_string(), MAX_ERROR_DETAIL_CHARS);
        error!(details = %details, "Request failed");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: "Server error".to_string(),
            details: Some(details),
            insee: None,
        }
    }
}

impl From<KompasError> for ApiError {
    fn from(err: KompasError) -> Self {
        Self::from_kompas(err)
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::from_kompas(KompasError::InvalidInput(rejection.body_text()))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::from_kompas(KompasError::InvalidInput(truncate(
            &rejection.body_text(),
            MAX_ERROR_DETAIL_CHARS,
        )))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({ "ok": false, "error": self.error });
        if let Some(details) = self.details {
            body["details"] = json!(details);
        }
        if let Some(insee) = self.insee {
            body["insee"] = json!(insee);
        }
        (self.status, Json(body)).into_response()
    }
}

/// Cut `s` to at most `max` characters, on a char boundary.
pub fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct PointQuery {
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub insee: Option<String>,
}

impl PointQuery {
    fn coordinate(&self) -> Result<Coordinate, KompasError> {
        Coordinate::new(self.lat, self.lon)
    }
}

#[derive(Debug, Deserialize)]
pub struct CommuneQuery {
    #[serde(default)]
    pub insee: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommuneResponse {
    pub ok: bool,
    pub insee: String,
    pub metrics: Option<PriceMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub links: CommuneLinks,
    pub meta: ResponseMeta,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommuneLinks {
    pub source: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResponseMeta {
    pub timestamp: String,
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// GET /api/estimate?lat=&lon=
pub async fn get_estimate(
    State(state): State<AppState>,
    query: Result<Query<PointQuery>, QueryRejection>,
) -> Result<Json<EstimateResult>, ApiError> {
    let Query(q) = query?;
    let coord = q.coordinate()?;
    let result = state.estimator.estimate(coord).await;
    info!(%coord, result = %result, "Estimate served");
    Ok(Json(result))
}

/// GET /api/commune?insee=XXXXX
pub async fn get_commune(
    State(state): State<AppState>,
    query: Result<Query<CommuneQuery>, QueryRejection>,
) -> Result<Json<CommuneResponse>, ApiError> {
    let Query(q) = query?;
    let insee = q.insee.unwrap_or_default();
    let summary = state.commune.summarize(&insee).await?;
    Ok(Json(CommuneResponse {
        ok: true,
        insee: summary.insee,
        metrics: summary.metrics,
        note: summary.note,
        links: CommuneLinks {
            source: summary.source_url,
        },
        meta: ResponseMeta {
            timestamp: summary.generated_at.to_rfc3339(),
        },
    }))
}

/// POST /api/valuation
pub async fn post_valuation(
    State(state): State<AppState>,
    body: Result<Json<ValuationInputs>, JsonRejection>,
) -> Result<Json<ValuationReport>, ApiError> {
    let Json(inputs) = body?;
    let report = state.valuation.evaluate(&inputs)?;
    Ok(Json(report))
}

/// GET /api/deductions
pub async fn get_deductions(State(state): State<AppState>) -> Json<Vec<DeductionItem>> {
    Json(state.valuation.catalog.clone())
}

/// GET /api/parcel?lat=&lon=&insee=
pub async fn get_parcel(
    State(state): State<AppState>,
    query: Result<Query<PointQuery>, QueryRejection>,
) -> Result<Json<Option<ParcelInfo>>, ApiError> {
    let Query(q) = query?;
    let coord = q.coordinate()?;
    let parcel = state.parcels.lookup(coord, q.insee.as_deref()).await?;
    Ok(Json(parcel))
}

/// GET /health
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "ok": true, "timestamp": Utc::now().to_rfc3339() }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
