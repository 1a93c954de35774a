use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Map, Value};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::columns::{self, ColumnGuess};
use crate::csv_io;
use crate::dataset::{classify_dataset, Cell, Dataset, Summary};
use crate::excel;
use crate::decision::Decision;
use crate::moderator::{anon_hash, classify};
use crate::policy::{HotPolicy, Policy};

/// How many finished reports stay downloadable.
const RESULT_CACHE_CAP: usize = 32;

#[derive(Clone)]
pub struct AppState {
    policy: Arc<HotPolicy>,
    results: Arc<ResultCache>,
}

impl AppState {
    pub fn new(policy: HotPolicy) -> Self {
        Self {
            policy: Arc::new(policy),
            results: Arc::new(ResultCache::with_capacity(RESULT_CACHE_CAP)),
        }
    }

    /// Policy file from `$MODERATOR_POLICY_PATH` or `config/policy.toml`.
    pub fn from_env() -> Self {
        Self::new(HotPolicy::new(None))
    }

    fn policy_with(&self, overrides: Option<&Map<String, Value>>) -> Policy {
        let base = self.policy.current();
        match overrides {
            Some(o) => base.with_overrides(o),
            None => base,
        }
    }
}

/// Bounded in-memory store of finished CSV reports keyed by token.
#[derive(Debug)]
struct ResultCache {
    cap: usize,
    inner: Mutex<VecDeque<(String, Vec<u8>)>>,
}

impl ResultCache {
    fn with_capacity(cap: usize) -> Self {
        Self {
            cap: cap.max(1),
            inner: Mutex::new(VecDeque::with_capacity(cap)),
        }
    }

    fn put(&self, token: String, bytes: Vec<u8>) {
        let mut q = match self.inner.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        q.retain(|(t, _)| *t != token);
        if q.len() >= self.cap {
            q.pop_front();
        }
        q.push_back((token, bytes));
    }

    fn get(&self, token: &str) -> Option<Vec<u8>> {
        let q = match self.inner.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        q.iter().find(|(t, _)| t == token).map(|(_, b)| b.clone())
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/policy", get(current_policy))
        .route("/classify", post(classify_one))
        .route("/moderate", post(moderate_json))
        .route("/moderate/csv", post(moderate_csv))
        .route("/moderate/excel", post(moderate_excel))
        .route("/download/{token}", get(download))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// User-facing error: status + Spanish message as `{ "error": ... }`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

async fn current_policy(State(state): State<AppState>) -> Json<Policy> {
    Json(state.policy.current())
}

#[derive(serde::Deserialize)]
struct ClassifyReq {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    policy: Option<Map<String, Value>>,
}

async fn classify_one(
    State(state): State<AppState>,
    Json(body): Json<ClassifyReq>,
) -> Json<Decision> {
    let policy = state.policy_with(body.policy.as_ref());
    Json(classify(body.text.as_deref(), &policy, false))
}

#[derive(serde::Deserialize)]
struct ModerateReq {
    columns: Vec<String>,
    /// Scalars of any JSON type; numbers and booleans are read as their text.
    #[serde(default)]
    rows: Vec<Vec<Value>>,
    #[serde(default)]
    review_column: Option<String>,
    #[serde(default)]
    policy: Option<Map<String, Value>>,
}

/// Query string of the file-upload routes.
#[derive(serde::Deserialize)]
struct UploadQuery {
    #[serde(default)]
    review_column: Option<String>,
    /// Policy overrides as a JSON object, e.g. `{"deny_if_contains_url":false}`.
    #[serde(default)]
    policy: Option<String>,
    /// Workbook sheet; the first sheet when absent. Ignored for CSV.
    #[serde(default)]
    sheet: Option<String>,
}

impl UploadQuery {
    fn overrides(&self) -> Result<Option<Map<String, Value>>, ApiError> {
        let Some(raw) = self.policy.as_deref().map(str::trim).filter(|p| !p.is_empty()) else {
            return Ok(None);
        };
        serde_json::from_str::<Map<String, Value>>(raw)
            .map(Some)
            .map_err(|e| {
                let detail = e.to_string();
                warn!(error = %detail, "policy query parameter is not a JSON object");
                ApiError::bad_request(
                    "El parámetro policy debe ser un objeto JSON con las opciones a modificar.",
                )
            })
    }
}

fn json_cell(value: Value) -> Result<Cell, ApiError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        Value::Array(_) | Value::Object(_) => Err(ApiError::bad_request(
            "Cada celda debe ser texto, número, booleano o null.",
        )),
    }
}

#[derive(Debug, serde::Serialize)]
struct ModerateResp {
    review_column: String,
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
    summary: Summary,
    download_token: String,
}

async fn moderate_json(
    State(state): State<AppState>,
    Json(body): Json<ModerateReq>,
) -> Result<Json<ModerateResp>, ApiError> {
    let policy = state.policy_with(body.policy.as_ref());
    let rows = body
        .rows
        .into_iter()
        .map(|r| r.into_iter().map(json_cell).collect::<Result<Vec<_>, _>>())
        .collect::<Result<Vec<_>, _>>()?;
    let ds = Dataset::new(body.columns, rows);
    moderate(&state, ds, body.review_column.as_deref(), &policy).map(Json)
}

async fn moderate_csv(
    State(state): State<AppState>,
    Query(q): Query<UploadQuery>,
    body: Bytes,
) -> Result<Json<ModerateResp>, ApiError> {
    let policy = state.policy_with(q.overrides()?.as_ref());
    let ds = csv_io::read_csv(&body).map_err(|e| unreadable_upload("CSV", e))?;
    moderate(&state, ds, q.review_column.as_deref(), &policy).map(Json)
}

async fn moderate_excel(
    State(state): State<AppState>,
    Query(q): Query<UploadQuery>,
    body: Bytes,
) -> Result<Json<ModerateResp>, ApiError> {
    let policy = state.policy_with(q.overrides()?.as_ref());
    let ds = excel::read_excel(&body, q.sheet.as_deref())
        .map_err(|e| unreadable_upload("spreadsheet", e))?;
    moderate(&state, ds, q.review_column.as_deref(), &policy).map(Json)
}

fn unreadable_upload(kind: &str, e: anyhow::Error) -> ApiError {
    let detail = format!("{e:#}");
    warn!(%kind, error = %detail, "unreadable upload");
    ApiError::bad_request(format!("No pude leer el archivo: {e}"))
}

/// Shared upload pipeline: clean-up, column choice, classification, report, cache.
fn moderate(
    state: &AppState,
    mut ds: Dataset,
    requested_column: Option<&str>,
    policy: &Policy,
) -> Result<ModerateResp, ApiError> {
    if ds.is_empty() {
        return Err(ApiError::bad_request("El archivo no tiene filas."));
    }
    columns::prepare(&mut ds);

    let review_column = match columns::resolve_review_column(&ds, requested_column) {
        ColumnGuess::Found { column } => column,
        ColumnGuess::Undetermined { .. } => {
            return Err(ApiError::bad_request(format!(
                "No pude identificar la columna de reseñas. Asegúrate de tener una columna llamada \
                 por ejemplo: Reseña, Review, Comentario, Texto. Columnas disponibles: {}",
                ds.columns.join(", ")
            )));
        }
    };

    let run = classify_dataset(&ds, &review_column, policy)
        .map_err(|e| ApiError::bad_request(e.to_string()))?;
    let summary = run.summary();
    let report = run.report();

    let bytes = csv_io::write_csv(&report).map_err(|e| {
        let detail = format!("{e:#}");
        warn!(error = %detail, "report serialization failed");
        ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "No pude generar el archivo de resultados.".to_string(),
        }
    })?;
    let token = anon_hash(&bytes);
    state.results.put(token.clone(), bytes);
    info!(%token, rows = summary.total, column = %review_column, "report ready");

    Ok(ModerateResp {
        review_column,
        columns: report.columns,
        rows: report.rows,
        summary,
        download_token: token,
    })
}

async fn download(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Response, ApiError> {
    let bytes = state.results.get(&token).ok_or_else(|| {
        ApiError::not_found("El archivo ya no está disponible. Vuelve a procesar el dataset.")
    })?;
    let disposition = format!("attachment; filename=\"resultado_{token}.csv\"");
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_cache_is_bounded_and_replaces_same_token() {
        let cache = ResultCache::with_capacity(2);
        cache.put("a".into(), vec![1]);
        cache.put("b".into(), vec![2]);
        cache.put("a".into(), vec![3]);
        assert_eq!(cache.get("a"), Some(vec![3]));
        cache.put("c".into(), vec![4]);
        assert_eq!(cache.get("b"), None);
        assert_eq!(cache.get("c"), Some(vec![4]));
    }
}
