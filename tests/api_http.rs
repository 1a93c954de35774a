// tests/api_http.rs
//
// In-process HTTP tests: build the Router without Shuttle and drive it with `oneshot`.

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use review_moderator::{api, policy::HotPolicy};
use serde_json::{json, Value};
use tower::ServiceExt; // for `oneshot`

fn app() -> Router {
    // Point at a path that does not exist so the built-in defaults apply.
    let hot = HotPolicy::new(Some(std::path::Path::new("config/__missing_policy__.toml")));
    api::create_router(api::AppState::new(hot))
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Vec<u8>) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let (status, bytes) = send(app, req).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn health_and_policy() {
    let app = app();
    let (st, body) = send(
        &app,
        Request::builder().uri("/health").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(st, StatusCode::OK);
    assert_eq!(body, b"ok");

    let (st, body) = send(
        &app,
        Request::builder().uri("/policy").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(st, StatusCode::OK);
    let v: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["min_words_for_approve"], json!(5));
    assert_eq!(v["deny_if_duplicate"], json!(true));
}

#[tokio::test]
async fn classify_single_review() {
    let app = app();
    let (st, v) = post_json(&app, "/classify", json!({ "text": "" })).await;
    assert_eq!(st, StatusCode::OK);
    assert_eq!(v["classification"], json!("Denegar"));
    assert_eq!(v["rule"], json!("empty"));

    let (_, v) = post_json(&app, "/classify", json!({})).await;
    assert_eq!(v["rule"], json!("empty"));

    let (_, v) = post_json(
        &app,
        "/classify",
        json!({ "text": "El envío fue rápido y la calidad del producto es excelente" }),
    )
    .await;
    assert_eq!(v["classification"], json!("Aprobar"));
    assert_eq!(v["human_factor"], json!(""));
}

#[tokio::test]
async fn classify_respects_policy_overrides() {
    let app = app();
    let text = "Más detalles en http://example.com sobre el producto que compré";

    let (_, v) = post_json(&app, "/classify", json!({ "text": text })).await;
    assert_eq!(v["rule"], json!("url"));

    let (_, v) = post_json(
        &app,
        "/classify",
        json!({ "text": text, "policy": { "deny_if_contains_url": false, "unknown": 1 } }),
    )
    .await;
    assert_ne!(v["rule"], json!("url"));
    assert_ne!(v["classification"], json!("Denegar"));
}

#[tokio::test]
async fn moderate_json_scenario_with_summary_and_download() {
    let app = app();
    let (st, v) = post_json(
        &app,
        "/moderate",
        json!({
            "columns": ["Reseña", "Estado"],
            "rows": [
                [null, null],
                ["GREAT!!!!!! BUY NOW www.spam.com", null],
                ["bueno pero muy malo", null],
                ["bueno pero muy malo", null]
            ]
        }),
    )
    .await;
    assert_eq!(st, StatusCode::OK, "body: {v}");
    assert_eq!(v["review_column"], json!("Reseña"));
    assert_eq!(
        v["columns"],
        json!(["Correlativo", "Reseña", "Estado", "clasificacion"])
    );
    let labels: Vec<&str> = v["rows"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r[3].as_str().unwrap())
        .collect();
    assert_eq!(
        labels,
        vec!["Denegar", "Denegar", "Revisión humana requerida", "Denegar"]
    );
    assert_eq!(v["rows"][2][2], json!("Revisión humana"));
    assert_eq!(v["summary"]["total"], json!(4));
    assert_eq!(v["summary"]["Denegar"]["count"], json!(3));
    assert_eq!(v["summary"]["Denegar"]["pct"], json!(75.0));

    let token = v["download_token"].as_str().unwrap().to_string();
    let (st, bytes) = send(
        &app,
        Request::builder()
            .uri(format!("/download/{token}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(st, StatusCode::OK);
    let text = String::from_utf8(bytes).unwrap();
    assert!(text.trim_start_matches('\u{feff}').starts_with("Correlativo,Reseña,Estado,clasificacion"));
    assert!(text.contains("Revisión humana requerida"));
}

#[tokio::test]
async fn moderate_json_errors_are_user_facing() {
    let app = app();
    let (st, v) = post_json(&app, "/moderate", json!({ "columns": ["Reseña"], "rows": [] })).await;
    assert_eq!(st, StatusCode::BAD_REQUEST);
    assert_eq!(v["error"], json!("El archivo no tiene filas."));

    let (st, v) = post_json(
        &app,
        "/moderate",
        json!({
            "columns": ["titulo", "cuerpo"],
            "rows": [["Una compra increíble", "Un producto bastante bueno"]]
        }),
    )
    .await;
    assert_eq!(st, StatusCode::BAD_REQUEST);
    let msg = v["error"].as_str().unwrap();
    assert!(msg.contains("No pude identificar la columna"), "{msg}");
    assert!(msg.contains("titulo, cuerpo"), "{msg}");

    // An explicit column resolves the ambiguity.
    let (st, v) = post_json(
        &app,
        "/moderate",
        json!({
            "columns": ["titulo", "cuerpo"],
            "rows": [["Una compra increíble", "Un producto bastante bueno"]],
            "review_column": "cuerpo"
        }),
    )
    .await;
    assert_eq!(st, StatusCode::OK);
    assert_eq!(v["review_column"], json!("cuerpo"));
}

#[tokio::test]
async fn moderate_csv_upload() {
    let app = app();
    let csv = "Reporte de reseñas,,\n,,\n,Comentario,Criterio de moderación\n,Todo bien,\n,\"Escríbeme al whatsapp\",\n";
    let req = Request::builder()
        .method("POST")
        .uri("/moderate/csv")
        .header(header::CONTENT_TYPE, "text/csv")
        .body(Body::from(csv))
        .unwrap();
    let (st, bytes) = send(&app, req).await;
    let v: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(st, StatusCode::OK, "body: {v}");
    assert_eq!(v["review_column"], json!("Comentario"));
    // blank `col_0` dropped, row number inserted first
    assert_eq!(
        v["columns"],
        json!(["Correlativo", "Comentario", "Criterio de moderación", "clasificacion"])
    );
    assert_eq!(v["rows"][0][2], json!("Contenido muy corto / baja utilidad."));
    assert_eq!(v["rows"][1][3], json!("Denegar"));
}

#[tokio::test]
async fn unknown_download_token_is_404() {
    let app = app();
    let (st, body) = send(
        &app,
        Request::builder()
            .uri("/download/deadbeef")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(st, StatusCode::NOT_FOUND);
    let v: Value = serde_json::from_slice(&body).unwrap();
    assert!(v["error"].as_str().unwrap().contains("ya no está disponible"));
}

#[tokio::test]
async fn moderate_json_reads_numbers_and_booleans_as_text() {
    let app = app();
    let (st, v) = post_json(
        &app,
        "/moderate",
        json!({
            "columns": ["id", "reseña"],
            "rows": [
                [1, "El envío fue rápido y la calidad del producto es excelente"],
                [2.5, true]
            ]
        }),
    )
    .await;
    assert_eq!(st, StatusCode::OK, "body: {v}");
    assert_eq!(v["columns"], json!(["Correlativo", "id", "reseña", "clasificacion"]));
    assert_eq!(v["rows"][0][1], json!("1"));
    assert_eq!(v["rows"][0][3], json!("Aprobar"));
    assert_eq!(v["rows"][1][1], json!("2.5"));
    assert_eq!(v["rows"][1][2], json!("true"));

    let (st, v) = post_json(
        &app,
        "/moderate",
        json!({ "columns": ["reseña"], "rows": [[["anidado"]]] }),
    )
    .await;
    assert_eq!(st, StatusCode::BAD_REQUEST);
    assert_eq!(v["error"], json!("Cada celda debe ser texto, número, booleano o null."));
}

async fn upload(app: &Router, uri: &str, body: Vec<u8>) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::from(body))
        .unwrap();
    let (status, bytes) = send(app, req).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn csv_upload_takes_policy_overrides_from_query() {
    let app = app();
    let csv = "reseña\nCompré el cargador en www.tienda.com y funciona perfecto\n";

    let (st, v) = upload(&app, "/moderate/csv", csv.into()).await;
    assert_eq!(st, StatusCode::OK, "body: {v}");
    assert_eq!(v["rows"][0][2], json!("Denegar"));

    // {"deny_if_contains_url":false}
    let (st, v) = upload(
        &app,
        "/moderate/csv?policy=%7B%22deny_if_contains_url%22%3Afalse%7D",
        csv.into(),
    )
    .await;
    assert_eq!(st, StatusCode::OK, "body: {v}");
    assert_eq!(v["rows"][0][2], json!("Aprobar"));

    let (st, v) = upload(&app, "/moderate/csv?policy=nope", csv.into()).await;
    assert_eq!(st, StatusCode::BAD_REQUEST);
    assert!(v["error"].as_str().unwrap().contains("policy"));
}

#[tokio::test]
async fn moderate_excel_upload() {
    let app = app();
    let workbook = include_bytes!("fixtures/reviews.xlsx").to_vec();

    let (st, v) = upload(&app, "/moderate/excel", workbook.clone()).await;
    assert_eq!(st, StatusCode::OK, "body: {v}");
    assert_eq!(v["review_column"], json!("Reseña"));
    assert_eq!(
        v["columns"],
        json!(["Correlativo", "N°", "Reseña", "Estado", "clasificacion"])
    );
    assert_eq!(v["rows"][0][1], json!("1"));
    assert_eq!(v["rows"][0][4], json!("Aprobar"));
    assert_eq!(v["rows"][1][3], json!("Denegada"));
    assert_eq!(v["summary"]["total"], json!(2));

    let (st, v) = upload(&app, "/moderate/excel?sheet=Hoja9", workbook).await;
    assert_eq!(st, StatusCode::BAD_REQUEST);
    assert!(v["error"].as_str().unwrap().starts_with("No pude leer el archivo"));

    let (st, _) = upload(&app, "/moderate/excel", b"no es un libro".to_vec()).await;
    assert_eq!(st, StatusCode::BAD_REQUEST);
}
