//! Integration tests for the linked entity endpoints.

mod common;

use axum::http::StatusCode;
use common::{body_json, get};
use sqlx::PgPool;

#[sqlx::test(migrations = "../../db/migrations")]
async fn list_seeded_canals(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = get(app, "/api/v1/entities/canal").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let canals = json["data"].as_array().unwrap();
    assert_eq!(canals.len(), 3);
    assert!(canals.iter().all(|c| c["type"] == "canal"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn entity_attributes_are_inlined(pool: PgPool) {
    let app = common::build_test_app(pool);
    let json = body_json(get(app, "/api/v1/entities/canal/canal-1").await).await;

    assert_eq!(json["data"]["name"], "Main Canal");
    assert_eq!(json["data"]["length"], 5280);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn types_without_records_return_empty_list(pool: PgPool) {
    let app = common::build_test_app(pool);
    let json = body_json(get(app, "/api/v1/entities/hazard").await).await;

    assert!(json["data"].as_array().unwrap().is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unknown_type_is_bad_request(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = get(app, "/api/v1/entities/volcano").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn missing_entity_returns_404(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = get(app, "/api/v1/entities/ride/ride-99").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        body_json(response).await["error"],
        "LinkedEntity with id ride-99 not found"
    );
}
