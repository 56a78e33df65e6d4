//! Access key enforcement on mutating routes.

use std::sync::atomic::Ordering;

use actix_web::{http::StatusCode, http::header, test};
use serde_json::Value;

use field_updates_lib::config::API_KEY_HEADER;

use super::test_helpers::{Harness, stored_update, valid_form};

#[actix_rt::test]
async fn test_submit_without_key_is_rejected() {
    let harness = Harness::new();
    let project = harness.records.add_project("Learning Centre", None, None);
    let app = harness.app().await;

    let req = test::TestRequest::post()
        .uri("/api/v1/updates")
        .insert_header((header::CONTENT_TYPE, "multipart/form-data; boundary=xyz"))
        .set_payload("--xyz--\r\n")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "UNAUTHORIZED");
    assert_eq!(
        body["message"],
        format!("Unauthorized: Missing access key. Provide {} header.", API_KEY_HEADER)
    );

    let (content_type, payload) = valid_form(project.id).photos(1).into_parts();
    let req = test::TestRequest::post()
        .uri("/api/v1/updates")
        .insert_header((header::CONTENT_TYPE, content_type))
        .insert_header((API_KEY_HEADER, "not-the-key"))
        .set_payload(payload)
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::UNAUTHORIZED
    );

    assert_eq!(harness.records.insert_calls.load(Ordering::SeqCst), 0);
    assert_eq!(harness.photos.put_calls.load(Ordering::SeqCst), 0);
}

#[actix_rt::test]
async fn test_mutations_require_key() {
    let harness = Harness::new();
    let project = harness.records.add_project("Learning Centre", None, None);
    let update = stored_update(project.id, "1", 60);
    harness.records.seed(update.clone());
    let app = harness.app().await;

    let id = update.id;
    let requests = [
        test::TestRequest::post().uri(&format!("/api/v1/updates/{}/pdf", id)),
        test::TestRequest::delete().uri(&format!("/api/v1/updates/{}/pdf", id)),
        test::TestRequest::post().uri(&format!("/api/v1/updates/{}/sent", id)),
        test::TestRequest::delete().uri(&format!("/api/v1/updates/{}", id)),
    ];
    for req in requests {
        let resp = test::call_service(&app, req.to_request()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    let stored = harness.records.update(id).unwrap();
    assert!(stored.is_public);
    assert!(!stored.is_sent_to_client);
    assert_eq!(harness.renderer.render_count(), 0);
}

#[actix_rt::test]
async fn test_reads_are_public() {
    let harness = Harness::new();
    let project = harness.records.add_project("Learning Centre", None, None);
    let update = stored_update(project.id, "1", 60);
    harness.records.seed(update.clone());
    let app = harness.app().await;

    for uri in [
        "/api/v1/updates".to_string(),
        format!("/api/v1/updates/{}", update.id),
        format!("/api/v1/updates/{}/preview", update.id),
        "/api/v1/csr-partners".to_string(),
        "/api/v1/tolls".to_string(),
        "/api/v1/projects".to_string(),
        "/api/v1/cascade".to_string(),
    ] {
        let req = test::TestRequest::get().uri(&uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK, "GET {}", uri);
    }
}
