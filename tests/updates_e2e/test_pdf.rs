//! Report PDF links, regeneration, deletion and backfill.

use std::sync::atomic::Ordering;

use actix_web::{http::StatusCode, test};
use serde_json::Value;

use field_updates_lib::config::PdfBackfillSettings;
use field_updates_lib::models::{PdfLinkResponse, RealTimeUpdate, WsEvent};
use field_updates_lib::services::ObjectStore;
use field_updates_lib::services::pdf_backfill::run_backfill;

use super::test_helpers::{Harness, authed, images_per_page, png_bytes, stored_update};

/// Seed an update with a report already stored at `key`.
async fn seed_with_pdf(harness: &Harness, key: &str) -> RealTimeUpdate {
    let project = harness.records.add_project("Learning Centre", None, None);
    let mut update = stored_update(project.id, "9", 60);
    harness
        .reports
        .put(key, b"%PDF-1.3 seeded".to_vec(), "application/pdf")
        .await
        .unwrap();
    update.pdf_url = Some(harness.reports.urls().url_for(key));
    harness.records.seed(update.clone());
    update
}

#[actix_rt::test]
async fn test_pdf_link_requires_generated_report() {
    let harness = Harness::new();
    let project = harness.records.add_project("Learning Centre", None, None);
    let update = stored_update(project.id, "9", 60);
    harness.records.seed(update.clone());
    let app = harness.app().await;

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/updates/{}/pdf", update.id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let body: Value = test::read_body_json(resp).await;
    assert!(body["message"].as_str().unwrap().contains("not generated yet"));
}

#[actix_rt::test]
async fn test_pdf_link_returns_stored_url() {
    let harness = Harness::new();
    let update = seed_with_pdf(&harness, "real_time/update_9_1.pdf").await;
    let app = harness.app().await;

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/updates/{}/pdf", update.id))
        .to_request();
    let link: PdfLinkResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(link.update_id, update.id);
    assert_eq!(Some(link.pdf_url), update.pdf_url);
}

#[actix_rt::test]
async fn test_delete_pdf_removes_object_and_link() {
    let harness = Harness::new();
    let key = "real_time/update_9_1.pdf";
    let update = seed_with_pdf(&harness, key).await;
    let mut events = harness.broadcaster.subscribe();
    let app = harness.app().await;

    let req = authed(test::TestRequest::delete().uri(&format!("/api/v1/updates/{}/pdf", update.id)));
    let updated: RealTimeUpdate = test::call_and_read_body_json(&app, req).await;
    assert!(updated.pdf_url.is_none());

    assert!(!harness.reports.contains(key));
    assert_eq!(harness.reports.remove_calls.load(Ordering::SeqCst), 1);
    assert!(harness.records.update(update.id).unwrap().pdf_url.is_none());

    let message = events.recv().await.unwrap();
    assert!(matches!(message.event, WsEvent::UpdatePdfRemoved(ref p) if p.update_id == update.id));

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/updates/{}/pdf", update.id))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}

#[actix_rt::test]
async fn test_delete_pdf_refuses_foreign_url() {
    let harness = Harness::new();
    let project = harness.records.add_project("Learning Centre", None, None);
    let mut update = stored_update(project.id, "9", 60);
    let foreign = "https://elsewhere.example.com/reports/real_time/update_9_1.pdf".to_string();
    update.pdf_url = Some(foreign.clone());
    harness.records.seed(update.clone());
    let app = harness.app().await;

    let req = authed(test::TestRequest::delete().uri(&format!("/api/v1/updates/{}/pdf", update.id)));
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    assert_eq!(harness.reports.remove_calls.load(Ordering::SeqCst), 0);
    assert_eq!(harness.records.update(update.id).unwrap().pdf_url, Some(foreign));
}

#[actix_rt::test]
async fn test_delete_pdf_without_report() {
    let harness = Harness::new();
    let project = harness.records.add_project("Learning Centre", None, None);
    let update = stored_update(project.id, "9", 60);
    harness.records.seed(update.clone());
    let app = harness.app().await;

    let req = authed(test::TestRequest::delete().uri(&format!("/api/v1/updates/{}/pdf", update.id)));
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    assert_eq!(harness.reports.remove_calls.load(Ordering::SeqCst), 0);
}

#[actix_rt::test]
async fn test_regenerate_replaces_previous_report() {
    let harness = Harness::new();
    let old_key = "real_time/update_9_1.pdf";
    let update = seed_with_pdf(&harness, old_key).await;
    let mut events = harness.broadcaster.subscribe();
    let app = harness.app().await;

    let req = authed(test::TestRequest::post().uri(&format!("/api/v1/updates/{}/pdf", update.id)));
    let link: PdfLinkResponse = test::call_and_read_body_json(&app, req).await;

    assert_ne!(Some(link.pdf_url.clone()), update.pdf_url);
    let new_key = harness.report_key(&link.pdf_url);
    assert!(new_key.starts_with("real_time/update_9_"));
    assert!(harness.reports.contains(&new_key));
    assert!(!harness.reports.contains(old_key));
    assert_eq!(
        harness.records.update(update.id).unwrap().pdf_url,
        Some(link.pdf_url.clone())
    );

    let message = events.recv().await.unwrap();
    assert!(matches!(message.event, WsEvent::UpdatePdfReady(ref p) if p.pdf_url == link.pdf_url));
}

#[actix_rt::test]
async fn test_regenerate_hidden_update_is_not_found() {
    let harness = Harness::new();
    let project = harness.records.add_project("Learning Centre", None, None);
    let mut update = stored_update(project.id, "9", 60);
    update.is_public = false;
    harness.records.seed(update.clone());
    let app = harness.app().await;

    let req = authed(test::TestRequest::post().uri(&format!("/api/v1/updates/{}/pdf", update.id)));
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    assert_eq!(harness.renderer.render_count(), 0);
}

#[actix_rt::test]
async fn test_backfill_exports_old_updates_without_report() {
    let harness = Harness::new();
    let project = harness.records.add_project("Learning Centre", None, None);
    let missing = stored_update(project.id, "3", 600);
    let fresh = stored_update(project.id, "4", 5);
    let mut hidden = stored_update(project.id, "5", 600);
    hidden.is_public = false;
    for u in [&missing, &fresh, &hidden] {
        harness.records.seed(u.clone());
    }
    let mut events = harness.broadcaster.subscribe();

    let settings = PdfBackfillSettings {
        interval_secs: 60,
        grace_secs: 120,
    };
    let exported = run_backfill(
        harness.records.as_ref(),
        &harness.exporter(),
        &harness.broadcaster,
        &settings,
    )
    .await
    .unwrap();

    assert_eq!(exported, 1);
    assert!(harness.records.update(missing.id).unwrap().pdf_url.is_some());
    assert!(harness.records.update(fresh.id).unwrap().pdf_url.is_none());
    assert!(harness.records.update(hidden.id).unwrap().pdf_url.is_none());

    let message = events.recv().await.unwrap();
    assert!(matches!(message.event, WsEvent::UpdatePdfReady(ref p) if p.update_id == missing.id));

    // Nothing left to do on the next cycle.
    let again = run_backfill(
        harness.records.as_ref(),
        &harness.exporter(),
        &harness.broadcaster,
        &settings,
    )
    .await
    .unwrap();
    assert_eq!(again, 0);
}

#[actix_rt::test]
async fn test_backfill_counts_only_successes() {
    let harness = Harness::new();
    let project = harness.records.add_project("Learning Centre", None, None);
    harness.records.seed(stored_update(project.id, "3", 600));
    harness.reports.fail_all_puts.store(true, Ordering::SeqCst);

    let settings = PdfBackfillSettings {
        interval_secs: 60,
        grace_secs: 0,
    };
    let exported = run_backfill(
        harness.records.as_ref(),
        &harness.exporter(),
        &harness.broadcaster,
        &settings,
    )
    .await
    .unwrap();
    assert_eq!(exported, 0);
}

#[actix_rt::test]
async fn test_regenerate_embeds_stored_photos() {
    let harness = Harness::new();
    let project = harness.records.add_project("Learning Centre", None, None);
    let mut update = stored_update(project.id, "9", 60);
    for i in 0..3 {
        let key = format!("photos/{}/{:02}_a.png", update.update_code, i + 1);
        harness
            .photos
            .put(&key, png_bytes(30, 40), "image/png")
            .await
            .unwrap();
        update.photos.push(harness.photos.urls().url_for(&key));
    }
    // Deleted from the bucket after submission.
    update
        .photos
        .push(harness.photos.urls().url_for("photos/gone/04_a.png"));
    harness.records.seed(update.clone());
    let app = harness.app().await;

    let req = authed(test::TestRequest::post().uri(&format!("/api/v1/updates/{}/pdf", update.id)));
    let link: PdfLinkResponse = test::call_and_read_body_json(&app, req).await;

    let pdf = harness.reports.bytes(&harness.report_key(&link.pdf_url)).unwrap();
    assert_eq!(images_per_page(&pdf), vec![2, 1]);
    assert_eq!(harness.photos.get_calls.load(Ordering::SeqCst), 4);
}

#[actix_rt::test]
async fn test_failed_link_removes_uploaded_report() {
    let harness = Harness::new();
    let old_key = "real_time/update_9_1.pdf";
    let update = seed_with_pdf(&harness, old_key).await;
    harness.records.fail_pdf_links.store(true, Ordering::SeqCst);
    let app = harness.app().await;

    let req = authed(test::TestRequest::post().uri(&format!("/api/v1/updates/{}/pdf", update.id)));
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    // The new upload is gone and the linked report is untouched.
    assert_eq!(harness.reports.put_calls.load(Ordering::SeqCst), 2);
    assert_eq!(harness.reports.keys(), vec![old_key.to_string()]);
    assert_eq!(harness.records.update(update.id).unwrap().pdf_url, update.pdf_url);
}

#[actix_rt::test]
async fn test_backfill_with_out_of_range_grace_exports_nothing() {
    let harness = Harness::new();
    let project = harness.records.add_project("Learning Centre", None, None);
    let update = stored_update(project.id, "3", 600);
    harness.records.seed(update.clone());

    let settings = PdfBackfillSettings {
        interval_secs: 60,
        grace_secs: u64::MAX,
    };
    let exported = run_backfill(
        harness.records.as_ref(),
        &harness.exporter(),
        &harness.broadcaster,
        &settings,
    )
    .await
    .unwrap();

    assert_eq!(exported, 0);
    assert_eq!(harness.renderer.render_count(), 0);
    assert!(harness.records.update(update.id).unwrap().pdf_url.is_none());
}
