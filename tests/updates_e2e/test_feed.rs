//! Feed, references, cascade, preview and health checks.

use std::sync::atomic::Ordering;

use actix_web::{http::StatusCode, test};
use chrono::NaiveDate;
use serde_json::Value;
use uuid::Uuid;

use field_updates_lib::models::{CascadeOptions, Priority, RealTimeUpdate, UpdateFeedResponse};

use super::test_helpers::{Harness, authed, stored_update};

#[actix_rt::test]
async fn test_feed_priorities_follow_recency() {
    let harness = Harness::new();
    let project = harness.records.add_project("Learning Centre", None, None);
    // Seeded oldest first; the feed returns newest first.
    let mut ids = Vec::new();
    for i in 0..10 {
        let update = stored_update(project.id, &format!("{}", i + 1), 1000 - i * 10);
        ids.push(update.id);
        harness.records.seed(update);
    }
    let app = harness.app().await;

    let req = test::TestRequest::get().uri("/api/v1/updates").to_request();
    let feed: UpdateFeedResponse = test::call_and_read_body_json(&app, req).await;

    assert_eq!(feed.total, 10);
    assert_eq!(feed.updates[0].update.id, ids[9]);
    assert_eq!(feed.updates[9].update.id, ids[0]);

    let priorities: Vec<Priority> = feed.updates.iter().map(|item| item.priority).collect();
    let count = |p: Priority| priorities.iter().filter(|x| **x == p).count();
    assert_eq!(count(Priority::High), 3);
    assert_eq!(count(Priority::Medium), 4);
    assert_eq!(count(Priority::Low), 3);
    assert_eq!(priorities[2], Priority::High);
    assert_eq!(priorities[3], Priority::Medium);
    assert_eq!(priorities[7], Priority::Low);
}

#[actix_rt::test]
async fn test_feed_small_lists() {
    for (n, expected) in [
        (1, vec![Priority::High]),
        (2, vec![Priority::High, Priority::Medium]),
        (3, vec![Priority::High, Priority::Medium, Priority::Medium]),
    ] {
        let harness = Harness::new();
        let project = harness.records.add_project("Learning Centre", None, None);
        for i in 0..n {
            harness.records.seed(stored_update(project.id, "1", 100 - i as i64));
        }
        let app = harness.app().await;

        let req = test::TestRequest::get().uri("/api/v1/updates").to_request();
        let feed: UpdateFeedResponse = test::call_and_read_body_json(&app, req).await;
        let priorities: Vec<Priority> = feed.updates.iter().map(|item| item.priority).collect();
        assert_eq!(priorities, expected, "n = {}", n);
    }
}

#[actix_rt::test]
async fn test_feed_resolves_names_with_fallbacks() {
    let harness = Harness::new();
    let partner = harness.records.add_partner("Acme Foundation");
    let toll = harness.records.add_toll(&partner, "Acme Roads");
    let project = harness
        .records
        .add_project("Digital Literacy", Some(&partner), Some(&toll));

    let known = stored_update(project.id, "1", 20);
    let orphan = stored_update(Uuid::now_v7(), "2", 10);
    harness.records.seed(known.clone());
    harness.records.seed(orphan.clone());
    let app = harness.app().await;

    let req = test::TestRequest::get().uri("/api/v1/updates").to_request();
    let feed: UpdateFeedResponse = test::call_and_read_body_json(&app, req).await;

    let item = |id: Uuid| feed.updates.iter().find(|i| i.update.id == id).unwrap();
    assert_eq!(item(known.id).project_name, "Digital Literacy");
    assert_eq!(item(known.id).csr_partner_name, "Acme Foundation");
    assert_eq!(item(known.id).toll_name, "Acme Roads");
    assert_eq!(item(orphan.id).project_name, "Unknown Project");
    assert_eq!(item(orphan.id).csr_partner_name, "N/A");
    assert_eq!(item(orphan.id).toll_name, "N/A");
}

#[actix_rt::test]
async fn test_deactivated_references_keep_their_names() {
    let harness = Harness::new();
    let partner = harness.records.add_partner("Acme Foundation");
    let toll = harness.records.add_toll(&partner, "Acme Roads");
    let project = harness
        .records
        .add_project("Digital Literacy", Some(&partner), Some(&toll));
    let update = stored_update(project.id, "1", 20);
    harness.records.seed(update.clone());
    for id in [partner.id, toll.id, project.id] {
        harness.records.deactivate(id);
    }
    let app = harness.app().await;

    let req = test::TestRequest::get().uri("/api/v1/updates").to_request();
    let feed: UpdateFeedResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(feed.updates[0].project_name, "Digital Literacy");
    assert_eq!(feed.updates[0].csr_partner_name, "Acme Foundation");
    assert_eq!(feed.updates[0].toll_name, "Acme Roads");

    // Pickers only offer active rows.
    for uri in ["/api/v1/projects", "/api/v1/csr-partners", "/api/v1/tolls"] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let rows: Value = test::call_and_read_body_json(&app, req).await;
        assert!(rows.as_array().unwrap().is_empty(), "GET {}", uri);
    }

    let req = authed(test::TestRequest::post().uri(&format!("/api/v1/updates/{}/pdf", update.id)));
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    let layout = harness.renderer.last_layout().unwrap();
    assert_eq!(layout.heading.project_name, "Digital Literacy");
    assert_eq!(layout.heading.toll_name, "Acme Roads");
}

#[actix_rt::test]
async fn test_feed_filters() {
    let harness = Harness::new();
    let a = harness.records.add_project("A", None, None);
    let b = harness.records.add_project("B", None, None);

    let mut early = stored_update(a.id, "1", 30);
    early.report_date = NaiveDate::from_ymd_opt(2025, 9, 1).unwrap();
    let mut late = stored_update(a.id, "2", 20);
    late.report_date = NaiveDate::from_ymd_opt(2025, 9, 30).unwrap();
    let other = stored_update(b.id, "3", 10);
    for u in [&early, &late, &other] {
        harness.records.seed(u.clone());
    }
    let app = harness.app().await;

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/updates?project_id={}", a.id))
        .to_request();
    let feed: UpdateFeedResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(feed.total, 2);

    let req = test::TestRequest::get()
        .uri(&format!(
            "/api/v1/updates?project_id={}&from=2025-09-15&to=2025-09-30",
            a.id
        ))
        .to_request();
    let feed: UpdateFeedResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(feed.total, 1);
    assert_eq!(feed.updates[0].update.id, late.id);

    let req = test::TestRequest::get()
        .uri("/api/v1/updates?from=2025-10-01&to=2025-09-01")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::get().uri("/api/v1/updates?limit=1").to_request();
    let feed: UpdateFeedResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(feed.total, 1);
    assert_eq!(feed.updates[0].update.id, other.id);
}

#[actix_rt::test]
async fn test_hidden_update_leaves_feed() {
    let harness = Harness::new();
    let project = harness.records.add_project("Learning Centre", None, None);
    let update = stored_update(project.id, "5", 10);
    harness.records.seed(update.clone());
    let app = harness.app().await;

    let req = authed(test::TestRequest::delete().uri(&format!("/api/v1/updates/{}", update.id)));
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/updates/{}", update.id))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::get().uri("/api/v1/updates").to_request();
    let feed: UpdateFeedResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(feed.total, 0);

    // Soft delete keeps the row.
    assert!(!harness.records.update(update.id).unwrap().is_public);
}

#[actix_rt::test]
async fn test_get_update_and_mark_sent() {
    let harness = Harness::new();
    let project = harness.records.add_project("Learning Centre", None, None);
    let update = stored_update(project.id, "5", 10);
    harness.records.seed(update.clone());
    let mut events = harness.broadcaster.subscribe();
    let app = harness.app().await;

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/updates/{}", update.id))
        .to_request();
    let fetched: RealTimeUpdate = test::call_and_read_body_json(&app, req).await;
    assert_eq!(fetched.id, update.id);
    assert!(!fetched.is_sent_to_client);

    let req = authed(test::TestRequest::post().uri(&format!("/api/v1/updates/{}/sent", update.id)));
    let sent: RealTimeUpdate = test::call_and_read_body_json(&app, req).await;
    assert!(sent.is_sent_to_client);

    let message = serde_json::to_value(events.recv().await.unwrap()).unwrap();
    assert_eq!(message["type"], "update_sent_to_client");
    assert_eq!(message["payload"]["update_id"], update.id.to_string());
}

#[actix_rt::test]
async fn test_reference_lists_and_cascade() {
    let harness = Harness::new();
    let acme = harness.records.add_partner("Acme Foundation");
    let globex = harness.records.add_partner("Globex Trust");
    let roads = harness.records.add_toll(&acme, "Acme Roads");
    harness.records.add_toll(&globex, "Globex Ports");
    let school = harness.records.add_project("School", Some(&acme), Some(&roads));
    harness.records.add_project("Clinic", Some(&globex), None);
    let app = harness.app().await;

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/tolls?csr_partner_id={}", acme.id))
        .to_request();
    let tolls: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(tolls.as_array().unwrap().len(), 1);
    assert_eq!(tolls[0]["name"], "Acme Roads");

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/projects?toll_id={}", roads.id))
        .to_request();
    let projects: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(projects.as_array().unwrap().len(), 1);

    let req = test::TestRequest::get()
        .uri(&format!(
            "/api/v1/cascade?csr_partner_id={}&toll_id={}&project_id={}",
            globex.id, roads.id, school.id
        ))
        .to_request();
    let cascade: CascadeOptions = test::call_and_read_body_json(&app, req).await;
    assert_eq!(cascade.csr_partners.len(), 2);
    assert_eq!(cascade.tolls.len(), 1);
    assert_eq!(cascade.tolls[0].name, "Globex Ports");
    assert_eq!(cascade.projects.len(), 1);
    assert_eq!(cascade.projects[0].name, "Clinic");
    assert_eq!(cascade.selection.csr_partner_id, Some(globex.id));
    assert_eq!(cascade.selection.toll_id, None);
    assert_eq!(cascade.selection.project_id, None);
}

#[actix_rt::test]
async fn test_preview_renders_pages() {
    let harness = Harness::new();
    let project = harness.records.add_project("Learning Centre", None, None);
    let mut update = stored_update(project.id, "7", 10);
    update.photos = (0..7)
        .map(|i| format!("http://minio.test:9000/update-photos/photos/x/{:02}.jpg", i))
        .collect();
    harness.records.seed(update.clone());
    let app = harness.app().await;

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/updates/{}/preview", update.id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let html = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();

    // 2 + 4 + 1 photos.
    assert_eq!(html.matches("class=\"report-page\"").count(), 3);
    assert_eq!(html.matches("<img ").count(), 7);
    assert!(html.contains("Learning Centre"));
    assert!(html.contains("24/09/2025"));
}

#[actix_rt::test]
async fn test_health_and_readiness() {
    let harness = Harness::new();
    let app = harness.app().await;

    let req = test::TestRequest::get().uri("/api/v1/health").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::get().uri("/api/v1/ready").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    harness.records.fail_ping.store(true, Ordering::SeqCst);
    let req = test::TestRequest::get().uri("/api/v1/ready").to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::SERVICE_UNAVAILABLE
    );
}
