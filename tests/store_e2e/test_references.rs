//! Reference lists hide inactive rows; lookups by id do not.

use field_updates_lib::models::ProjectQuery;

use super::test_helpers::{
    create_test_pool, insert_partner, insert_project, insert_toll, unique_name,
};

#[actix_rt::test]
async fn test_lists_skip_inactive_rows() {
    let Some(pool) = create_test_pool().await else {
        return;
    };
    let partner = insert_partner(&pool, &unique_name("Partner"), true).await;
    let retired_partner = insert_partner(&pool, &unique_name("Retired"), false).await;
    let toll = insert_toll(&pool, partner, &unique_name("Toll"), true).await;
    let retired_toll = insert_toll(&pool, partner, &unique_name("Old Toll"), false).await;
    let project = insert_project(&pool, &unique_name("Library"), Some(partner), None, true).await;
    let retired_project =
        insert_project(&pool, &unique_name("Closed"), Some(partner), None, false).await;

    let partners: Vec<_> = pool
        .list_csr_partners()
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.id)
        .collect();
    assert!(partners.contains(&partner));
    assert!(!partners.contains(&retired_partner));

    let tolls: Vec<_> = pool
        .list_tolls(Some(partner))
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.id)
        .collect();
    assert_eq!(tolls, vec![toll]);

    let query = ProjectQuery {
        csr_partner_id: Some(partner),
        toll_id: None,
    };
    let projects: Vec<_> = pool
        .list_projects(&query)
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.id)
        .collect();
    assert_eq!(projects, vec![project]);

    let mut by_id: Vec<_> = pool
        .projects_by_ids(&[project, retired_project])
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.id)
        .collect();
    by_id.sort();
    let mut expected = vec![project, retired_project];
    expected.sort();
    assert_eq!(by_id, expected);

    let partners = pool.csr_partners_by_ids(&[retired_partner]).await.unwrap();
    assert_eq!(partners.len(), 1);
    assert_eq!(partners[0].id, retired_partner);

    let tolls = pool.tolls_by_ids(&[retired_toll]).await.unwrap();
    assert_eq!(tolls.len(), 1);
    assert_eq!(tolls[0].csr_partner_id, partner);
}

#[actix_rt::test]
async fn test_project_toll_filter_wins_over_partner() {
    let Some(pool) = create_test_pool().await else {
        return;
    };
    let partner = insert_partner(&pool, &unique_name("Partner"), true).await;
    let other_partner = insert_partner(&pool, &unique_name("Other"), true).await;
    let toll = insert_toll(&pool, partner, &unique_name("Toll"), true).await;
    let tolled =
        insert_project(&pool, &unique_name("Tolled"), Some(partner), Some(toll), true).await;
    insert_project(&pool, &unique_name("Direct"), Some(partner), None, true).await;

    let query = ProjectQuery {
        csr_partner_id: Some(other_partner),
        toll_id: Some(toll),
    };
    let projects: Vec<_> = pool
        .list_projects(&query)
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.id)
        .collect();
    assert_eq!(projects, vec![tolled]);
}

#[actix_rt::test]
async fn test_empty_id_lookups() {
    let Some(pool) = create_test_pool().await else {
        return;
    };

    assert!(pool.projects_by_ids(&[]).await.unwrap().is_empty());
    assert!(pool.csr_partners_by_ids(&[]).await.unwrap().is_empty());
    assert!(pool.tolls_by_ids(&[]).await.unwrap().is_empty());
}
