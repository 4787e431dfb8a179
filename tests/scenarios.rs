//! End-to-end scenario tests exercising the public engine surface: store,
//! scheduler, and parser together, without going over the network.

use std::time::Duration;

use jobwatch::domain::models::{ApplicationStatus, JobDetail, JobFilters, NewProfile, SortBy};
use jobwatch::parser;
use jobwatch::repository::Store;
use jobwatch::scheduler::Scheduler;

#[tokio::test]
async fn fresh_start_seeds_exactly_one_default_profile() {
    let store = Store::open_in_memory().await.unwrap();
    store.seed_default_profile().await.unwrap();

    let profiles = store.list_profiles().await.unwrap();
    assert_eq!(profiles.len(), 1);

    let p = &profiles[0];
    assert_eq!(p.name, "default");
    assert_eq!(p.location, "San Francisco, CA");
    assert_eq!(p.keywords, "AI Engineer OR ML Engineer OR Research Engineer");
    assert_eq!(p.distance, 25);
    assert_eq!(p.time_filter, "r7200");
    assert_eq!(p.refresh_interval, 7200);
    assert!(p.enabled);

    // Calling it again must not create a second row.
    store.seed_default_profile().await.unwrap();
    assert_eq!(store.list_profiles().await.unwrap().len(), 1);
}

#[tokio::test]
async fn upserting_the_same_batch_twice_is_idempotent() {
    let store = Store::open_in_memory().await.unwrap();
    let job = JobDetail::sentinel("job-1");
    store.upsert_jobs(&[job.clone()]).await.unwrap();
    store.upsert_jobs(&[job]).await.unwrap();

    let count = store.count_jobs(&JobFilters::default()).await.unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn disable_then_hard_delete_profile_removes_worker_and_nulls_job_fk() {
    let store = Store::open_in_memory().await.unwrap();
    let profile = store
        .upsert_profile(&NewProfile {
            name: "to-delete".into(),
            location: "NYC".into(),
            keywords: "Platform Engineer".into(),
            distance: 25,
            time_filter: "r86400".into(),
            refresh_interval: 3600,
            enabled: true,
        })
        .await
        .unwrap();

    let mut job = JobDetail::sentinel("job-owned");
    job.title = "Platform Engineer".into();
    job.company = "Acme".into();
    job.profile_id = Some(profile.id);
    store.upsert_jobs(&[job]).await.unwrap();

    let scheduler = Scheduler::new(store.clone());
    scheduler.spawn_worker(profile.clone());
    assert_eq!(scheduler.running_worker_count(), 1);

    // Disable: the next reconciliation should kill the worker.
    store
        .upsert_profile(&NewProfile {
            name: profile.name.clone(),
            location: profile.location.clone(),
            keywords: profile.keywords.clone(),
            distance: profile.distance,
            time_filter: profile.time_filter.clone(),
            refresh_interval: profile.refresh_interval,
            enabled: false,
        })
        .await
        .unwrap();
    scheduler.reconcile_once().await.unwrap();
    assert_eq!(scheduler.running_worker_count(), 0);

    // Hard delete: profile row gone, owned job's FK nulled.
    store.delete_profile(profile.id, true).await.unwrap();
    assert!(store.get_profile(profile.id).await.unwrap().is_none());

    let job_view = store.get_job("job-owned").await.unwrap().unwrap();
    assert_eq!(job_view.detail.profile_id, None);

    scheduler.stop().await;
}

#[tokio::test]
async fn application_lifecycle_moves_through_statuses() {
    let store = Store::open_in_memory().await.unwrap();
    let mut job = JobDetail::sentinel("job-apply");
    job.title = "Data Engineer".into();
    job.company = "Acme".into();
    store.upsert_jobs(&[job]).await.unwrap();

    store.mark_job_applied("job-apply", Some("applied via referral")).await.unwrap();
    store
        .update_application_status("job-apply", ApplicationStatus::Interviewing)
        .await
        .unwrap();

    let view = store.get_job("job-apply").await.unwrap().unwrap();
    assert_eq!(view.application_status, Some(ApplicationStatus::Interviewing));

    let filters = JobFilters {
        application_status: Some("interviewing".into()),
        ..Default::default()
    };
    let results = store.query_jobs(&filters, 10, 0, SortBy::PostedDateDesc).await.unwrap();
    assert_eq!(results.len(), 1);
}

#[tokio::test]
async fn parser_and_store_round_trip_a_listing_and_detail_page() {
    let page = r#"<html><body>
        <div data-entity-urn="urn:li:jobPosting:55501" class="base-search-card">
            <h3 class="base-search-card__title">Staff Engineer</h3>
            <h4 class="base-search-card__subtitle"><a href="https://example.com/acme">Acme</a></h4>
            <span class="job-search-card__location">Remote</span>
            <time class="job-search-card__listdate" datetime="2024-03-01">1 week ago</time>
            <a class="base-card__full-link" href="https://example.com/jobPosting/55501"></a>
        </div>
    </body></html>"#;
    let summaries = parser::parse_search_results_page(page);
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].id, "55501");

    let detail_html = r#"<html><body>
        <h1 class="top-card-layout__title">Staff Engineer</h1>
        <a class="topcard__org-name-link" href="https://example.com/acme">Acme</a>
        <span class="topcard__flavor--bullet">Remote</span>
        <div class="description__text">Fully remote role. $180,000 - $220,000 with equity. Python and Kubernetes required.</div>
    </body></html>"#;
    let detail = parser::parse_job_detail_page(detail_html, &summaries[0].id);
    assert!(detail.remote_eligible);
    assert_eq!(detail.salary_min, Some(180_000.0));
    assert_eq!(detail.salary_max, Some(220_000.0));

    let store = Store::open_in_memory().await.unwrap();
    store.upsert_jobs(&[detail]).await.unwrap();
    let stored = store.get_job("55501").await.unwrap().unwrap();
    assert_eq!(stored.detail.company, "Acme");

    // give any background timers in this binary room to settle before exit
    tokio::time::sleep(Duration::from_millis(1)).await;
}
