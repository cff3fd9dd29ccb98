use chrono::Utc;
use limpfy_client::{MarketplaceClient, Recovery};
use limpfy_core::domain::actor::Actor;
use limpfy_core::domain::job::{Job, JobStatus, Location};
use limpfy_core::dto::job::{JobQuery, JobSort};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn sample_job(status: JobStatus) -> Job {
    let now = Utc::now();
    let mut job = Job::new(
        "client-1",
        "Office floor",
        "",
        Location::default(),
        18_000,
        now,
    );
    job.status = status;
    job
}

#[tokio::test]
async fn sends_identity_headers() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let job = sample_job(JobStatus::Pending);

    Mock::given(method("GET"))
        .and(path(format!("/jobs/{}", job.id)))
        .and(header("x-actor-id", "worker-a"))
        .and(header("x-actor-role", "worker"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&job))
        .expect(1)
        .mount(&server)
        .await;

    let client = MarketplaceClient::new(server.uri(), Actor::worker("worker-a"));
    let fetched = client.get_job(job.id).await?;

    assert_eq!(fetched, job);
    Ok(())
}

#[tokio::test]
async fn lost_accept_race_decodes_as_conflict() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path(format!("/jobs/{}/accept", id)))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "error": format!("job {id} was modified concurrently"),
            "code": "conflict",
            "recovery": "refetch"
        })))
        .mount(&server)
        .await;

    let client = MarketplaceClient::new(server.uri(), Actor::worker("worker-b"));
    let err = client.accept_job(id).await.unwrap_err();

    assert!(err.is_conflict());
    assert_eq!(err.status(), Some(409));
    assert_eq!(err.code(), Some("conflict"));
    assert_eq!(err.recovery(), Recovery::Refetch);
    Ok(())
}

#[tokio::test]
async fn late_dispute_suggests_help() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path(format!("/jobs/{}/dispute", id)))
        .and(body_json(json!({"reason": "Windows still dirty"})))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "error": "the dispute window has closed",
            "code": "deadline-passed",
            "recovery": "request-help"
        })))
        .mount(&server)
        .await;

    let client = MarketplaceClient::new(server.uri(), Actor::client("client-1"));
    let err = client
        .open_dispute(id, Some("Windows still dirty".to_string()))
        .await
        .unwrap_err();

    assert!(err.is_client_error());
    assert_eq!(err.recovery(), Recovery::RequestHelp);
    Ok(())
}

#[tokio::test]
async fn unstructured_errors_keep_the_body() -> anyhow::Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/jobs/open"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let client = MarketplaceClient::new(server.uri(), Actor::worker("worker-a"));
    let err = client.list_open_jobs().await.unwrap_err();

    assert!(err.is_server_error());
    assert_eq!(err.code(), None);
    assert!(err.to_string().contains("bad gateway"));
    Ok(())
}

#[tokio::test]
async fn my_jobs_forwards_filters() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let job = sample_job(JobStatus::Dispute);

    Mock::given(method("GET"))
        .and(path("/jobs/mine"))
        .and(query_param("status", "dispute"))
        .and(query_param("sort", "price-asc"))
        .and(query_param("search", "office"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jobs": [job],
            "counts": {"dispute": 1},
            "total": 1
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = MarketplaceClient::new(server.uri(), Actor::client("client-1"));
    let listing = client
        .list_my_jobs(&JobQuery {
            status: Some(JobStatus::Dispute),
            search: Some("office".to_string()),
            sort: JobSort::PriceAsc,
        })
        .await?;

    assert_eq!(listing.total, 1);
    assert_eq!(listing.jobs[0].status, JobStatus::Dispute);
    assert_eq!(listing.counts.get(&JobStatus::Dispute), Some(&1));
    Ok(())
}

#[tokio::test]
async fn inbox_operations() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let notification_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/notifications/unread-count"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"unread": 3})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/notifications/{}/read", notification_id)))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/notifications"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"affected": 3})))
        .mount(&server)
        .await;

    let client = MarketplaceClient::new(server.uri(), Actor::client("client-1"));

    assert_eq!(client.unread_count().await?, 3);
    client.mark_read(notification_id).await?;
    assert_eq!(client.clear_notifications().await?, 3);
    Ok(())
}

#[tokio::test]
async fn missing_notification_is_not_found() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let notification_id = Uuid::new_v4();

    Mock::given(method("DELETE"))
        .and(path(format!("/notifications/{}", notification_id)))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": "notification not found",
            "code": "not-found",
            "recovery": "none"
        })))
        .mount(&server)
        .await;

    let client = MarketplaceClient::new(server.uri(), Actor::worker("worker-a"));
    let err = client.remove_notification(notification_id).await.unwrap_err();

    assert!(err.is_not_found());
    Ok(())
}
