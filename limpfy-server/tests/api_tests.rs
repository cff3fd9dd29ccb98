mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::Duration;
use common::TestMarketplace;
use http_body_util::BodyExt;
use limpfy_core::domain::job::{Job, JobStatus};
use limpfy_core::domain::notification::Notification;
use limpfy_core::dto::job::JobListing;
use serde_json::{Value, json};
use tower::ServiceExt;

fn request(
    method: &str,
    uri: &str,
    actor: Option<(&str, &str)>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some((id, role)) = actor {
        builder = builder.header("x-actor-id", id).header("x-actor-role", role);
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(market: &TestMarketplace, req: Request<Body>) -> (StatusCode, Value) {
    let response = market.router().oneshot(req).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(Value::Null)
    };
    (status, value)
}

const CLIENT: Option<(&str, &str)> = Some(("client-1", "client"));
const WORKER: Option<(&str, &str)> = Some(("worker-a", "worker"));

async fn create_job(market: &TestMarketplace) -> Job {
    let (status, body) = send(
        market,
        request(
            "POST",
            "/jobs",
            CLIENT,
            Some(json!({
                "title": "Studio apartment",
                "price_cents": 9000,
                "location": {
                    "cep": "20040-020",
                    "street": "Rua da Assembleia",
                    "city": "Rio de Janeiro",
                    "state": "RJ"
                }
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    serde_json::from_value(body).unwrap()
}

#[tokio::test]
async fn health_check() {
    let market = TestMarketplace::new();
    let response = market
        .router()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let health: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["service"], "limpfy-server");
}

#[tokio::test]
async fn requests_without_identity_are_unauthorized() {
    let market = TestMarketplace::new();

    let (status, body) = send(&market, request("GET", "/jobs/open", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "unauthenticated");

    let (status, _) = send(
        &market,
        request("GET", "/jobs/open", Some(("sweeper", "system")), None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_job_rejects_invalid_price() {
    let market = TestMarketplace::new();
    let (status, body) = send(
        &market,
        request(
            "POST",
            "/jobs",
            CLIENT,
            Some(json!({"title": "Garage", "price_cents": 0})),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid-payload");
}

#[tokio::test]
async fn accept_twice_is_a_conflict() {
    let market = TestMarketplace::new();
    let job = create_job(&market).await;
    let uri = format!("/jobs/{}/accept", job.id);

    let (status, body) = send(&market, request("POST", &uri, WORKER, None)).await;
    assert_eq!(status, StatusCode::OK);
    let accepted: Job = serde_json::from_value(body).unwrap();
    assert_eq!(accepted.status, JobStatus::InProgress);

    let (status, body) = send(
        &market,
        request("POST", &uri, Some(("worker-b", "worker")), None),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "conflict");
    assert_eq!(body["recovery"], "refetch");
}

#[tokio::test]
async fn rejections_map_to_status_codes() {
    let market = TestMarketplace::new();
    let job = create_job(&market).await;

    let (status, _) = send(
        &market,
        request(
            "POST",
            &format!("/jobs/{}/accept", uuid::Uuid::new_v4()),
            WORKER,
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        &market,
        request("POST", &format!("/jobs/{}/accept", job.id), CLIENT, None),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "not-authorized");

    let (status, body) = send(
        &market,
        request(
            "POST",
            &format!("/jobs/{}/rate", job.id),
            CLIENT,
            Some(json!({"score": 5})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "wrong-state");

    send(&market, request("POST", &format!("/jobs/{}/accept", job.id), WORKER, None)).await;
    let (status, body) = send(
        &market,
        request(
            "POST",
            &format!("/jobs/{}/complete", job.id),
            WORKER,
            Some(json!({})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "missing-payload");
}

#[tokio::test]
async fn late_dispute_points_to_help() {
    let market = TestMarketplace::new();
    let job = create_job(&market).await;

    send(&market, request("POST", &format!("/jobs/{}/accept", job.id), WORKER, None)).await;
    send(
        &market,
        request(
            "POST",
            &format!("/jobs/{}/complete", job.id),
            WORKER,
            Some(json!({"proof_of_completion": "uploads/done.png"})),
        ),
    )
    .await;

    market.clock.advance(Duration::minutes(31));
    let (status, body) = send(
        &market,
        request(
            "POST",
            &format!("/jobs/{}/dispute", job.id),
            CLIENT,
            Some(json!({"reason": "Windows still dirty"})),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "deadline-passed");
    assert_eq!(body["recovery"], "request-help");

    let (status, _) = send(
        &market,
        request(
            "POST",
            &format!("/jobs/{}/help", job.id),
            CLIENT,
            Some(json!({"message": "Windows still dirty"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn my_jobs_listing_filters_and_counts() {
    let market = TestMarketplace::new();
    let first = create_job(&market).await;
    create_job(&market).await;
    send(&market, request("POST", &format!("/jobs/{}/cancel", first.id), CLIENT, None)).await;

    let (status, body) = send(
        &market,
        request("GET", "/jobs/mine?status=pending&sort=price-desc", CLIENT, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let listing: JobListing = serde_json::from_value(body).unwrap();
    assert_eq!(listing.total, 2);
    assert_eq!(listing.jobs.len(), 1);
    assert_eq!(listing.counts.get(&JobStatus::CancelledByClient), Some(&1));
}

#[tokio::test]
async fn edit_pending_job() {
    let market = TestMarketplace::new();
    let job = create_job(&market).await;

    let (status, body) = send(
        &market,
        request(
            "PUT",
            &format!("/jobs/{}", job.id),
            CLIENT,
            Some(json!({"price_cents": 12000})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let edited: Job = serde_json::from_value(body).unwrap();
    assert_eq!(edited.price_cents, 12000);
    assert_eq!(edited.version, job.version + 1);
}

#[tokio::test]
async fn notification_inbox_endpoints() {
    let market = TestMarketplace::new();
    let job = create_job(&market).await;
    send(&market, request("POST", &format!("/jobs/{}/accept", job.id), WORKER, None)).await;

    let (status, body) = send(
        &market,
        request("GET", "/notifications/unread-count", CLIENT, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["unread"], 1);

    let (_, body) = send(&market, request("GET", "/notifications", CLIENT, None)).await;
    let inbox: Vec<Notification> = serde_json::from_value(body).unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].job_id, job.id);

    let (status, _) = send(
        &market,
        request("POST", &format!("/notifications/{}/read", inbox[0].id), CLIENT, None),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // Another user cannot touch this inbox entry.
    let (status, _) = send(
        &market,
        request("DELETE", &format!("/notifications/{}", inbox[0].id), WORKER, None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = send(&market, request("DELETE", "/notifications", CLIENT, None)).await;
    assert_eq!(body["affected"], 1);

    let (_, body) = send(
        &market,
        request("GET", "/notifications/unread-count", CLIENT, None),
    )
    .await;
    assert_eq!(body["unread"], 0);
}

#[tokio::test]
async fn malformed_bodies_get_structured_errors() {
    let market = TestMarketplace::new();
    let job = create_job(&market).await;

    let (status, body) = send(
        &market,
        request(
            "POST",
            &format!("/jobs/{}/rate", job.id),
            CLIENT,
            Some(json!({"score": 300})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid-payload");
    assert_eq!(body["recovery"], "none");
    assert!(body["error"].is_string());

    // No body and no content type at all.
    let (status, body) = send(
        &market,
        request("POST", &format!("/jobs/{}/help", job.id), CLIENT, None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid-payload");

    let broken = Request::builder()
        .method("POST")
        .uri("/jobs")
        .header("x-actor-id", "client-1")
        .header("x-actor-role", "client")
        .header("content-type", "application/json")
        .body(Body::from("{\"title\": "))
        .unwrap();
    let (status, body) = send(&market, broken).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid-payload");
}

#[tokio::test]
async fn notification_stream_pushes_committed_events() {
    let market = TestMarketplace::new();
    let job = create_job(&market).await;

    let response = market
        .router()
        .oneshot(request("GET", "/notifications/stream", CLIENT, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "text/event-stream");

    send(&market, request("POST", &format!("/jobs/{}/accept", job.id), WORKER, None)).await;

    let mut body = response.into_body();
    let frame = tokio::time::timeout(std::time::Duration::from_secs(2), body.frame())
        .await
        .expect("no event within two seconds")
        .expect("stream ended")
        .unwrap();
    let text = String::from_utf8(frame.into_data().unwrap().to_vec()).unwrap();

    assert!(text.contains("event: job-accepted"), "frame: {text}");

    let data = text
        .lines()
        .find_map(|line| line.strip_prefix("data: "))
        .expect("frame has no data line");
    let notification: Notification = serde_json::from_str(data).unwrap();
    assert_eq!(notification.job_id, job.id);
    assert_eq!(notification.recipient_id, "client-1");
    assert!(text.contains(&format!("id: {}", notification.id)), "frame: {text}");

    let inbox = market.bus.list("client-1").await.unwrap();
    assert_eq!(inbox[0].id, notification.id);
}
