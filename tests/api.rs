use ghost_scan::analysis::JobUrlParser;
use ghost_scan::cache::{CacheConfig, JobCache};
use ghost_scan::metrics::UsageTracker;
use ghost_scan::service::ScanService;
use ghost_scan::store::{MemoryScanStore, ScanStore};
use ghost_scan::testing::{new_scan, MockAnalyzer};
use ghost_scan::web::build_rocket;
use rocket::http::{ContentType, Status};
use rocket::local::asynchronous::Client;
use serde_json::{json, Value};
use std::sync::Arc;

const POSTING: &str = "Entry level marketing coordinator. Manage social campaigns, \
    write newsletters, track analytics dashboards and coordinate events.";

async fn client(store: Arc<MemoryScanStore>, analyzer: MockAnalyzer) -> Client {
    let dyn_store: Arc<dyn ScanStore> = store;
    let service = ScanService::new(
        dyn_store.clone(),
        JobCache::new(dyn_store, CacheConfig::default()),
        Arc::new(analyzer),
        JobUrlParser::new().unwrap(),
        Arc::new(UsageTracker::new()),
    );
    let figment = rocket::Config::figment().merge(("log_level", "off"));
    Client::tracked(build_rocket(service, figment)).await.unwrap()
}

#[tokio::test]
async fn analyze_then_reuse() {
    let client = client(Arc::new(MemoryScanStore::new()), MockAnalyzer::new()).await;

    let response = client
        .post("/api/analyze-job")
        .header(ContentType::JSON)
        .body(json!({ "jobDescription": POSTING }).to_string())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["type"], "data");
    assert_eq!(body["data"]["scan"]["analysis_source"], "fresh");
    let first_id = body["data"]["scan"]["id"].as_i64().unwrap();

    let response = client
        .post("/api/analyze-job")
        .header(ContentType::JSON)
        .body(json!({ "job_description": POSTING.to_uppercase() }).to_string())
        .dispatch()
        .await;
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["data"]["scan"]["analysis_source"], "exact_cache");
    assert_eq!(
        body["data"]["cache_message"],
        "Found identical job posting analyzed recently"
    );

    let response = client.get(format!("/api/scans/{}", first_id)).dispatch().await;
    assert_eq!(response.status(), Status::Ok);

    let response = client.get("/api/cache-stats").dispatch().await;
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["data"]["total_scans"], 2);
    assert_eq!(body["data"]["exact_cache_hits"], 1);
    assert_eq!(body["data"]["cache_hit_rate"], 50.0);
}

#[tokio::test]
async fn missing_input_is_a_bad_request() {
    let client = client(Arc::new(MemoryScanStore::new()), MockAnalyzer::new()).await;

    let response = client
        .post("/api/analyze-job")
        .header(ContentType::JSON)
        .body("{}")
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::BadRequest);
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error_code"], "MISSING_INPUT");
}

#[tokio::test]
async fn unknown_scan_is_not_found() {
    let client = client(Arc::new(MemoryScanStore::new()), MockAnalyzer::new()).await;

    let response = client.get("/api/scans/404").dispatch().await;
    assert_eq!(response.status(), Status::NotFound);
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["error_code"], "SCAN_NOT_FOUND");
}

#[tokio::test]
async fn sharing_and_archive() {
    let store = Arc::new(MemoryScanStore::new());
    let low = store.create(new_scan("Clerk", "Acme", "low risk posting")).await.unwrap();
    let mut risky = new_scan("Clerk", "Acme", "high risk posting");
    risky.analysis.ghost_likelihood_score = 92;
    let risky = store.create(risky).await.unwrap();

    let client = client(store, MockAnalyzer::new()).await;

    let response = client
        .post(format!("/api/scans/{}/share", low.id))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::BadRequest);

    let response = client
        .post(format!("/api/scans/{}/share", risky.id))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    let response = client.get("/api/archive?limit=10").dispatch().await;
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["data"]["pagination"]["total"], 1);
    assert_eq!(body["data"]["pagination"]["has_more"], false);
    assert_eq!(body["data"]["scans"][0]["id"], risky.id);
}

#[tokio::test]
async fn outreach_is_generated_and_listed() {
    let store = Arc::new(MemoryScanStore::new());
    let scan = store
        .create(new_scan("Marketing Coordinator", "Hooli", POSTING))
        .await
        .unwrap();
    let client = client(store, MockAnalyzer::new()).await;

    let response = client
        .post("/api/generate-outreach")
        .header(ContentType::JSON)
        .body(json!({ "scanId": scan.id, "messageType": "email" }).to_string())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["data"]["scan_id"], scan.id);
    assert_eq!(body["data"]["message_type"], "email");
    assert!(body["data"]["message"].as_str().unwrap().contains("Hooli"));

    let response = client
        .get(format!("/api/scans/{}/outreach", scan.id))
        .dispatch()
        .await;
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let response = client
        .post("/api/generate-outreach")
        .header(ContentType::JSON)
        .body(json!({ "scanId": 999 }).to_string())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::NotFound);

    let response = client.get("/api/usage-status").dispatch().await;
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["data"]["daily_outreach"], 1);
}

#[tokio::test]
async fn outreach_without_provider_is_unavailable() {
    let store = Arc::new(MemoryScanStore::new());
    let scan = store.create(new_scan("Clerk", "Acme", POSTING)).await.unwrap();
    let client = client(store, MockAnalyzer::new().unavailable()).await;

    let response = client
        .post("/api/generate-outreach")
        .header(ContentType::JSON)
        .body(json!({ "scan_id": scan.id }).to_string())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::ServiceUnavailable);
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["error_code"], "OUTREACH_UNAVAILABLE");
}

#[tokio::test]
async fn status_endpoints() {
    let client = client(Arc::new(MemoryScanStore::new()), MockAnalyzer::new().unavailable()).await;

    let response = client.get("/api/health").dispatch().await;
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["data"]["status"], "ok");
    assert_eq!(body["data"]["database"], "ok");
    assert_eq!(body["data"]["provider_available"], false);

    let response = client.get("/api/usage-status").dispatch().await;
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["data"]["provider_status"], "offline");
    assert_eq!(body["data"]["service_mode"], "minimal");

    let response = client.get("/api/missing-route").dispatch().await;
    assert_eq!(response.status(), Status::NotFound);
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["error_code"], "NOT_FOUND");
}
