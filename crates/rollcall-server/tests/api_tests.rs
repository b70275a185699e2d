// End-to-end tests for the registry HTTP API
//
// The app is driven in-process with a scripted probe standing in for remote
// nodes; the sweeper is run directly with explicit cycle times.

use std::collections::HashMap;
use std::sync::Arc;

use actix_web::{App, http::StatusCode, test, web};
use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use parking_lot::RwLock;
use rollcall_migration::{Migrator, MigratorTrait};
use rollcall_persistence::{
    ExternalDbPersistService, MemoryPersistService, NodePersistence,
    sea_orm::{ConnectOptions, Database},
};
use rollcall_registry::{HealthSweeper, NodeInfo, NodeProbe, RegistryService, SweeperConfig};
use rollcall_server::{api, model::AppState};
use serde_json::{Value, json};

#[derive(Default)]
struct FakeNodes {
    healthy: RwLock<HashMap<String, bool>>,
    info: RwLock<HashMap<String, NodeInfo>>,
}

impl FakeNodes {
    fn up(&self, domain: &str) {
        self.healthy.write().insert(domain.to_string(), true);
    }

    fn down(&self, domain: &str) {
        self.healthy.write().insert(domain.to_string(), false);
    }

    fn info(&self, domain: &str, info: NodeInfo) {
        self.info.write().insert(domain.to_string(), info);
    }
}

#[async_trait]
impl NodeProbe for FakeNodes {
    async fn probe_health(&self, domain: &str) -> bool {
        self.healthy.read().get(domain).copied().unwrap_or(false)
    }

    async fn fetch_info(&self, domain: &str) -> Option<NodeInfo> {
        self.info.read().get(domain).cloned()
    }
}

async fn sqlite_store() -> Arc<dyn NodePersistence> {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(options).await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    Arc::new(ExternalDbPersistService::new(db))
}

fn app_state(store: Arc<dyn NodePersistence>, probe: Arc<FakeNodes>) -> Arc<AppState> {
    Arc::new(AppState::new(Arc::new(RegistryService::new(store, probe))))
}

macro_rules! init_app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::from($state.clone()))
                .service(api::route::routes()),
        )
        .await
    };
}

fn announce(body: Value) -> test::TestRequest {
    test::TestRequest::post().uri("/announce").set_json(body)
}

async fn lifecycle_scenario(store: Arc<dyn NodePersistence>) {
    let probe = Arc::new(FakeNodes::default());
    probe.up("a.example");
    probe.info(
        "a.example",
        NodeInfo {
            track_count: Some(10),
            ..Default::default()
        },
    );
    let state = app_state(store.clone(), probe.clone());
    let app = init_app!(state);

    // Register
    let resp = test::call_service(&app, announce(json!({"domain": "a.example"})).to_request()).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "registered");
    assert_eq!(body["domain"], "a.example");
    let token = body["token"].as_str().unwrap().to_string();
    assert_eq!(token.len(), 64);

    // Heartbeat
    let resp = test::call_service(
        &app,
        announce(json!({"domain": "a.example", "token": token, "track_count": 20})).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "updated");
    assert!(body.get("token").is_none());

    let req = test::TestRequest::get().uri("/nodes/a.example").to_request();
    let node: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(node["track_count"], 20);
    assert_eq!(node["is_online"], true);
    assert!(node.get("token").is_none());

    // Node goes away; first failing sweep marks it offline
    probe.down("a.example");
    let sweeper = HealthSweeper::new(store.clone(), probe.clone(), SweeperConfig::default());
    let now = Utc::now();
    let report = sweeper.sweep_at(now).await;
    assert_eq!(report.went_offline, 1);

    let req = test::TestRequest::get().uri("/nodes/a.example").to_request();
    let node: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(node["is_online"], false);
    assert!(node["down_since"].is_string());

    let req = test::TestRequest::get().uri("/nodes").to_request();
    let list: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(list["total"], 0);

    // Still down 48 hours later
    let report = sweeper.sweep_at(now + TimeDelta::hours(48)).await;
    assert_eq!(report.evicted, 1);

    let req = test::TestRequest::get()
        .uri("/nodes?include_offline=true")
        .to_request();
    let list: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(list["total"], 0);
    assert_eq!(list["nodes"], json!([]));
}

#[actix_web::test]
async fn test_lifecycle_memory_store() {
    lifecycle_scenario(Arc::new(MemoryPersistService::new())).await;
}

#[actix_web::test]
async fn test_lifecycle_sqlite_store() {
    lifecycle_scenario(sqlite_store().await).await;
}

#[actix_web::test]
async fn test_announce_validation() {
    let state = app_state(
        Arc::new(MemoryPersistService::new()),
        Arc::new(FakeNodes::default()),
    );
    let app = init_app!(state);

    let resp = test::call_service(&app, announce(json!({"name": "no domain"})).to_request()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "domain is required");

    let resp = test::call_service(&app, announce(json!({"domain": "https:///"})).to_request()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = test::call_service(&app, announce(json!({"domain": 42})).to_request()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post()
        .uri("/announce")
        .insert_header(("content-type", "application/json"))
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"].as_str().unwrap().starts_with("invalid request body"));
}

#[actix_web::test]
async fn test_registration_conflicts_and_unreachable() {
    let probe = Arc::new(FakeNodes::default());
    probe.up("a.example");
    let state = app_state(Arc::new(MemoryPersistService::new()), probe);
    let app = init_app!(state);

    let resp = test::call_service(&app, announce(json!({"domain": "a.example"})).to_request()).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = test::call_service(&app, announce(json!({"domain": "https://a.example/"})).to_request()).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["hint"].is_string());

    let resp = test::call_service(&app, announce(json!({"domain": "down.example"})).to_request()).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let req = test::TestRequest::get().uri("/stats").to_request();
    let stats: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(stats["total_nodes"], 1);
}

#[actix_web::test]
async fn test_heartbeat_token_checks() {
    let probe = Arc::new(FakeNodes::default());
    probe.up("a.example");
    probe.up("b.example");
    let state = app_state(Arc::new(MemoryPersistService::new()), probe);
    let app = init_app!(state);

    let body: Value = test::call_and_read_body_json(&app, announce(json!({"domain": "a.example"})).to_request()).await;
    let token_a = body["token"].as_str().unwrap().to_string();
    test::call_service(&app, announce(json!({"domain": "b.example"})).to_request()).await;

    let resp = test::call_service(
        &app,
        announce(json!({"domain": "b.example", "token": token_a})).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = test::call_service(
        &app,
        announce(json!({"domain": "a.example", "token": "0".repeat(64)})).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_node_defaults_and_listing_order() {
    let probe = Arc::new(FakeNodes::default());
    for domain in ["small.example", "big.example", "gone.example"] {
        probe.up(domain);
    }
    let store: Arc<dyn NodePersistence> = Arc::new(MemoryPersistService::new());
    let state = app_state(store.clone(), probe.clone());
    let app = init_app!(state);

    test::call_service(
        &app,
        announce(json!({"domain": "small.example", "track_count": 5, "name": "Small"})).to_request(),
    )
    .await;
    test::call_service(&app, announce(json!({"domain": "big.example", "track_count": 50})).to_request()).await;
    test::call_service(&app, announce(json!({"domain": "gone.example", "track_count": 500})).to_request()).await;

    let req = test::TestRequest::get().uri("/nodes/small.example").to_request();
    let node: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(node["name"], "Small");
    assert_eq!(node["description"], "");
    assert_eq!(node["open_registration"], true);
    assert_eq!(node["p2p_enabled"], false);
    assert_eq!(node["is_online"], true);
    assert!(node["down_since"].is_null());

    probe.down("gone.example");
    HealthSweeper::new(store, probe, SweeperConfig::default())
        .sweep()
        .await;

    let req = test::TestRequest::get()
        .uri("/nodes?include_offline=true")
        .to_request();
    let list: Value = test::call_and_read_body_json(&app, req).await;
    let domains: Vec<&str> = list["nodes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["domain"].as_str().unwrap())
        .collect();
    assert_eq!(domains, vec!["big.example", "small.example", "gone.example"]);
    assert!(list["nodes"][0].get("token").is_none());

    let req = test::TestRequest::get().uri("/nodes").to_request();
    let list: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(list["total"], 2);

    let req = test::TestRequest::get().uri("/nodes/missing.example").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"].is_string());
}

#[actix_web::test]
async fn test_remove_node() {
    let probe = Arc::new(FakeNodes::default());
    probe.up("a.example");
    let state = app_state(Arc::new(MemoryPersistService::new()), probe);
    let app = init_app!(state);

    let body: Value = test::call_and_read_body_json(&app, announce(json!({"domain": "a.example"})).to_request()).await;
    let token = body["token"].as_str().unwrap().to_string();

    let req = test::TestRequest::delete().uri("/nodes/a.example").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::delete()
        .uri("/nodes/a.example")
        .insert_header(("Authorization", "Token abc"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::delete()
        .uri("/nodes/a.example")
        .insert_header(("Authorization", format!("Bearer {}", "f".repeat(64))))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::delete()
        .uri("/nodes/a.example")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body, json!({"status": "removed", "domain": "a.example"}));

    let req = test::TestRequest::get().uri("/nodes/a.example").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_stats_and_healthz() {
    let probe = Arc::new(FakeNodes::default());
    probe.up("a.example");
    probe.up("b.example");
    let state = app_state(sqlite_store().await, probe);
    let app = init_app!(state);

    test::call_service(
        &app,
        announce(json!({"domain": "a.example", "track_count": 3, "user_count": 2})).to_request(),
    )
    .await;
    test::call_service(
        &app,
        announce(json!({"domain": "b.example", "track_count": 4, "user_count": -7})).to_request(),
    )
    .await;

    let req = test::TestRequest::get().uri("/stats").to_request();
    let stats: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(
        stats,
        json!({"total_nodes": 2, "online_nodes": 2, "total_tracks": 7, "total_users": 2})
    );

    let req = test::TestRequest::get().uri("/healthz").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body, json!({"status": "ok"}));
}
