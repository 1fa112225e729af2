//! HTTP integration tests for the robot and admin endpoints.
//!
//! Each test starts its own server on an ephemeral port with a fresh database.

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, to_bytes};
use axum::http::Request;
use reqwest::StatusCode;
use serde_json::{Value, json};
use tower::ServiceExt;

use common::TestServer;
use robokey::robot::StaticCatalog;
use robokey::server::{AppState, create_router};
use robokey::types::Permission;

fn robots_url(server: &TestServer, project: &str) -> String {
    server.url(&format!("/api/v2.0/projects/{project}/robots"))
}

fn pull_access(project_id: i64) -> Value {
    json!([{
        "resource": format!("/project/{project_id}/repository"),
        "action": "pull",
    }])
}

async fn create_robot(
    client: &reqwest::Client,
    server: &TestServer,
    project: &str,
    name: &str,
    access: Value,
) -> reqwest::Response {
    client
        .post(robots_url(server, project))
        .bearer_auth(&server.admin_token)
        .json(&json!({"name": name, "description": "ci", "access": access}))
        .send()
        .await
        .expect("create robot")
}

#[tokio::test]
async fn test_health() {
    let server = TestServer::start().await;
    let resp = reqwest::get(server.url("/health")).await.expect("health");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_router_in_process() {
    let server = TestServer::start().await;
    server.create_project("library");
    let router = create_router(Arc::new(AppState::new(
        server.store.clone(),
        StaticCatalog::builtin(),
        Duration::from_secs(5),
    )));

    let resp = router
        .clone()
        .oneshot(
            Request::get("/api/v2.0/projects/library/robots")
                .header("authorization", format!("Bearer {}", server.admin_token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(resp.headers()["x-total-count"], "0");
    let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["data"], json!([]));

    let resp = router
        .oneshot(
            Request::get("/api/v2.0/projects/missing/robots")
                .header("authorization", format!("Bearer {}", server.admin_token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);
}

#[tokio::test]
async fn test_create_robot_returns_secret_and_location() {
    let server = TestServer::start().await;
    let project = server.create_project("library");
    let client = reqwest::Client::new();

    let resp = create_robot(&client, &server, "library", "builder", pull_access(project.id)).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let id = {
        let location = resp
            .headers()
            .get("location")
            .expect("location header")
            .to_str()
            .unwrap()
            .to_string();
        let body: Value = resp.json().await.unwrap();
        let id = body["data"]["id"].as_i64().expect("robot id");
        assert_eq!(location, format!("/api/v2.0/projects/library/robots/{id}"));
        assert_eq!(body["data"]["name"], "builder");
        assert_eq!(body["data"]["secret"].as_str().unwrap().len(), 32);
        id
    };

    let resp = client
        .get(format!("{}/{id}", robots_url(&server, &project.id.to_string())))
        .bearer_auth(&server.admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["project_id"], project.id);
    assert_eq!(body["data"]["level"], "project");
    assert_eq!(body["data"]["disable"], false);
    assert!(body["data"].get("secret").is_none());

    let permissions = &body["data"]["permissions"][0];
    assert_eq!(permissions["kind"], "project");
    assert_eq!(permissions["namespace"], "library");
    assert_eq!(permissions["access"][0]["resource"], "repository");
    assert_eq!(permissions["access"][0]["action"], "pull");
    assert_eq!(permissions["access"][0]["effect"], "allow");
}

#[tokio::test]
async fn test_create_robot_rejections() {
    let server = TestServer::start().await;
    let project = server.create_project("library");
    let client = reqwest::Client::new();

    let resp = create_robot(&client, &server, "library", "empty", json!([])).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "bad request no access");

    let access = json!([{"resource": "/project/1/repository", "action": "fly"}]);
    let resp = create_robot(&client, &server, "library", "flyer", access).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(
        body["error"],
        "fly action of /project/1/repository resource not exist in project library"
    );

    let access = json!([{"resource": "repository", "action": "pull"}]);
    let resp = create_robot(&client, &server, "library", "bare", access).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = create_robot(&client, &server, "missing", "ghost", pull_access(project.id)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = create_robot(&client, &server, "library", "dup", pull_access(project.id)).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let resp = create_robot(&client, &server, "library", "dup", pull_access(project.id)).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = client
        .get(robots_url(&server, "library"))
        .bearer_auth(&server.admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.headers()["x-total-count"], "1");
}

#[tokio::test]
async fn test_list_robots_paging_and_filter() {
    let server = TestServer::start().await;
    let project = server.create_project("library");
    let client = reqwest::Client::new();

    for i in 0..12 {
        let resp = create_robot(
            &client,
            &server,
            "library",
            &format!("robot-{i}"),
            pull_access(project.id),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    let resp = client
        .get(robots_url(&server, "library"))
        .query(&[("page", "2"), ("page_size", "5")])
        .bearer_auth(&server.admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["x-total-count"], "12");
    let body: Value = resp.json().await.unwrap();
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["robot-5", "robot-6", "robot-7", "robot-8", "robot-9"]);

    let resp = client
        .get(robots_url(&server, "library"))
        .query(&[("q", "name=~robot-1")])
        .bearer_auth(&server.admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.headers()["x-total-count"], "3");

    let resp = client
        .get(robots_url(&server, "library"))
        .query(&[("q", "bogus")])
        .bearer_auth(&server.admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_and_delete_robot() {
    let server = TestServer::start().await;
    let project = server.create_project("library");
    let other = server.create_project("other");
    let client = reqwest::Client::new();

    let resp = create_robot(&client, &server, "library", "builder", pull_access(project.id)).await;
    let body: Value = resp.json().await.unwrap();
    let id = body["data"]["id"].as_i64().unwrap();
    let robot_url = format!("{}/{id}", robots_url(&server, "library"));

    let resp = client
        .put(&robot_url)
        .bearer_auth(&server.admin_token)
        .json(&json!({"disable": true, "description": "paused"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = client
        .get(&robot_url)
        .bearer_auth(&server.admin_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["disable"], true);
    assert_eq!(body["data"]["description"], "paused");

    // Robots are never visible through another project.
    let foreign_url = format!("{}/{id}", robots_url(&server, &other.id.to_string()));
    let resp = client
        .get(&foreign_url)
        .bearer_auth(&server.admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = client
        .delete(&foreign_url)
        .bearer_auth(&server.admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    for _ in 0..2 {
        let resp = client
            .delete(&robot_url)
            .bearer_auth(&server.admin_token)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let resp = client
        .get(&robot_url)
        .bearer_auth(&server.admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_authentication_required() {
    let server = TestServer::start().await;
    server.create_project("library");
    let client = reqwest::Client::new();

    let resp = client
        .get(robots_url(&server, "library"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(resp.headers().contains_key("www-authenticate"));

    let resp = client
        .get(robots_url(&server, "library"))
        .bearer_auth("rk_not-a-real-token")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_user_permissions_are_enforced() {
    let server = TestServer::start().await;
    let project = server.create_project("library");
    let reader = server.create_user("reader", Some((project.id, Permission::ROBOT_READ)));
    let stranger = server.create_user("stranger", None);
    let client = reqwest::Client::new();

    let resp = client
        .get(robots_url(&server, "library"))
        .bearer_auth(&reader)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .post(robots_url(&server, "library"))
        .bearer_auth(&reader)
        .json(&json!({"name": "sneaky", "access": pull_access(project.id)}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = client
        .get(robots_url(&server, "library"))
        .bearer_auth(&stranger)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = client
        .get(server.url("/api/v2.0/admin/projects"))
        .bearer_auth(&reader)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_project_and_grant_flow() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(server.url("/api/v2.0/admin/projects"))
        .bearer_auth(&server.admin_token)
        .json(&json!({"name": "library"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = resp.json().await.unwrap();
    let project_id = body["data"]["id"].as_i64().unwrap();

    let resp = client
        .post(server.url("/api/v2.0/admin/projects"))
        .bearer_auth(&server.admin_token)
        .json(&json!({"name": "library"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = client
        .post(server.url("/api/v2.0/admin/users"))
        .bearer_auth(&server.admin_token)
        .json(&json!({"name": "alice"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = resp.json().await.unwrap();
    let user_id = body["data"]["id"].as_str().unwrap().to_string();

    let resp = client
        .post(server.url(&format!("/api/v2.0/admin/users/{user_id}/tokens")))
        .bearer_auth(&server.admin_token)
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = resp.json().await.unwrap();
    let alice_token = body["data"]["token"].as_str().unwrap().to_string();

    let resp = client
        .post(server.url(&format!("/api/v2.0/admin/users/{user_id}/project-grants")))
        .bearer_auth(&server.admin_token)
        .json(&json!({"project": "library", "allow": ["robot:admin"]}))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());

    let resp = client
        .post(robots_url(&server, "library"))
        .bearer_auth(&alice_token)
        .json(&json!({"name": "builder", "access": pull_access(project_id)}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = client
        .delete(server.url(&format!(
            "/api/v2.0/admin/users/{user_id}/project-grants/library"
        )))
        .bearer_auth(&server.admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = client
        .get(robots_url(&server, "library"))
        .bearer_auth(&alice_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = client
        .get(server.url("/api/v2.0/admin/catalog"))
        .bearer_auth(&server.admin_token)
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert!(
        body["data"]["policies"]
            .as_array()
            .unwrap()
            .iter()
            .any(|p| p["resource"] == "repository" && p["action"] == "pull")
    );
}

#[tokio::test]
async fn test_user_token_expiry_bounds() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();
    server.create_user("alice", None);
    let tokens_url = server.url("/api/v2.0/admin/users/alice/tokens");

    for seconds in [i64::MAX, 0, -5] {
        let resp = client
            .post(&tokens_url)
            .bearer_auth(&server.admin_token)
            .json(&json!({"expires_in_seconds": seconds}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{seconds}");
    }

    let resp = client
        .post(&tokens_url)
        .bearer_auth(&server.admin_token)
        .json(&json!({"expires_in_seconds": 3600}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = resp.json().await.unwrap();
    assert!(body["data"]["metadata"]["expires_at"].is_string());

    let resp = client
        .get(robots_url(&server, "library"))
        .bearer_auth(body["data"]["token"].as_str().unwrap())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
