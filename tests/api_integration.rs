//! Integration tests for the tracker REST API.
//!
//! Each test spins up an Axum server on a random port over an in-memory
//! database and exercises the real HTTP contract with reqwest.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::time::timeout;

use yatt_tasks::config::ServerConfig;
use yatt_tasks::server;
use yatt_tasks::store::{Database, LibSqlBackend};

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Start an Axum server on a random port, return its base URL.
async fn start_server_with(config: ServerConfig) -> String {
    let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_memory().await.unwrap());
    let app = server::app(db, &config);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;

    format!("http://127.0.0.1:{port}")
}

async fn start_server() -> String {
    start_server_with(ServerConfig::default()).await
}

/// Thin JSON client bound to one server.
struct Api {
    base: String,
    client: Client,
}

impl Api {
    async fn new() -> Self {
        Self::with_base(start_server().await)
    }

    fn with_base(base: String) -> Self {
        Self {
            base,
            client: Client::new(),
        }
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        let resp = self
            .client
            .get(format!("{}{path}", self.base))
            .send()
            .await
            .unwrap();
        read(resp).await
    }

    async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let resp = self
            .client
            .post(format!("{}{path}", self.base))
            .json(&body)
            .send()
            .await
            .unwrap();
        read(resp).await
    }

    async fn put(&self, path: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = self.client.put(format!("{}{path}", self.base));
        if let Some(body) = body {
            req = req.json(&body);
        }
        read(req.send().await.unwrap()).await
    }

    async fn delete(&self, path: &str) -> StatusCode {
        self.client
            .delete(format!("{}{path}", self.base))
            .send()
            .await
            .unwrap()
            .status()
    }

    async fn create_org(&self, name: &str) -> String {
        let (status, body) = self.post("/organizations", json!({ "name": name })).await;
        assert_eq!(status, StatusCode::CREATED);
        id_of(&body)
    }

    async fn create_user(&self, name: &str) -> String {
        let (status, body) = self
            .post(
                "/users",
                json!({ "name": name, "email": format!("{name}@example.com") }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        id_of(&body)
    }

    async fn create_group(&self, org_id: &str, co_workers: &[&str]) -> String {
        let (status, body) = self
            .post(
                "/work-item-groups",
                json!({ "name": "Backlog", "organizationId": org_id, "coWorkerIds": co_workers }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        id_of(&body)
    }

    async fn create_item(&self, group_id: &str, title: &str, properties: Value) -> String {
        let (status, body) = self
            .post(
                "/work-items",
                json!({
                    "title": title,
                    "state": "open",
                    "workItemGroupId": group_id,
                    "properties": properties,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        id_of(&body)
    }
}

async fn read(resp: reqwest::Response) -> (StatusCode, Value) {
    let status = resp.status();
    let text = resp.text().await.unwrap();
    let body = if text.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).unwrap_or(Value::String(text))
    };
    (status, body)
}

fn id_of(body: &Value) -> String {
    body["id"].as_str().expect("response has an id").to_string()
}

fn titles(page: &Value) -> Vec<String> {
    page["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["title"].as_str().unwrap().to_string())
        .collect()
}

// ── Health & users ───────────────────────────────────────────────────

#[tokio::test]
async fn rest_health_endpoint() {
    timeout(TEST_TIMEOUT, async {
        let api = Api::new().await;
        let (status, body) = api.get("/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn create_user_sets_location_and_camel_case() {
    timeout(TEST_TIMEOUT, async {
        let api = Api::new().await;
        let resp = api
            .client
            .post(format!("{}/users", api.base))
            .json(&json!({ "name": "Ada", "email": "ada@example.com" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let location = resp.headers()["location"].to_str().unwrap().to_string();

        let body: Value = resp.json().await.unwrap();
        assert_eq!(location, format!("/users/{}", body["id"].as_str().unwrap()));
        assert_eq!(body["isActive"], true);
        assert!(body.get("createdAt").is_some());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn create_user_with_blank_name_is_bad_request() {
    timeout(TEST_TIMEOUT, async {
        let api = Api::new().await;
        let (status, body) = api
            .post("/users", json!({ "name": " ", "email": "x@example.com" }))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("name"));
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn deactivated_user_is_hidden_from_list_but_readable() {
    timeout(TEST_TIMEOUT, async {
        let api = Api::new().await;
        let ada = api.create_user("ada").await;
        let bob = api.create_user("bob").await;

        assert_eq!(api.delete(&format!("/users/{bob}")).await, StatusCode::NO_CONTENT);

        let (_, users) = api.get("/users").await;
        let ids: Vec<&str> = users
            .as_array()
            .unwrap()
            .iter()
            .map(|u| u["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec![ada.as_str()]);

        let (status, fetched) = api.get(&format!("/users/{bob}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["isActive"], false);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn update_user_overwrites_fields() {
    timeout(TEST_TIMEOUT, async {
        let api = Api::new().await;
        let ada = api.create_user("ada").await;

        let (status, body) = api
            .put(
                &format!("/users/{ada}"),
                Some(json!({ "name": "Ada L", "email": "ada@l.org", "isActive": true })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Ada L");
        assert_eq!(body["email"], "ada@l.org");
    })
    .await
    .expect("test timed out");
}

// ── Errors ───────────────────────────────────────────────────────────

#[tokio::test]
async fn malformed_and_missing_ids() {
    timeout(TEST_TIMEOUT, async {
        let api = Api::new().await;

        let (status, body) = api.get("/work-items/not-a-uuid").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let missing = uuid::Uuid::new_v4();
        let (status, body) = api.get(&format!("/work-items/{missing}")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("not found"));

        assert_eq!(
            api.delete(&format!("/work-item-groups/{missing}")).await,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            api.delete(&format!("/users/{missing}")).await,
            StatusCode::NOT_FOUND
        );
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn malformed_json_body_is_bad_request() {
    timeout(TEST_TIMEOUT, async {
        let api = Api::new().await;
        let resp = api
            .client
            .post(format!("{}/work-items", api.base))
            .header("content-type", "application/json")
            .body("{not json")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = resp.json().await.unwrap();
        assert!(body["error"].is_string());
    })
    .await
    .expect("test timed out");
}

// ── Groups & items ───────────────────────────────────────────────────

#[tokio::test]
async fn group_lifecycle_with_cascade_delete() {
    timeout(TEST_TIMEOUT, async {
        let api = Api::new().await;
        let org = api.create_org("Acme").await;
        let group = api.create_group(&org, &[]).await;
        let item = api.create_item(&group, "A", json!({})).await;

        let (status, listed) = api.get("/work-item-groups").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed[0]["itemCount"], 1);

        let (status, detail) = api.get(&format!("/work-item-groups/{group}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(detail["items"][0]["id"], item.as_str());

        let (status, renamed) = api
            .put(
                &format!("/work-item-groups/{group}"),
                Some(json!({ "name": "Sprint 1" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(renamed["name"], "Sprint 1");

        assert_eq!(
            api.delete(&format!("/work-item-groups/{group}")).await,
            StatusCode::NO_CONTENT
        );
        let (status, _) = api.get(&format!("/work-item-groups/{group}")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = api.get(&format!("/work-items/{item}")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (_, listed) = api.get("/work-item-groups").await;
        assert!(listed.as_array().unwrap().is_empty());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn create_group_for_unknown_org_is_bad_request() {
    timeout(TEST_TIMEOUT, async {
        let api = Api::new().await;
        let (status, _) = api
            .post(
                "/work-item-groups",
                json!({ "name": "Orphan", "organizationId": uuid::Uuid::new_v4() }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn update_work_item_is_full_overwrite() {
    timeout(TEST_TIMEOUT, async {
        let api = Api::new().await;
        let org = api.create_org("Acme").await;
        let group = api.create_group(&org, &[]).await;
        let item = api.create_item(&group, "A", json!({ "priority": 3 })).await;

        let (status, body) = api
            .put(
                &format!("/work-items/{item}"),
                Some(json!({ "title": "A2", "state": "done" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["title"], "A2");
        assert_eq!(body["state"], "done");
        assert!(body["assigneeId"].is_null());
        assert!(body["properties"].as_object().unwrap().is_empty());
        assert_eq!(body["workItemGroupId"], group.as_str());

        assert_eq!(api.delete(&format!("/work-items/{item}")).await, StatusCode::NO_CONTENT);
        let (status, _) = api
            .put(&format!("/work-items/{item}"), Some(json!({ "title": "A3" })))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    })
    .await
    .expect("test timed out");
}

// ── Listing ──────────────────────────────────────────────────────────

#[tokio::test]
async fn listing_sorts_by_property_desc_and_skips_deleted() {
    timeout(TEST_TIMEOUT, async {
        let api = Api::new().await;
        let org = api.create_org("Acme").await;
        let group = api.create_group(&org, &[]).await;
        api.create_item(&group, "A", json!({ "priority": "2" })).await;
        api.create_item(&group, "B", json!({ "priority": "1" })).await;
        let c = api.create_item(&group, "C", json!({ "priority": "3" })).await;
        api.delete(&format!("/work-items/{c}")).await;

        let (status, page) = api
            .get(&format!(
                "/work-item-groups/{group}/work-items?page=1&pageSize=10&sortBy=properties.priority&sortOrder=desc"
            ))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["totalCount"], 2);
        assert_eq!(page["page"], 1);
        assert_eq!(page["pageSize"], 10);
        assert_eq!(titles(&page), vec!["A", "B"]);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn listing_paginates_with_defaults() {
    timeout(TEST_TIMEOUT, async {
        let api = Api::new().await;
        let org = api.create_org("Acme").await;
        let group = api.create_group(&org, &[]).await;
        for i in 0..12 {
            api.create_item(&group, &format!("item-{i:02}"), json!({})).await;
        }

        let (_, first) = api.get(&format!("/work-item-groups/{group}/work-items")).await;
        assert_eq!(first["totalCount"], 12);
        assert_eq!(first["pageSize"], 10);
        assert_eq!(first["items"].as_array().unwrap().len(), 10);

        let (_, second) = api
            .get(&format!("/work-item-groups/{group}/work-items?page=2"))
            .await;
        assert_eq!(titles(&second), vec!["item-10", "item-11"]);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn listing_rejects_unknown_sort_field() {
    timeout(TEST_TIMEOUT, async {
        let api = Api::new().await;
        let org = api.create_org("Acme").await;
        let group = api.create_group(&org, &[]).await;
        let (status, body) = api
            .get(&format!("/work-item-groups/{group}/work-items?sortBy=colour"))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("colour"));
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn listing_unknown_group_is_empty_page() {
    timeout(TEST_TIMEOUT, async {
        let api = Api::new().await;
        let missing = uuid::Uuid::new_v4();
        let (status, page) = api
            .get(&format!("/work-item-groups/{missing}/work-items"))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["totalCount"], 0);
    })
    .await
    .expect("test timed out");
}

// ── Assignment ───────────────────────────────────────────────────────

#[tokio::test]
async fn eligible_assignees_union_of_members_and_co_workers() {
    timeout(TEST_TIMEOUT, async {
        let api = Api::new().await;
        let org = api.create_org("Acme").await;
        let u1 = api.create_user("u1").await;
        let u2 = api.create_user("u2").await;
        let u3 = api.create_user("u3").await;
        for member in [&u1, &u2] {
            let (status, _) = api
                .put(&format!("/organizations/{org}/members/{member}"), None)
                .await;
            assert_eq!(status, StatusCode::NO_CONTENT);
        }
        let group = api.create_group(&org, &[u3.as_str()]).await;
        api.delete(&format!("/users/{u2}")).await;

        let (status, users) = api
            .get(&format!("/work-items/assignees?groupId={group}"))
            .await;
        assert_eq!(status, StatusCode::OK);
        let ids: Vec<&str> = users
            .as_array()
            .unwrap()
            .iter()
            .map(|u| u["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec![u1.as_str(), u3.as_str()]);

        let (status, _) = api.get("/work-items/assignees").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let missing = uuid::Uuid::new_v4();
        let (status, _) = api
            .get(&format!("/work-items/assignees?groupId={missing}"))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn assign_outcomes() {
    timeout(TEST_TIMEOUT, async {
        let api = Api::new().await;
        let org = api.create_org("Acme").await;
        let group = api.create_group(&org, &[]).await;
        let item = api.create_item(&group, "A", json!({})).await;
        let ada = api.create_user("ada").await;
        let bob = api.create_user("bob").await;
        let gone = api.create_user("gone").await;
        api.delete(&format!("/users/{gone}")).await;

        let (status, body) = api.put(&format!("/work-items/{item}/assign/{ada}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["assigneeId"], ada.as_str());

        let (status, body) = api.put(&format!("/work-items/{item}/assign/{bob}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["assigneeId"], bob.as_str());

        let (status, _) = api.put(&format!("/work-items/{item}/assign/{gone}"), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let missing = uuid::Uuid::new_v4();
        let (status, _) = api.put(&format!("/work-items/{missing}/assign/{ada}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, stored) = api.get(&format!("/work-items/{item}")).await;
        assert_eq!(stored["assigneeId"], bob.as_str());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn enforced_eligibility_rejects_outsiders() {
    timeout(TEST_TIMEOUT, async {
        let config = ServerConfig {
            enforce_assignee_eligibility: true,
            ..ServerConfig::default()
        };
        let api = Api::with_base(start_server_with(config).await);
        let org = api.create_org("Acme").await;
        let group = api.create_group(&org, &[]).await;
        let item = api.create_item(&group, "A", json!({})).await;
        let outsider = api.create_user("outsider").await;

        let (status, _) = api
            .put(&format!("/work-items/{item}/assign/{outsider}"), None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        api.put(&format!("/work-item-groups/{group}/co-workers/{outsider}"), None)
            .await;
        let (status, _) = api
            .put(&format!("/work-items/{item}/assign/{outsider}"), None)
            .await;
        assert_eq!(status, StatusCode::OK);
    })
    .await
    .expect("test timed out");
}

// ── Organizations ────────────────────────────────────────────────────

#[tokio::test]
async fn organization_detail_lists_members() {
    timeout(TEST_TIMEOUT, async {
        let api = Api::new().await;
        let org = api.create_org("Acme").await;
        let ada = api.create_user("ada").await;
        api.put(&format!("/organizations/{org}/members/{ada}"), None).await;

        let (status, detail) = api.get(&format!("/organizations/{org}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(detail["name"], "Acme");
        assert_eq!(detail["memberIds"][0], ada.as_str());

        assert_eq!(
            api.delete(&format!("/organizations/{org}/members/{ada}")).await,
            StatusCode::NO_CONTENT
        );
        let (_, detail) = api.get(&format!("/organizations/{org}")).await;
        assert!(detail["memberIds"].as_array().unwrap().is_empty());

        let (_, all) = api.get("/organizations").await;
        assert_eq!(all.as_array().unwrap().len(), 1);
    })
    .await
    .expect("test timed out");
}

// ── Preferences ──────────────────────────────────────────────────────

#[tokio::test]
async fn preferences_roundtrip() {
    timeout(TEST_TIMEOUT, async {
        let api = Api::new().await;
        let user = uuid::Uuid::new_v4();

        let (status, _) = api.get(&format!("/user-preferences/{user}")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = api
            .put(
                &format!("/user-preferences/{user}"),
                Some(json!({ "columnOrder": ["title", "state"] })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["columnOrder"], json!(["title", "state"]));

        let (status, body) = api.get(&format!("/user-preferences/{user}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["userId"], user.to_string());
        assert_eq!(body["columnOrder"], json!(["title", "state"]));
    })
    .await
    .expect("test timed out");
}
