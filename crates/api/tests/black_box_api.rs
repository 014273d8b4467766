use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use forgecrm_api::app::{build_app, AppServices};
use forgecrm_auth::{JwtClaims, Role};
use forgecrm_core::UserId;
use forgecrm_entities::User;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{json, Value};

const SECRET: &str = "test-secret";

struct TestServer {
    base_url: String,
    services: Arc<AppServices>,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod over in-memory services, bound to an ephemeral port.
        let services = Arc::new(AppServices::in_memory().await.expect("failed to seed services"));
        let app = build_app(services.clone(), SECRET);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            services,
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Register a user record and return it with a bearer token.
    fn user(&self, role: Role) -> (User, String) {
        let id = UserId::new();
        let user = User::new(id, format!("{id}@example.com"), "Test User", role, Utc::now());
        self.services.users.upsert(user.id, user.clone()).unwrap();
        let token = mint_jwt(user.id, role);
        (user, token)
    }

    async fn get(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .unwrap()
    }

    async fn send(&self, method: reqwest::Method, path: &str, token: &str, body: Value) -> reqwest::Response {
        self.client
            .request(method, self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(sub: UserId, role: Role) -> String {
    let now = Utc::now();
    let claims = JwtClaims {
        sub,
        role,
        issued_at: now,
        expires_at: now + ChronoDuration::minutes(10),
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .expect("failed to encode jwt")
}

async fn error_code(res: reqwest::Response) -> String {
    let body: Value = res.json().await.unwrap();
    body["error"].as_str().unwrap_or_default().to_string()
}

#[tokio::test]
async fn health_is_public_and_everything_else_requires_auth() {
    let server = TestServer::spawn().await;

    let res = server.client.get(server.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = server.client.get(server.url("/whoami")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(res).await, "unauthenticated");

    let res = server.get("/whoami", "not-a-jwt").await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = server
        .client
        .get(server.url("/whoami"))
        .header("authorization", "Basic abc")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn expired_token_is_rejected() {
    let server = TestServer::spawn().await;
    let issued = Utc::now() - ChronoDuration::hours(2);
    let claims = JwtClaims {
        sub: UserId::new(),
        role: Role::Admin,
        issued_at: issued,
        expires_at: issued + ChronoDuration::minutes(10),
    };
    let token = jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap();

    let res = server.get("/whoami", &token).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn whoami_reports_the_resolved_principal() {
    let server = TestServer::spawn().await;
    let (user, token) = server.user(Role::Support);

    let res = server.get("/whoami", &token).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["user_id"], user.id.to_string());
    assert_eq!(body["role"], "support");
}

#[tokio::test]
async fn api_key_resolves_to_the_same_principal_until_revoked() {
    let server = TestServer::spawn().await;
    let (user, token) = server.user(Role::Sales);

    let res = server
        .send(reqwest::Method::POST, "/api-keys", &token, json!({ "label": "ci" }))
        .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let issued: Value = res.json().await.unwrap();
    let key = issued["key"].as_str().unwrap().to_string();
    let key_id = issued["id"].as_str().unwrap().to_string();
    assert!(key.starts_with("fcrm_"));

    let res = server
        .client
        .get(server.url("/whoami"))
        .header("authorization", format!("ApiKey {key}"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["user_id"], user.id.to_string());
    assert_eq!(body["role"], "sales");

    let listed: Value = server.get("/api-keys", &token).await.json().await.unwrap();
    assert_eq!(listed["items"].as_array().unwrap().len(), 1);
    assert!(listed["items"][0].get("key").is_none());

    let res = server
        .send(reqwest::Method::DELETE, &format!("/api-keys/{key_id}"), &token, json!({}))
        .await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = server
        .client
        .get(server.url("/whoami"))
        .header("authorization", format!("ApiKey {key}"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn api_keys_can_be_switched_off_through_configuration() {
    let server = TestServer::spawn().await;
    let (_, admin) = server.user(Role::Admin);

    let issued: Value = server
        .send(reqwest::Method::POST, "/api-keys", &admin, json!({ "label": "ops" }))
        .await
        .json()
        .await
        .unwrap();
    let key = issued["key"].as_str().unwrap().to_string();

    let res = server
        .send(
            reqwest::Method::PUT,
            "/config/auth.api_keys.enabled",
            &admin,
            json!({ "value": false }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = server
        .client
        .get(server.url("/whoami"))
        .header("authorization", format!("ApiKey {key}"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // Bearer tokens are unaffected.
    assert_eq!(server.get("/whoami", &admin).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn configuration_writes_are_admin_only_and_validated() {
    let server = TestServer::spawn().await;
    let (_, admin) = server.user(Role::Admin);
    let (_, sales) = server.user(Role::Sales);

    let res = server
        .send(
            reqwest::Method::PUT,
            "/config/ui.items_per_page",
            &sales,
            json!({ "value": 50 }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(error_code(res).await, "forbidden");

    let res = server.get("/config", &sales).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = server.get("/config/ui.items_per_page", &sales).await;
    assert_eq!(res.status(), StatusCode::OK);
    let row: Value = res.json().await.unwrap();
    assert_eq!(row["value"], 25);

    let res = server
        .send(
            reqwest::Method::PUT,
            "/config/system.version",
            &admin,
            json!({ "value": "9.9.9" }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_code(res).await, "read_only");

    let res = server
        .send(
            reqwest::Method::PUT,
            "/config/ui.items_per_page",
            &admin,
            json!({ "value": 33 }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_code(res).await, "invalid_value");

    let res = server
        .send(
            reqwest::Method::PUT,
            "/config/ui.items_per_page",
            &admin,
            json!({ "value": 50 }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = server
        .send(
            reqwest::Method::POST,
            "/config/ui.items_per_page/reset",
            &admin,
            json!({}),
        )
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    let row: Value = res.json().await.unwrap();
    assert_eq!(row["value"], 25);

    let res = server.get("/config/no.such.key", &admin).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn lead_conversion_follows_configuration_without_restart() {
    let server = TestServer::spawn().await;
    let (_, admin) = server.user(Role::Admin);
    let (sales_user, sales) = server.user(Role::Sales);

    let lead: Value = server
        .send(
            reqwest::Method::POST,
            "/leads",
            &sales,
            json!({ "name": "Acme", "email": "Buyer@Acme.test", "assigned_to": sales_user.id }),
        )
        .await
        .json()
        .await
        .unwrap();
    let lead_id = lead["id"].as_str().unwrap().to_string();

    let res = server
        .send(
            reqwest::Method::PATCH,
            &format!("/leads/{lead_id}"),
            &sales,
            json!({ "status": "contacted" }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::OK);

    // Default rule: only qualified leads convert.
    let res = server
        .send(reqwest::Method::POST, &format!("/leads/{lead_id}/convert"), &sales, json!({}))
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_code(res).await, "invalid_state_transition");

    let res = server
        .send(
            reqwest::Method::PUT,
            "/config/leads.conversion.allowed_statuses",
            &admin,
            json!({ "value": ["contacted", "qualified"] }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = server
        .send(reqwest::Method::POST, &format!("/leads/{lead_id}/convert"), &sales, json!({}))
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["lead"]["status"], "converted");
    assert_eq!(body["customer"]["converted_from"], lead_id);
    assert_eq!(body["lead"]["customer_id"], body["customer"]["id"]);

    // Converted is terminal.
    let res = server
        .send(reqwest::Method::POST, &format!("/leads/{lead_id}/convert"), &sales, json!({}))
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn other_users_leads_are_off_limits() {
    let server = TestServer::spawn().await;
    let (owner, owner_token) = server.user(Role::Sales);
    let (_, other) = server.user(Role::Sales);
    let (_, admin) = server.user(Role::Admin);

    let lead: Value = server
        .send(
            reqwest::Method::POST,
            "/leads",
            &owner_token,
            json!({ "name": "Globex", "assigned_to": owner.id }),
        )
        .await
        .json()
        .await
        .unwrap();
    let path = format!("/leads/{}", lead["id"].as_str().unwrap());

    assert_eq!(server.get(&path, &other).await.status(), StatusCode::FORBIDDEN);
    assert_eq!(server.get(&path, &admin).await.status(), StatusCode::OK);

    let res = server
        .send(
            reqwest::Method::POST,
            "/leads",
            &other,
            json!({ "name": "Initech", "assigned_to": owner.id }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_cannot_delete_themselves() {
    let server = TestServer::spawn().await;
    let (admin_user, admin) = server.user(Role::Admin);
    let (victim, _) = server.user(Role::Support);
    let (_, sales) = server.user(Role::Sales);

    let res = server
        .send(reqwest::Method::DELETE, &format!("/users/{}", admin_user.id), &admin, json!({}))
        .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert!(server.services.users.get(&admin_user.id).unwrap().is_some());

    let res = server
        .send(reqwest::Method::DELETE, &format!("/users/{}", victim.id), &sales, json!({}))
        .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = server
        .send(reqwest::Method::DELETE, &format!("/users/{}", victim.id), &admin, json!({}))
        .await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    assert!(server.services.users.get(&victim.id).unwrap().is_none());

    let res = server
        .send(reqwest::Method::DELETE, &format!("/users/{}", victim.id), &admin, json!({}))
        .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn user_listing_is_admin_only_but_users_see_themselves() {
    let server = TestServer::spawn().await;
    let (_, admin) = server.user(Role::Admin);
    let (me, token) = server.user(Role::Customer);

    assert_eq!(server.get("/users", &token).await.status(), StatusCode::FORBIDDEN);
    let listed: Value = server.get("/users", &admin).await.json().await.unwrap();
    assert_eq!(listed["items"].as_array().unwrap().len(), 2);

    assert_eq!(server.get(&format!("/users/{}", me.id), &token).await.status(), StatusCode::OK);
    let (someone, _) = server.user(Role::Sales);
    assert_eq!(
        server.get(&format!("/users/{}", someone.id), &token).await.status(),
        StatusCode::FORBIDDEN
    );
}

#[tokio::test]
async fn tasks_cannot_be_assigned_to_others_without_reassign() {
    let server = TestServer::spawn().await;
    let (me, sales) = server.user(Role::Sales);
    let (colleague, _) = server.user(Role::Sales);
    let (_, admin) = server.user(Role::Admin);

    let res = server
        .send(
            reqwest::Method::POST,
            "/tasks",
            &sales,
            json!({ "title": "Call Acme", "assigned_to": colleague.id }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = server
        .send(
            reqwest::Method::POST,
            "/tasks",
            &admin,
            json!({ "title": "Call Acme", "assigned_to": colleague.id }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = server
        .send(
            reqwest::Method::POST,
            "/tasks",
            &sales,
            json!({ "title": "Follow up", "assigned_to": me.id }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn completed_tasks_reject_further_status_changes() {
    let server = TestServer::spawn().await;
    let (me, sales) = server.user(Role::Sales);

    let task: Value = server
        .send(
            reqwest::Method::POST,
            "/tasks",
            &sales,
            json!({ "title": "Send quote", "assigned_to": me.id }),
        )
        .await
        .json()
        .await
        .unwrap();
    let path = format!("/tasks/{}", task["id"].as_str().unwrap());

    let res = server
        .send(reqwest::Method::PATCH, &path, &sales, json!({ "status": "completed" }))
        .await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = server
        .send(reqwest::Method::PATCH, &path, &sales, json!({ "status": "pending" }))
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_code(res).await, "invalid_state_transition");

    // Deleting is admin-only, even for the assignee.
    let res = server.send(reqwest::Method::DELETE, &path, &sales, json!({})).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn ticket_creation_is_limited_to_support_and_admin() {
    let server = TestServer::spawn().await;
    let (_, sales) = server.user(Role::Sales);
    let (agent, support) = server.user(Role::Support);

    let res = server
        .send(reqwest::Method::POST, "/tickets", &sales, json!({ "subject": "Broken login" }))
        .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = server
        .send(
            reqwest::Method::POST,
            "/tickets",
            &support,
            json!({ "subject": "Broken login", "assigned_to": agent.id }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let ticket: Value = res.json().await.unwrap();
    assert_eq!(ticket["priority"], "medium");

    let res = server
        .send(
            reqwest::Method::POST,
            "/tickets",
            &support,
            json!({ "subject": "Outage", "assigned_to": agent.id, "priority": "apocalyptic" }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_ids_are_not_found() {
    let server = TestServer::spawn().await;
    let (_, admin) = server.user(Role::Admin);

    for path in ["/tasks/not-a-uuid", "/leads/00000000-0000-0000-0000-000000000000"] {
        let res = server.get(path, &admin).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND, "{path}");
        assert_eq!(error_code(res).await, "not_found");
    }
}
