use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use models::user::NewUser;
use server::{build_router, ServerState};
use service::account::repository::memory::InMemoryAccountRepository;
use service::auth::repository::mock::MockUserRepository;
use service::auth::repository::UserRepository;
use service::auth::{AuthService, AuthSettings, AuthUser};

struct TestApp {
    app: Router,
    users: Arc<MockUserRepository>,
    auth: Arc<AuthService>,
}

struct Caller {
    user: AuthUser,
    token: String,
}

fn app() -> TestApp {
    let users = Arc::new(MockUserRepository::new());
    let state = ServerState::new(
        Arc::new(InMemoryAccountRepository::new()),
        users.clone(),
        AuthSettings { jwt_secret: "test-secret".into(), token_ttl_hours: 1 },
    );
    let auth = state.auth.clone();
    TestApp { app: build_router(state), users, auth }
}

impl TestApp {
    async fn caller(&self, username: &str, staff: bool) -> anyhow::Result<Caller> {
        let user = self
            .users
            .create_user(NewUser {
                username: username.into(),
                email: format!("{username}@example.com"),
                password_hash: "!".into(),
                is_staff: staff,
                is_superuser: false,
            })
            .await?;
        let token = self.auth.issue_token(&user)?;
        Ok(Caller { user, token })
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        caller: Option<&Caller>,
        body: Option<Value>,
    ) -> anyhow::Result<(StatusCode, Value)> {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(c) = caller {
            req = req.header(header::AUTHORIZATION, format!("Bearer {}", c.token));
        }
        let req = match body {
            Some(b) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&b)?))?,
            None => req.body(Body::empty())?,
        };
        let resp = self.app.clone().oneshot(req).await?;
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await?;
        let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes)? };
        Ok((status, json))
    }

    async fn create(&self, caller: &Caller, body: Value) -> anyhow::Result<Value> {
        let (status, json) = self.send(Method::POST, "/accounts/", Some(caller), Some(body)).await?;
        assert_eq!(status, StatusCode::CREATED, "create failed: {json}");
        Ok(json)
    }
}

fn id_of(v: &Value) -> String {
    v["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn anonymous_requests_are_refused_everywhere() -> anyhow::Result<()> {
    let t = app();
    let owner = t.caller("owner", false).await?;
    let acc = t.create(&owner, json!({"name": "Hidden"})).await?;
    let item = format!("/accounts/{}/", id_of(&acc));

    let cases = [
        (Method::GET, "/accounts/".to_string(), None),
        (Method::POST, "/accounts/".to_string(), Some(json!({"name": "X"}))),
        (Method::GET, item.clone(), None),
        (Method::PUT, item.clone(), Some(json!({"name": "X"}))),
        (Method::PATCH, item.clone(), Some(json!({"name": "X"}))),
        (Method::DELETE, item.clone(), None),
        (Method::GET, "/me/".to_string(), None),
    ];
    for (method, uri, body) in cases {
        let (status, json) = t.send(method.clone(), &uri, None, body).await?;
        assert_eq!(status, StatusCode::FORBIDDEN, "{method} {uri}");
        assert_eq!(json["detail"], "Authentication credentials were not provided.");
    }
    Ok(())
}

#[tokio::test]
async fn garbage_token_is_treated_as_anonymous() -> anyhow::Result<()> {
    let t = app();
    let mut ghost = t.caller("ghost", false).await?;
    ghost.token = "not-a-jwt".into();
    let (status, _) = t.send(Method::GET, "/accounts/", Some(&ghost), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn create_sets_owner_from_requester() -> anyhow::Result<()> {
    let t = app();
    let u = t.caller("alice", false).await?;
    let acc = t
        .create(&u, json!({"name": "Acme Corp", "industry": "Technology", "annual_revenue": "50000"}))
        .await?;
    let uid = u.user.id.to_string();
    assert_eq!(acc["name"], "Acme Corp");
    assert_eq!(acc["owner_user"], uid.as_str());
    assert_eq!(acc["created_by"], uid.as_str());
    assert_eq!(acc["updated_by"], Value::Null);
    assert_eq!(acc["status"], "prospect");
    assert_eq!(acc["type"], "customer");
    assert_eq!(acc["annual_revenue"], "50000.00");
    assert_eq!(acc["account_number"], Value::Null);
    assert_eq!(acc["is_invalid"], false);
    Ok(())
}

#[tokio::test]
async fn create_rejects_supplied_owner() -> anyhow::Result<()> {
    let t = app();
    let u = t.caller("alice", false).await?;
    let body = json!({"name": "Acme", "owner_user": u.user.id.to_string()});
    let (status, _) = t.send(Method::POST, "/accounts/", Some(&u), Some(body)).await?;
    assert_eq!(status, StatusCode::CONFLICT);
    Ok(())
}

#[tokio::test]
async fn create_validates_fields() -> anyhow::Result<()> {
    let t = app();
    let u = t.caller("alice", false).await?;

    let (status, json) = t.send(Method::POST, "/accounts/", Some(&u), Some(json!({}))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["name"][0], "This field is required.");

    let body = json!({"name": "Bad", "status": "nope", "website": "not a url"});
    let (status, json) = t.send(Method::POST, "/accounts/", Some(&u), Some(body)).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["status"][0], "\"nope\" is not a valid choice.");
    assert_eq!(json["website"][0], "Enter a valid URL.");

    let req = Request::builder()
        .method(Method::POST)
        .uri("/accounts/")
        .header(header::AUTHORIZATION, format!("Bearer {}", u.token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{broken"))?;
    let resp = t.app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn annual_revenue_must_not_be_negative() -> anyhow::Result<()> {
    let t = app();
    let u = t.caller("alice", false).await?;
    let admin = t.caller("admin", true).await?;

    let (status, json) = t
        .send(Method::POST, "/accounts/", Some(&u), Some(json!({"name": "Neg", "annual_revenue": -1})))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["annual_revenue"][0], "Annual revenue must be a positive number.");

    let zero = t.create(&u, json!({"name": "Zero", "annual_revenue": 0})).await?;
    assert_eq!(zero["annual_revenue"], "0.00");
    let some = t.create(&u, json!({"name": "Some", "annual_revenue": "1234.5"})).await?;
    assert_eq!(some["annual_revenue"], "1234.50");

    let uri = format!("/accounts/{}/", id_of(&zero));
    let (status, json) = t
        .send(Method::PATCH, &uri, Some(&admin), Some(json!({"annual_revenue": "-0.01"})))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json.get("annual_revenue").is_some());
    Ok(())
}

#[tokio::test]
async fn account_numbers_are_unique_when_present() -> anyhow::Result<()> {
    let t = app();
    let u = t.caller("alice", false).await?;
    let admin = t.caller("admin", true).await?;

    let first = t.create(&u, json!({"name": "One", "account_number": "ACC-001"})).await?;
    let (status, json) = t
        .send(Method::POST, "/accounts/", Some(&u), Some(json!({"name": "Two", "account_number": "ACC-001"})))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["account_number"][0].as_str().unwrap().contains("already exists"));

    // missing numbers never clash
    t.create(&u, json!({"name": "Three"})).await?;
    t.create(&u, json!({"name": "Four", "account_number": ""})).await?;

    // re-saving a record with its own number is fine
    let uri = format!("/accounts/{}/", id_of(&first));
    let (status, _) = t
        .send(Method::PUT, &uri, Some(&admin), Some(json!({"name": "One", "account_number": "ACC-001"})))
        .await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn retrieve_and_not_found() -> anyhow::Result<()> {
    let t = app();
    let owner = t.caller("owner", false).await?;
    let other = t.caller("other", false).await?;
    let acc = t.create(&owner, json!({"name": "Acme"})).await?;

    let (status, json) = t.send(Method::GET, &format!("/accounts/{}", id_of(&acc)), Some(&other), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["name"], "Acme");

    let missing = format!("/accounts/{}/", uuid::Uuid::new_v4());
    let (status, json) = t.send(Method::GET, &missing, Some(&other), None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["detail"], "Not found.");

    let (status, _) = t.send(Method::GET, "/accounts/not-a-uuid/", Some(&other), None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn only_staff_may_update_or_delete() -> anyhow::Result<()> {
    let t = app();
    let owner = t.caller("owner", false).await?;
    let other = t.caller("other", false).await?;
    let admin = t.caller("admin", true).await?;
    let acc = t.create(&owner, json!({"name": "Acme"})).await?;
    let uri = format!("/accounts/{}/", id_of(&acc));

    for caller in [&owner, &other] {
        let (status, json) = t.send(Method::PATCH, &uri, Some(caller), Some(json!({"name": "X"}))).await?;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(json["detail"], "You do not have permission to perform this action.");
        let (status, _) = t.send(Method::DELETE, &uri, Some(caller), None).await?;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    let (status, json) = t.send(Method::PATCH, &uri, Some(&admin), Some(json!({"name": "Acme Updated"}))).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["name"], "Acme Updated");
    assert_eq!(json["updated_by"], admin.user.id.to_string().as_str());
    Ok(())
}

#[tokio::test]
async fn update_keeps_immutable_fields() -> anyhow::Result<()> {
    let t = app();
    let owner = t.caller("owner", false).await?;
    let admin = t.caller("admin", true).await?;
    let acc = t.create(&owner, json!({"name": "Acme", "industry": "Retail"})).await?;
    let uri = format!("/accounts/{}/", id_of(&acc));

    let body = json!({
        "id": uuid::Uuid::new_v4().to_string(),
        "name": "Acme 2",
        "created_at": "2000-01-01T00:00:00Z",
        "created_by": admin.user.id.to_string(),
        "owner_user": admin.user.id.to_string(),
    });
    let (status, json) = t.send(Method::PUT, &uri, Some(&admin), Some(body)).await?;
    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["id"], acc["id"]);
    assert_eq!(json["created_at"], acc["created_at"]);
    assert_eq!(json["created_by"], acc["created_by"]);
    assert_eq!(json["owner_user"], acc["owner_user"]);
    assert_eq!(json["name"], "Acme 2");

    // PUT requires name, PATCH does not
    let (status, json) = t.send(Method::PUT, &uri, Some(&admin), Some(json!({"industry": "X"}))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["name"][0], "This field is required.");
    let (status, _) = t.send(Method::PATCH, &uri, Some(&admin), Some(json!({"industry": "X"}))).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn delete_is_soft_and_idempotent() -> anyhow::Result<()> {
    let t = app();
    let owner = t.caller("owner", false).await?;
    let admin = t.caller("admin", true).await?;
    let acc = t.create(&owner, json!({"name": "Doomed"})).await?;
    let uri = format!("/accounts/{}/", id_of(&acc));

    let (status, body) = t.send(Method::DELETE, &uri, Some(&admin), None).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, json) = t.send(Method::GET, &uri, Some(&owner), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["is_invalid"], true);

    let (status, _) = t.send(Method::DELETE, &uri, Some(&admin), None).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);
    Ok(())
}

#[tokio::test]
async fn list_filters_search_and_ordering() -> anyhow::Result<()> {
    let t = app();
    let alice = t.caller("alice", false).await?;
    let bob = t.caller("bob", false).await?;
    t.create(&alice, json!({"name": "Alpha Tech", "status": "active", "industry": "Software"})).await?;
    t.create(&alice, json!({"name": "Beta Foods", "type": "vendor", "company_size": "11-50"})).await?;
    t.create(&bob, json!({"name": "Gamma", "status": "active", "account_number": "G-1", "annual_revenue": 10})).await?;

    let (_, json) = t.send(Method::GET, "/accounts/?status=active&ordering=name", Some(&alice), None).await?;
    assert_eq!(json["count"], 2);
    assert_eq!(json["results"][0]["name"], "Alpha Tech");
    assert_eq!(json["results"][1]["name"], "Gamma");

    let (_, json) = t.send(Method::GET, "/accounts/?type=vendor&company_size=11-50", Some(&alice), None).await?;
    assert_eq!(json["count"], 1);
    assert_eq!(json["results"][0]["name"], "Beta Foods");

    let uri = format!("/accounts/?owner_user={}", bob.user.id);
    let (_, json) = t.send(Method::GET, &uri, Some(&alice), None).await?;
    assert_eq!(json["count"], 1);

    let (_, json) = t.send(Method::GET, "/accounts/?search=SOFT", Some(&alice), None).await?;
    assert_eq!(json["count"], 1);
    let (_, json) = t.send(Method::GET, "/accounts/?search=g-1", Some(&alice), None).await?;
    assert_eq!(json["results"][0]["name"], "Gamma");

    let (_, json) = t.send(Method::GET, "/accounts/?ordering=-name", Some(&alice), None).await?;
    assert_eq!(json["results"][0]["name"], "Gamma");

    // empty filter values are ignored
    let (_, json) = t.send(Method::GET, "/accounts/?status=&type=", Some(&alice), None).await?;
    assert_eq!(json["count"], 3);

    let (status, json) = t.send(Method::GET, "/accounts/?status=bogus", Some(&alice), None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["status"][0], "Select a valid choice. bogus is not one of the available choices.");

    let uri = format!("/accounts/?owner_user={}", uuid::Uuid::new_v4());
    let (status, json) = t.send(Method::GET, &uri, Some(&alice), None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json.get("owner_user").is_some());
    Ok(())
}

#[tokio::test]
async fn list_paginates_with_links() -> anyhow::Result<()> {
    let t = app();
    let u = t.caller("alice", false).await?;
    for i in 0..5 {
        t.create(&u, json!({"name": format!("Acct {i}")})).await?;
    }

    let (_, json) = t.send(Method::GET, "/accounts/?page_size=2&ordering=name", Some(&u), None).await?;
    assert_eq!(json["count"], 5);
    assert_eq!(json["results"].as_array().unwrap().len(), 2);
    assert_eq!(json["previous"], Value::Null);
    assert_eq!(json["next"], "/accounts/?page_size=2&ordering=name&page=2");

    let (_, json) = t.send(Method::GET, "/accounts/?page_size=2&ordering=name&page=2", Some(&u), None).await?;
    assert_eq!(json["results"][0]["name"], "Acct 2");
    assert_eq!(json["previous"], "/accounts/?page_size=2&ordering=name");
    assert_eq!(json["next"], "/accounts/?page_size=2&ordering=name&page=3");

    let (_, json) = t.send(Method::GET, "/accounts/?page_size=2&page=last", Some(&u), None).await?;
    assert_eq!(json["results"].as_array().unwrap().len(), 1);
    assert_eq!(json["next"], Value::Null);

    let (status, json) = t.send(Method::GET, "/accounts/?page=9", Some(&u), None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["detail"], "Invalid page.");

    let (_, json) = t.send(Method::GET, "/accounts/?page_size=1000", Some(&u), None).await?;
    assert_eq!(json["results"].as_array().unwrap().len(), 5);
    Ok(())
}

#[tokio::test]
async fn page_size_is_capped_at_one_hundred() -> anyhow::Result<()> {
    let t = app();
    let u = t.caller("alice", false).await?;
    for i in 0..101 {
        t.create(&u, json!({"name": format!("Bulk {i:03}")})).await?;
    }
    let (_, json) = t.send(Method::GET, "/accounts/?page_size=500", Some(&u), None).await?;
    assert_eq!(json["count"], 101);
    assert_eq!(json["results"].as_array().unwrap().len(), 100);
    assert!(json["next"].as_str().unwrap().ends_with("page=2"));
    Ok(())
}

#[tokio::test]
async fn me_reports_the_caller() -> anyhow::Result<()> {
    let t = app();
    let admin = t.caller("admin", true).await?;
    for uri in ["/me", "/me/"] {
        let (status, json) = t.send(Method::GET, uri, Some(&admin), None).await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["id"], admin.user.id.to_string().as_str());
        assert_eq!(json["username"], "admin");
        assert_eq!(json["is_staff"], true);
        assert_eq!(json["is_authenticated"], true);
    }
    Ok(())
}

#[tokio::test]
async fn login_sets_cookie_usable_for_requests() -> anyhow::Result<()> {
    let t = app();
    t.auth.ensure_staff_user("root", "Sup3rSecret", "root@example.com").await?;

    let (status, _) = t
        .send(Method::POST, "/auth/login", None, Some(json!({"username": "root", "password": "wrong"})))
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = Request::builder()
        .method(Method::POST)
        .uri("/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"username":"root","password":"Sup3rSecret"}"#))?;
    let resp = t.app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let cookie = resp
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or_default().to_string())
        .unwrap_or_default();
    assert!(cookie.starts_with("auth_token="));

    let req = Request::builder().uri("/me/").header(header::COOKIE, cookie).body(Body::empty())?;
    let resp = t.app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn ops_endpoints_are_public() -> anyhow::Result<()> {
    let t = app();
    let (status, json) = t.send(Method::GET, "/health", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");

    let (status, json) = t.send(Method::GET, "/api-docs/openapi.json", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert!(json["paths"].get("/accounts/").is_some());

    let req = Request::builder().uri("/metrics").body(Body::empty())?;
    let resp = t.app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let text = String::from_utf8(to_bytes(resp.into_body(), usize::MAX).await?.to_vec())?;
    assert!(text.contains("crm_http_requests_total"));
    Ok(())
}

#[tokio::test]
async fn null_for_non_nullable_fields_leaves_record_untouched() -> anyhow::Result<()> {
    let t = app();
    let owner = t.caller("owner", false).await?;
    let admin = t.caller("admin", true).await?;
    let acc = t.create(&owner, json!({"name": "Acme", "status": "active", "type": "vendor"})).await?;
    let uri = format!("/accounts/{}/", id_of(&acc));

    let (status, json) = t
        .send(Method::PATCH, &uri, Some(&admin), Some(json!({"status": null, "type": null})))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["status"][0], "This field may not be null.");
    assert_eq!(json["type"][0], "This field may not be null.");

    let (_, json) = t.send(Method::GET, &uri, Some(&owner), None).await?;
    assert_eq!(json["status"], "active");
    assert_eq!(json["type"], "vendor");

    let (status, _) = t.send(Method::DELETE, &uri, Some(&admin), None).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, json) = t
        .send(Method::PATCH, &uri, Some(&admin), Some(json!({"is_invalid": null})))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["is_invalid"][0], "This field may not be null.");
    let (_, json) = t.send(Method::GET, &uri, Some(&owner), None).await?;
    assert_eq!(json["is_invalid"], true);
    Ok(())
}

#[tokio::test]
async fn owner_in_update_payload_is_ignored_even_when_malformed() -> anyhow::Result<()> {
    let t = app();
    let owner = t.caller("owner", false).await?;
    let admin = t.caller("admin", true).await?;
    let acc = t.create(&owner, json!({"name": "Acme"})).await?;
    let uri = format!("/accounts/{}/", id_of(&acc));

    let (status, json) = t
        .send(Method::PATCH, &uri, Some(&admin), Some(json!({"owner_user": "garbage", "industry": "Retail"})))
        .await?;
    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["owner_user"], acc["owner_user"]);
    assert_eq!(json["industry"], "Retail");
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creates_with_same_account_number_admit_one() -> anyhow::Result<()> {
    const N: usize = 16;
    let t = Arc::new(app());
    let caller = Arc::new(t.caller("alice", false).await?);

    let mut tasks = Vec::with_capacity(N);
    for i in 0..N {
        let t = t.clone();
        let caller = caller.clone();
        tasks.push(tokio::spawn(async move {
            let body = json!({"name": format!("Racer {i}"), "account_number": "RACE"});
            t.send(Method::POST, "/accounts/", Some(&caller), Some(body)).await
        }));
    }

    let mut created = 0;
    let mut rejected = 0;
    for task in tasks {
        let (status, json) = task.await??;
        match status {
            StatusCode::CREATED => created += 1,
            StatusCode::BAD_REQUEST => {
                assert!(json["account_number"][0].as_str().unwrap().contains("already exists"), "{json}");
                rejected += 1;
            }
            other => panic!("unexpected status {other}: {json}"),
        }
    }
    assert_eq!(created, 1);
    assert_eq!(rejected, N - 1);

    let (_, json) = t.send(Method::GET, "/accounts/?search=RACE", Some(&caller), None).await?;
    assert_eq!(json["count"], 1);
    Ok(())
}
