use petstore_api::app::{router_with, services::build_in_memory_services, AppServices};
use petstore_core::{CustomerId, StoreId};
use petstore_infra::entity_store::{EntityStore, StoreTx, TxMode};
use petstore_stores::MembershipPolicy;
use reqwest::StatusCode;
use serde_json::{json, Value};

struct TestServer {
    base_url: String,
    services: AppServices,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        Self::spawn_with(MembershipPolicy::default()).await
    }

    async fn spawn_with(policy: MembershipPolicy) -> Self {
        // Same router as prod over in-memory services, bound to an ephemeral port.
        let services = build_in_memory_services(policy);
        let app = router_with(services.clone());
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
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Associate an existing customer with one more store behind the API's back.
    async fn link_customer(&self, store_id: i64, customer_id: i64) {
        let store = self.services.in_memory_store().unwrap();
        let mut tx = store.begin(TxMode::ReadWrite).await.unwrap();
        tx.link_customer(StoreId::new(store_id), CustomerId::new(customer_id))
            .await
            .unwrap();
        tx.commit().await.unwrap();
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn post_json(client: &reqwest::Client, url: String, body: Value) -> (StatusCode, Value) {
    let res = client.post(url).json(&body).send().await.unwrap();
    let status = res.status();
    (status, res.json().await.unwrap())
}

async fn get_json(client: &reqwest::Client, url: String) -> (StatusCode, Value) {
    let res = client.get(url).send().await.unwrap();
    let status = res.status();
    (status, res.json().await.unwrap())
}

fn acme() -> Value {
    json!({
        "name": "Acme Pets",
        "address": "1 Main St",
        "city": "Springfield",
        "state": "IL",
        "zip": "62701",
        "phone": "555-0100",
    })
}

#[tokio::test]
async fn health_is_ok() {
    let srv = TestServer::spawn().await;
    let res = reqwest::get(srv.url("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn employee_cannot_be_moved_between_stores() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let (status, store) = post_json(&client, srv.url("/pet_store"), acme()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(store["id"], 1);
    assert_eq!(store["name"], "Acme Pets");
    assert_eq!(store["employees"], json!([]));

    let (status, jo) = post_json(
        &client,
        srv.url("/pet_store/1/employee"),
        json!({ "firstName": "Jo", "lastName": "Smith", "jobTitle": "Groomer" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(jo["id"], 1);
    assert_eq!(jo["storeId"], 1);
    assert!(jo["phone"].is_null());

    let (status, body) = post_json(
        &client,
        srv.url("/pet_store/2/employee"),
        json!({ "id": 1, "firstName": "Jo" }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
    assert_eq!(body["message"], "Store with id 2 does not exist");

    let (status, beta) = post_json(&client, srv.url("/pet_store"), json!({ "name": "Beta" })).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(beta["id"], 2);

    let (status, body) = post_json(
        &client,
        srv.url("/pet_store/2/employee"),
        json!({ "id": 1, "firstName": "Moved" }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "ownership_violation");

    let (_, acme_view) = get_json(&client, srv.url("/pet_store/1")).await;
    let employees = acme_view["employees"].as_array().unwrap();
    assert_eq!(employees.len(), 1);
    assert_eq!(employees[0]["firstName"], "Jo");

    let (status, updated) = post_json(
        &client,
        srv.url("/pet_store/1/employee"),
        json!({ "id": 1, "firstName": "Joanna" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["firstName"], "Joanna");
    assert!(updated["jobTitle"].is_null());
}

#[tokio::test]
async fn list_has_summary_shape_and_get_has_associations() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    post_json(&client, srv.url("/pet_store"), acme()).await;
    post_json(&client, srv.url("/pet_store"), json!({ "name": "Beta" })).await;
    post_json(&client, srv.url("/pet_store/1/employee"), json!({ "firstName": "Jo" })).await;
    post_json(&client, srv.url("/pet_store/1/customer"), json!({ "firstName": "Sam" })).await;
    post_json(&client, srv.url("/pet_store/1/customer"), json!({ "firstName": "Kim" })).await;

    let (status, list) = get_json(&client, srv.url("/pet_store")).await;
    assert_eq!(status, StatusCode::OK);
    let list = list.as_array().unwrap();
    assert_eq!(list.len(), 2);
    for entry in list {
        assert!(entry.get("employees").is_none());
        assert!(entry.get("customers").is_none());
    }
    assert_eq!(list[0]["city"], "Springfield");

    let (status, view) = get_json(&client, srv.url("/pet_store/1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["employees"].as_array().unwrap().len(), 1);
    assert_eq!(view["customers"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn customer_is_updatable_only_through_its_store() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    post_json(&client, srv.url("/pet_store"), acme()).await;
    post_json(&client, srv.url("/pet_store"), json!({ "name": "Beta" })).await;

    let (status, sam) = post_json(
        &client,
        srv.url("/pet_store/1/customer"),
        json!({ "firstName": "Sam", "email": "sam@example.com" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let sam_id = sam["id"].as_i64().unwrap();

    let (status, body) = post_json(
        &client,
        srv.url("/pet_store/2/customer"),
        json!({ "id": sam_id, "firstName": "Other" }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "ownership_violation");

    let (status, updated) = post_json(
        &client,
        srv.url("/pet_store/1/customer"),
        json!({ "id": sam_id, "firstName": "Samantha" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["firstName"], "Samantha");
    assert!(updated["email"].is_null());

    let (_, beta) = get_json(&client, srv.url("/pet_store/2")).await;
    assert_eq!(beta["customers"], json!([]));
}

#[tokio::test]
async fn update_with_unknown_id_is_not_found() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .put(srv.url("/pet_store/9"))
        .json(&acme())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    post_json(&client, srv.url("/pet_store"), acme()).await;
    let (status, body) = post_json(
        &client,
        srv.url("/pet_store/1/customer"),
        json!({ "id": 5, "firstName": "Ghost" }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Customer with id 5 does not exist");

    let (_, list) = get_json(&client, srv.url("/pet_store")).await;
    assert_eq!(list.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn put_overwrites_every_field() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    post_json(&client, srv.url("/pet_store"), acme()).await;

    let res = client
        .put(srv.url("/pet_store/1"))
        .json(&json!({ "id": 77, "name": "Acme Renamed" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["id"], 1);
    assert_eq!(body["name"], "Acme Renamed");
    assert!(body["address"].is_null());
}

#[tokio::test]
async fn delete_removes_store_and_second_delete_is_not_found() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    post_json(&client, srv.url("/pet_store"), acme()).await;
    post_json(&client, srv.url("/pet_store/1/employee"), json!({ "firstName": "Jo" })).await;

    let res = client.delete(srv.url("/pet_store/1")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let (status, _) = get_json(&client, srv.url("/pet_store/1")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let res = client.delete(srv.url("/pet_store/1")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let (_, store) = post_json(&client, srv.url("/pet_store"), acme()).await;
    assert_eq!(store["id"], 2);
}

#[tokio::test]
async fn malformed_path_id_is_bad_request() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let (status, body) = get_json(&client, srv.url("/pet_store/abc")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_id");
}

#[tokio::test]
async fn failed_commit_is_reported_and_changes_nothing() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    post_json(&client, srv.url("/pet_store"), acme()).await;

    let store = srv.services.in_memory_store().unwrap();
    store.fail_commits(true);
    let (status, body) = post_json(
        &client,
        srv.url("/pet_store/1/employee"),
        json!({ "firstName": "Jo" }),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "persistence_failure");
    store.fail_commits(false);

    let (_, view) = get_json(&client, srv.url("/pet_store/1")).await;
    assert_eq!(view["employees"], json!([]));
}

#[tokio::test]
async fn exclusive_policy_blocks_shared_customer_updates() {
    let srv = TestServer::spawn_with(MembershipPolicy::Exclusive).await;
    let client = reqwest::Client::new();
    post_json(&client, srv.url("/pet_store"), acme()).await;
    post_json(&client, srv.url("/pet_store"), json!({ "name": "Beta" })).await;

    let (_, sam) =
        post_json(&client, srv.url("/pet_store/1/customer"), json!({ "firstName": "Sam" })).await;
    let sam_id = sam["id"].as_i64().unwrap();
    srv.link_customer(2, sam_id).await;

    for store in [1, 2] {
        let (status, body) = post_json(
            &client,
            srv.url(&format!("/pet_store/{store}/customer")),
            json!({ "id": sam_id, "firstName": "Changed" }),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "ownership_violation");
    }

    let (_, view) = get_json(&client, srv.url("/pet_store/1")).await;
    assert_eq!(view["customers"][0]["firstName"], "Sam");
}

#[tokio::test]
async fn member_policy_allows_shared_customer_updates() {
    let srv = TestServer::spawn_with(MembershipPolicy::Member).await;
    let client = reqwest::Client::new();
    post_json(&client, srv.url("/pet_store"), acme()).await;
    post_json(&client, srv.url("/pet_store"), json!({ "name": "Beta" })).await;

    let (_, sam) =
        post_json(&client, srv.url("/pet_store/1/customer"), json!({ "firstName": "Sam" })).await;
    let sam_id = sam["id"].as_i64().unwrap();
    srv.link_customer(2, sam_id).await;

    let (status, updated) = post_json(
        &client,
        srv.url("/pet_store/2/customer"),
        json!({ "id": sam_id, "firstName": "Samantha" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["firstName"], "Samantha");
}

#[tokio::test]
async fn customer_orphaned_by_delete_is_adoptable_by_default() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    post_json(&client, srv.url("/pet_store"), acme()).await;
    post_json(&client, srv.url("/pet_store"), json!({ "name": "Beta" })).await;
    let (_, sam) =
        post_json(&client, srv.url("/pet_store/1/customer"), json!({ "firstName": "Sam" })).await;

    client.delete(srv.url("/pet_store/1")).send().await.unwrap();

    let (status, _) = post_json(
        &client,
        srv.url("/pet_store/2/customer"),
        json!({ "id": sam["id"], "firstName": "Sam" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (_, beta) = get_json(&client, srv.url("/pet_store/2")).await;
    assert_eq!(beta["customers"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn malformed_body_gets_json_error() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let (status, body) = post_json(&client, srv.url("/pet_store"), json!({ "name": 5 })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "invalid_body");
    assert!(body["message"].as_str().unwrap().contains("name"));

    post_json(&client, srv.url("/pet_store"), acme()).await;
    let res = client
        .post(srv.url("/pet_store/1/employee"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_body");
}

#[tokio::test]
async fn request_id_is_echoed_or_minted() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .get(srv.url("/health"))
        .header("x-request-id", "abc-123")
        .send()
        .await
        .unwrap();
    assert_eq!(res.headers()["x-request-id"], "abc-123");

    let res = client.get(srv.url("/pet_store")).send().await.unwrap();
    let minted = res.headers()["x-request-id"].to_str().unwrap();
    assert!(!minted.is_empty());
}
