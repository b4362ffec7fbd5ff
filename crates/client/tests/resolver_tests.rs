//! Integration tests for cluster leader discovery and caching.

mod common;

use std::time::Duration;

use common::*;
use safeguard_client::SafeguardClient;
use secrecy::SecretString;

const MEMBERS: &str = "/service/core/v4/Cluster/Members";

fn client_with_leader_cache(server: &MockServer, ttl: Duration) -> SafeguardClient {
    let client = SafeguardClient::builder()
        .appliance_url(server.uri())
        .leader_cache(ttl)
        .build()
        .unwrap();
    client.session_store().set_session_token(
        SecretString::new(TEST_SESSION_TOKEN.to_string().into()),
        Duration::from_secs(3600),
    );
    client
}

async fn mount_leader_put(server: &MockServer) {
    Mock::given(method("PUT"))
        .and(path(format!("{CORE}/Assets/9")))
        .and(header("host", leader_host(server).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_read_origin_is_appliance() {
    let server = MockServer::start().await;
    let client = session_client(&server.uri());
    assert_eq!(
        client.resolve_read_origin().unwrap(),
        format!("http://{}", appliance_host(&server))
    );
}

#[tokio::test]
async fn test_leader_is_cached_between_writes() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(MEMBERS))
        .and(query_param("filter", "IsLeader eq true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(load_fixture("cluster/members.json")))
        .expect(1)
        .mount(&server)
        .await;
    mount_leader_put(&server).await;

    let client = session_client(&server.uri());
    let body = serde_json::json!({});
    client.put("Assets/9", &body).await.unwrap();
    client.put("Assets/9", &body).await.unwrap();

    assert_eq!(
        client.resolve_write_origin().await.unwrap(),
        format!("http://{}", leader_host(&server))
    );
}

#[tokio::test]
async fn test_zero_cache_duration_resolves_every_write() {
    let server = MockServer::start().await;
    mount_cluster_members(&server).await;
    mount_leader_put(&server).await;

    let client = client_with_leader_cache(&server, Duration::ZERO);
    let body = serde_json::json!({});
    client.put("Assets/9", &body).await.unwrap();
    client.put("Assets/9", &body).await.unwrap();
    client.put("Assets/9", &body).await.unwrap();

    assert_eq!(request_count(&server, MEMBERS).await, 3);
}

#[tokio::test]
async fn test_failed_lookup_keeps_previous_leader() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(MEMBERS))
        .respond_with(ResponseTemplate::new(200).set_body_json(load_fixture("cluster/members.json")))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(MEMBERS))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_leader_put(&server).await;

    let client = client_with_leader_cache(&server, Duration::ZERO);
    let body = serde_json::json!({});
    client.put("Assets/9", &body).await.unwrap();
    client.put("Assets/9", &body).await.unwrap();

    assert_eq!(request_count(&server, MEMBERS).await, 2);
    assert_eq!(
        client.resolve_write_origin().await.unwrap(),
        format!("http://{}", leader_host(&server))
    );
}

#[tokio::test]
async fn test_failed_first_lookup_falls_back_to_appliance() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(MEMBERS))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(format!("{CORE}/Assets/9")))
        .and(header("host", appliance_host(&server).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(1)
        .mount(&server)
        .await;

    let client = session_client(&server.uri());
    client
        .put("Assets/9", &serde_json::json!({}))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_member_without_leader_flag_uses_first() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(MEMBERS))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            { "Id": 3, "Name": "localhost.cluster.internal", "IsLeader": false }
        ])))
        .mount(&server)
        .await;

    let client = session_client(&server.uri());
    assert_eq!(
        client.resolve_write_origin().await.unwrap(),
        format!("http://{}", leader_host(&server))
    );
}
