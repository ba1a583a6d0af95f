//! Request/response surface tests over a bound server: auth enforcement,
//! error taxonomy, room list filtering and the non-live send fallback.

mod common;

use chat_service::repository::Repository;
use serde_json::{json, Value};
use uuid::Uuid;

struct Api {
    client: reqwest::Client,
    base: String,
}

impl Api {
    fn new(addr: std::net::SocketAddr) -> Self {
        Self {
            client: reqwest::Client::new(),
            base: format!("http://{addr}/api/v1"),
        }
    }

    async fn post(&self, token: &str, path: &str, body: Value) -> reqwest::Response {
        self.client
            .post(format!("{}{}", self.base, path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .expect("request")
    }

    async fn get(&self, token: &str, path: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{}", self.base, path))
            .bearer_auth(token)
            .send()
            .await
            .expect("request")
    }
}

#[tokio::test]
async fn requests_without_credentials_are_refused() {
    let (state, _repo) = common::test_state();
    let addr = common::spawn_app(state).await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("http://{addr}/api/v1/rooms"))
        .send()
        .await
        .expect("request");
    assert_eq!(response.status(), 401);

    let body: Value = response.json().await.expect("body");
    assert_eq!(body["error"]["code"], "AUTH_ERROR");

    // health stays open for probes
    let health = client
        .get(format!("http://{addr}/health"))
        .send()
        .await
        .expect("request");
    assert_eq!(health.status(), 200);
}

#[tokio::test]
async fn direct_room_create_then_find_flags() {
    let (state, _repo) = common::test_state();
    let addr = common::spawn_app(state).await;
    let api = Api::new(addr);

    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let token_a = common::token_for(a, "alice");
    let token_b = common::token_for(b, "bob");

    let created = api
        .post(&token_a, "/rooms/direct", json!({"participant_ids": [a, b]}))
        .await;
    assert_eq!(created.status(), 201);
    let created: Value = created.json().await.expect("body");
    assert_eq!(created["created"], true);
    let room_id = created["room"]["id"].as_str().expect("room id").to_string();

    // the other side finds the same room instead of creating a duplicate
    let found = api
        .post(&token_b, "/rooms/direct", json!({"participant_ids": [b, a]}))
        .await;
    assert_eq!(found.status(), 200);
    let found: Value = found.json().await.expect("body");
    assert_eq!(found["created"], false);
    assert_eq!(found["room"]["id"].as_str().expect("room id"), room_id);
}

#[tokio::test]
async fn invalid_participant_sets_are_rejected() {
    let (state, _repo) = common::test_state();
    let addr = common::spawn_app(state).await;
    let api = Api::new(addr);

    let a = Uuid::new_v4();
    let token = common::token_for(a, "alice");

    for participants in [
        json!([a]),
        json!([a, a]),
        json!([a, Uuid::new_v4(), Uuid::new_v4()]),
        json!([Uuid::new_v4(), Uuid::new_v4()]),
    ] {
        let response = api
            .post(&token, "/rooms/direct", json!({"participant_ids": participants}))
            .await;
        assert_eq!(response.status(), 400);
        let body: Value = response.json().await.expect("body");
        assert_eq!(body["error"]["code"], "INVALID_PARTICIPANTS");
    }
}

#[tokio::test]
async fn room_list_hides_soft_left_rooms_until_new_activity() {
    let (state, _repo) = common::test_state();
    let addr = common::spawn_app(state).await;
    let api = Api::new(addr);

    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let token_a = common::token_for(a, "alice");
    let token_b = common::token_for(b, "bob");

    let created: Value = api
        .post(&token_a, "/rooms/direct", json!({"participant_ids": [a, b]}))
        .await
        .json()
        .await
        .expect("body");
    let room_id = created["room"]["id"].as_str().expect("id").to_string();

    let leave = api.post(&token_a, &format!("/rooms/{room_id}/leave"), json!({})).await;
    assert_eq!(leave.status(), 204);

    let rooms_a: Value = api.get(&token_a, "/rooms").await.json().await.expect("body");
    assert_eq!(rooms_a["rooms"].as_array().expect("rooms").len(), 0);
    let rooms_b: Value = api.get(&token_b, "/rooms").await.json().await.expect("body");
    assert_eq!(rooms_b["rooms"].as_array().expect("rooms").len(), 1);

    // B's message reveals A; the room is back, with a last-message preview
    let sent = api
        .post(&token_b, "/messages", json!({"room_id": room_id, "content": "you there?"}))
        .await;
    assert_eq!(sent.status(), 201);

    let rooms_a: Value = api.get(&token_a, "/rooms").await.json().await.expect("body");
    let rooms = rooms_a["rooms"].as_array().expect("rooms");
    assert_eq!(rooms.len(), 1);
    assert_eq!(rooms[0]["last_message"]["content"], "you there?");
    assert_eq!(rooms[0]["participants"].as_array().expect("p").len(), 2);
}

#[tokio::test]
async fn non_members_get_specific_errors() {
    let (state, _repo) = common::test_state();
    let addr = common::spawn_app(state).await;
    let api = Api::new(addr);

    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let outsider = Uuid::new_v4();
    let token_a = common::token_for(a, "alice");
    let token_outsider = common::token_for(outsider, "mallory");

    let created: Value = api
        .post(&token_a, "/rooms/direct", json!({"participant_ids": [a, b]}))
        .await
        .json()
        .await
        .expect("body");
    let room_id = created["room"]["id"].as_str().expect("id").to_string();

    let cases = [
        (
            api.get(&token_outsider, &format!("/rooms/{room_id}")).await,
            "NOT_MEMBER",
        ),
        (
            api.get(&token_outsider, &format!("/rooms/{room_id}/messages"))
                .await,
            "NOT_MEMBER",
        ),
        (
            api.post(
                &token_outsider,
                "/messages",
                json!({"room_id": room_id, "content": "hi"}),
            )
            .await,
            "NOT_MEMBER",
        ),
        (
            api.post(&token_outsider, &format!("/rooms/{room_id}/leave"), json!({}))
                .await,
            "NOT_MEMBER",
        ),
    ];
    for (response, code) in cases {
        assert_eq!(response.status(), 403);
        let body: Value = response.json().await.expect("body");
        assert_eq!(body["error"]["code"], code);
    }

    // unknown room is a 404, not a membership error
    let missing = api
        .post(
            &token_a,
            "/messages",
            json!({"room_id": Uuid::new_v4(), "content": "hi"}),
        )
        .await;
    assert_eq!(missing.status(), 404);
    let body: Value = missing.json().await.expect("body");
    assert_eq!(body["error"]["code"], "ROOM_NOT_FOUND");
}

#[tokio::test]
async fn history_is_chronological_and_paginated() {
    let (state, _repo) = common::test_state();
    let addr = common::spawn_app(state).await;
    let api = Api::new(addr);

    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let token_a = common::token_for(a, "alice");

    let created: Value = api
        .post(&token_a, "/rooms/direct", json!({"participant_ids": [a, b]}))
        .await
        .json()
        .await
        .expect("body");
    let room_id = created["room"]["id"].as_str().expect("id").to_string();

    for content in ["one", "two", "three", "four"] {
        let sent = api
            .post(&token_a, "/messages", json!({"room_id": room_id, "content": content}))
            .await;
        assert_eq!(sent.status(), 201);
    }

    let page: Value = api
        .get(&token_a, &format!("/rooms/{room_id}/messages"))
        .await
        .json()
        .await
        .expect("body");
    let contents: Vec<&str> = page["messages"]
        .as_array()
        .expect("messages")
        .iter()
        .map(|m| m["content"].as_str().expect("content"))
        .collect();
    assert_eq!(contents, ["one", "two", "three", "four"]);

    // offset counts from the newest message; the page is still chronological
    let page: Value = api
        .get(&token_a, &format!("/rooms/{room_id}/messages?limit=2&offset=1"))
        .await
        .json()
        .await
        .expect("body");
    let contents: Vec<&str> = page["messages"]
        .as_array()
        .expect("messages")
        .iter()
        .map(|m| m["content"].as_str().expect("content"))
        .collect();
    assert_eq!(contents, ["two", "three"]);
}

#[tokio::test]
async fn group_rooms_and_member_listing() {
    let (state, repo) = common::test_state();
    let addr = common::spawn_app(state).await;
    let api = Api::new(addr);

    let creator = Uuid::new_v4();
    let m1 = Uuid::new_v4();
    let m2 = Uuid::new_v4();
    let token = common::token_for(creator, "alice");

    let created = api
        .post(
            &token,
            "/rooms",
            json!({"name": "team", "member_ids": [m1, m2]}),
        )
        .await;
    assert_eq!(created.status(), 201);
    let created: Value = created.json().await.expect("body");
    let room_id: Uuid = created["id"].as_str().expect("id").parse().expect("uuid");
    assert_eq!(created["name"], "team");

    let members: Value = api
        .get(&token, &format!("/rooms/{room_id}/members"))
        .await
        .json()
        .await
        .expect("body");
    assert_eq!(members["members"].as_array().expect("members").len(), 3);

    // all three inserted atomically as ACTIVE
    let stored = repo.get_members(room_id).await.expect("members");
    assert!(stored.iter().all(|m| m.visible && m.left_at.is_none()));
}

#[tokio::test]
async fn message_lookup_honors_the_frozen_view() {
    let (state, repo) = common::test_state();
    let addr = common::spawn_app(state).await;
    let api = Api::new(addr);

    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let token_a = common::token_for(a, "alice");
    let token_b = common::token_for(b, "bob");

    let created: Value = api
        .post(&token_a, "/rooms/direct", json!({"participant_ids": [a, b]}))
        .await
        .json()
        .await
        .expect("body");
    let room_id = created["room"]["id"].as_str().expect("id").to_string();

    api.post(&token_a, &format!("/rooms/{room_id}/leave"), json!({}))
        .await;

    // keep A hidden while B's message lands
    repo.inject_reveal_failures(3);
    let sent: Value = api
        .post(&token_b, "/messages", json!({"room_id": room_id, "content": "secret"}))
        .await
        .json()
        .await
        .expect("body");
    assert_eq!(sent["revealed"], false);
    let message_id = sent["message"]["id"].as_str().expect("id").to_string();

    // invisible to the hidden viewer, visible to the sender
    let for_a = api.get(&token_a, &format!("/messages/{message_id}")).await;
    assert_eq!(for_a.status(), 404);
    let for_b = api.get(&token_b, &format!("/messages/{message_id}")).await;
    assert_eq!(for_b.status(), 200);
}
