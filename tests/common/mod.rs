//! A stand-in backend served by warp on an ephemeral port.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use dev_connect::ApiClient;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use warp::http::StatusCode;
use warp::ws::{Message, WebSocket};
use warp::Filter;

pub const GOOD_TOKEN: &str = "good";
/// How long the `slow` conversation takes to answer.
pub const SLOW_REPLY: Duration = Duration::from_secs(3);

fn reply(status: StatusCode, body: Value) -> warp::reply::WithStatus<warp::reply::Json> {
    warp::reply::with_status(warp::reply::json(&body), status)
}

fn user(id: &str, first: &str, last: &str, gender: &str) -> Value {
    json!({ "_id": id, "firstName": first, "lastName": last, "gender": gender })
}

fn authorized(cookie: Option<&str>) -> bool {
    let expected = format!("token={GOOD_TOKEN}");
    cookie == Some(expected.as_str())
}

async fn chat_socket(ws: WebSocket) {
    let (mut tx, mut rx) = ws.split();
    while let Some(Ok(msg)) = rx.next().await {
        let Ok(text) = msg.to_str() else { continue };
        let Ok(frame) = serde_json::from_str::<Value>(text) else { continue };
        match frame["event"].as_str() {
            Some("joinChat") => {
                // Frames the client is expected to ignore.
                let _ = tx.send(Message::text("not json")).await;
                let _ = tx
                    .send(Message::text(json!({ "event": "typing", "data": {} }).to_string()))
                    .await;
            }
            Some("sendMessage") => {
                let echo = json!({
                    "event": "messageReceived",
                    "data": { "fromUser": frame["data"]["userId"], "text": frame["data"]["text"] }
                });
                if tx.send(Message::text(echo.to_string())).await.is_err() {
                    break;
                }
            }
            _ => {}
        }
    }
}

pub fn spawn_backend() -> SocketAddr {
    let view = warp::path!("api" / "profile" / "view")
        .and(warp::get())
        .and(warp::header::optional::<String>("cookie"))
        .map(|cookie: Option<String>| {
            if authorized(cookie.as_deref()) {
                reply(StatusCode::OK, json!({ "data": user("u2", "Ada", "Lovelace", "female") }))
            } else {
                reply(StatusCode::UNAUTHORIZED, json!({ "message": "Please login" }))
            }
        });

    let profile = warp::path!("api" / "profile" / String)
        .and(warp::get())
        .and(warp::header::optional::<String>("cookie"))
        .map(|id: String, cookie: Option<String>| {
            if !authorized(cookie.as_deref()) {
                return reply(StatusCode::UNAUTHORIZED, json!({ "message": "Please login" }));
            }
            match id.as_str() {
                "u1" => reply(StatusCode::OK, json!({ "data": user("u1", "Linus", "T", "male") })),
                _ => reply(StatusCode::NOT_FOUND, json!({ "message": "User not found" })),
            }
        });

    let slow = warp::path!("api" / "chat" / "slow")
        .and(warp::get())
        .and_then(|| async {
            tokio::time::sleep(SLOW_REPLY).await;
            Ok::<_, warp::Rejection>(reply(StatusCode::OK, json!({ "data": { "messages": [] } })))
        });

    let chat = warp::path!("api" / "chat" / String)
        .and(warp::get())
        .and(warp::header::optional::<String>("cookie"))
        .map(|peer: String, cookie: Option<String>| {
            if !authorized(cookie.as_deref()) {
                return reply(StatusCode::UNAUTHORIZED, json!({ "message": "Please login" }));
            }
            match peer.as_str() {
                "u1" => reply(
                    StatusCode::OK,
                    json!({ "data": { "messages": [
                        { "_id": "m1", "senderId": "u1", "text": "hi", "createdAt": "2025-05-01T10:00:00Z" },
                        { "_id": "m2", "senderId": "u2", "text": "hey", "createdAt": "2025-05-01T09:00:00Z" }
                    ] } }),
                ),
                "fresh" => reply(StatusCode::OK, json!({ "data": null })),
                "broken" => reply(StatusCode::OK, json!({ "data": { "messages": "nope" } })),
                _ => reply(StatusCode::INTERNAL_SERVER_ERROR, json!({ "message": "boom" })),
            }
        });

    let logout = warp::path!("api" / "auth" / "logout")
        .and(warp::post())
        .map(|| reply(StatusCode::OK, json!({ "message": "Logged out" })));

    let ws = warp::path("ws")
        .and(warp::ws())
        .map(|ws: warp::ws::Ws| ws.on_upgrade(chat_socket));

    let routes = view.or(profile).or(slow).or(chat).or(logout).or(ws);
    let (addr, server) = warp::serve(routes).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);
    addr
}

pub fn api_client(addr: SocketAddr, token: Option<&str>, timeout: Duration) -> ApiClient {
    ApiClient::new(api_base(addr), token.map(str::to_string), timeout).expect("api client")
}

pub fn api_base(addr: SocketAddr) -> reqwest::Url {
    reqwest::Url::parse(&format!("http://{addr}/api")).expect("api url")
}

pub fn socket_url(addr: SocketAddr) -> reqwest::Url {
    reqwest::Url::parse(&format!("ws://{addr}/ws")).expect("socket url")
}
