use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::{SinkExt, Stream, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_util::sync::CancellationToken;

use nudge_api::state::{AppState, AppStateInner};
use nudge_gateway::registry::SubscriberRegistry;
use nudge_gateway::scanner::Scanner;
use nudge_store::ReminderStore;

type ClientSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct TestServer {
    addr: SocketAddr,
    state: AppState,
    shutdown: CancellationToken,
}

impl TestServer {
    async fn spawn() -> Self {
        let shutdown = CancellationToken::new();
        let store = Arc::new(ReminderStore::new());
        let registry = SubscriberRegistry::new(16);

        let scanner = Scanner::new(store.clone(), registry.clone())
            .with_interval(Duration::from_millis(100));
        tokio::spawn(scanner.run(shutdown.clone()));

        let state = Arc::new(AppStateInner {
            store,
            registry,
            shutdown: shutdown.clone(),
            write_timeout: Duration::from_millis(500),
        });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = nudge_api::router(state.clone());
        let token = shutdown.clone();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await
                .unwrap();
        });

        Self {
            addr,
            state,
            shutdown,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    async fn connect(&self) -> ClientSocket {
        let (ws, _) = connect_async(format!("ws://{}/ws", self.addr)).await.unwrap();
        ws
    }

    async fn wait_for_subscribers(&self, expected: usize) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while self.state.registry.len().await != expected {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("subscriber count never settled");
    }

    async fn submit(&self, title: &str, trigger_time: chrono::DateTime<Utc>) -> u64 {
        let body = json!({
            "title": title,
            "description": format!("{title} details"),
            "creation_date": Utc::now().to_rfc3339(),
            "reminder_datetime": trigger_time.to_rfc3339(),
        });
        let response: Value = reqwest::Client::new()
            .post(self.url("/add_reminder/"))
            .json(&body)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(response["message"], "Reminder added successfully");
        response["id"].as_u64().unwrap()
    }

    async fn pending(&self) -> Value {
        reqwest::get(self.url("/get_reminders/"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }
}

async fn next_text<S>(ws: &mut S) -> String
where
    S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    tokio::time::timeout(Duration::from_secs(3), async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => return text.as_str().to_owned(),
                Some(Ok(_)) => continue,
                other => panic!("socket ended before a notification: {other:?}"),
            }
        }
    })
    .await
    .expect("no notification received")
}

#[tokio::test]
async fn due_reminder_reaches_every_connected_client() {
    let server = TestServer::spawn().await;
    let mut first = server.connect().await;
    let mut second = server.connect().await;
    server.wait_for_subscribers(2).await;

    let id = server
        .submit("A", Utc::now() - chrono::Duration::seconds(1))
        .await;
    assert_eq!(id, 1);

    let expected = "Reminder Triggered! \n Title: A \n Description: A details";
    assert_eq!(next_text(&mut first).await, expected);
    assert_eq!(next_text(&mut second).await, expected);
    assert_eq!(server.pending().await, json!({}));

    server.shutdown.cancel();
}

#[tokio::test]
async fn same_trigger_time_arrives_in_id_order() {
    let server = TestServer::spawn().await;
    let mut ws = server.connect().await;
    server.wait_for_subscribers(1).await;

    let t = Utc::now() + chrono::Duration::milliseconds(300);
    let c = server.submit("C", t).await;
    let d = server.submit("D", t).await;
    assert!(c < d);

    assert!(next_text(&mut ws).await.contains("Title: C \n"));
    assert!(next_text(&mut ws).await.contains("Title: D \n"));

    server.shutdown.cancel();
}

#[tokio::test]
async fn future_reminder_is_listed_until_it_fires() {
    let server = TestServer::spawn().await;

    let id = server
        .submit("later", Utc::now() + chrono::Duration::hours(1))
        .await;

    let pending = server.pending().await;
    assert_eq!(pending[id.to_string()]["title"], "later");
    assert_eq!(pending.as_object().unwrap().len(), 1);

    server.shutdown.cancel();
}

#[tokio::test]
async fn detached_client_is_unregistered_before_firing() {
    let server = TestServer::spawn().await;
    let mut leaving = server.connect().await;
    let mut staying = server.connect().await;
    server.wait_for_subscribers(2).await;

    server
        .submit("B", Utc::now() + chrono::Duration::milliseconds(500))
        .await;
    let _ = leaving.send(Message::Close(None)).await;
    drop(leaving);
    server.wait_for_subscribers(1).await;

    assert!(next_text(&mut staying).await.contains("Title: B \n"));
    // The broadcast reached exactly the one remaining subscriber.
    assert_eq!(server.state.registry.len().await, 1);
    assert_eq!(server.pending().await, json!({}));

    server.shutdown.cancel();
}

#[tokio::test]
async fn shutdown_closes_open_sockets() {
    let server = TestServer::spawn().await;
    let mut ws = server.connect().await;
    server.wait_for_subscribers(1).await;

    server.shutdown.cancel();

    let closed = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return,
                Some(Ok(_)) => continue,
            }
        }
    })
    .await;
    assert!(closed.is_ok(), "socket stayed open after shutdown");
}
