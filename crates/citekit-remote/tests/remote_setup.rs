//! Integration tests for the exceptional setups: contended ports, absent
//! primaries, repeated shutdowns, and concurrent secondaries.

use async_trait::async_trait;
use citekit_remote::{
    start_as_primary, try_delegate_to_running_instance, MessageHandler, RemoteClient, RemoteError,
    RemoteServer,
};
use std::net::Ipv4Addr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

#[derive(Default)]
struct RecordingHandler {
    received: Mutex<Vec<Vec<String>>>,
}

#[async_trait]
impl MessageHandler for RecordingHandler {
    async fn is_alive(&self) -> bool {
        true
    }

    async fn receive_arguments(&self, args: Vec<String>) {
        self.received.lock().await.push(args);
    }
}

/// Reserve an ephemeral port and release it, so nothing is listening there.
async fn free_port() -> u16 {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

#[tokio::test]
async fn test_ping_without_listener_means_no_instance() {
    let port = free_port().await;

    let err = RemoteClient::new(port).ping().await.unwrap_err();
    assert!(err.means_no_instance(), "got {err:?}");
}

#[tokio::test]
async fn test_delegation_without_primary_reports_false() {
    let port = free_port().await;

    let delivered =
        try_delegate_to_running_instance(port, &["unclaimed.bib".to_string()]).await;
    assert!(!delivered);
}

#[tokio::test]
async fn test_port_contention_reports_address_in_use() {
    let handler = Arc::new(RecordingHandler::default());
    let mut first = start_as_primary(handler.clone(), 0).await.unwrap();
    let port = first.port();

    let err = RemoteServer::start(Arc::new(RecordingHandler::default()), port)
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteError::AddressInUse { port: p } if p == port));

    // The contention must not disturb the first server.
    RemoteClient::new(port).ping().await.unwrap();

    first.stop().await;
}

#[tokio::test]
async fn test_stop_twice_is_a_no_op() {
    let handler = Arc::new(RecordingHandler::default());
    let mut handle = start_as_primary(handler, 0).await.unwrap();
    let port = handle.port();

    handle.stop().await;
    handle.stop().await;

    // The port is released and a later primary can claim it.
    let mut second = start_as_primary(Arc::new(RecordingHandler::default()), port)
        .await
        .unwrap();
    second.stop().await;
}

#[tokio::test]
async fn test_stopped_server_is_unreachable() {
    let handler = Arc::new(RecordingHandler::default());
    let mut handle = start_as_primary(handler, 0).await.unwrap();
    let port = handle.port();

    RemoteClient::new(port).ping().await.unwrap();
    handle.stop().await;

    let err = RemoteClient::new(port).ping().await.unwrap_err();
    assert!(err.means_no_instance(), "got {err:?}");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_concurrent_clients_deliver_exactly_once_each() {
    let handler = Arc::new(RecordingHandler::default());
    let mut handle = start_as_primary(handler.clone(), 0).await.unwrap();
    let port = handle.port();

    let mut tasks = Vec::new();
    for i in 0..8 {
        tasks.push(tokio::spawn(async move {
            let args = vec![format!("client-{i}"), "payload".to_string()];
            RemoteClient::new(port).send_arguments(&args).await.unwrap();
            args
        }));
    }

    let mut expected = Vec::new();
    for task in tasks {
        expected.push(task.await.unwrap());
    }

    // Every list arrives exactly once and intact; relative order across
    // connections is not guaranteed.
    let mut received = handler.received.lock().await.clone();
    received.sort();
    expected.sort();
    assert_eq!(received, expected);

    handle.stop().await;
}
