//! End-to-end test of the live driver against an in-process STOMP broker.
//!
//! The broker is a bare tokio-tungstenite server that accepts one client,
//! answers CONNECT, waits for the SUBSCRIBE and pushes one notification.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use shelfwire_app::{Driver, Runtime};
use shelfwire_client::{ClientOptions, LiveDriver};
use shelfwire_core::{ConnectionState, StaticIdentity, UserId};
use shelfwire_proto::{Command, Frame, Packet, headers};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{WebSocketStream, accept_async, tungstenite::Message};

type Broker = WebSocketStream<TcpStream>;

async fn next_frame(ws: &mut Broker) -> Option<Frame> {
    while let Some(Ok(message)) = ws.next().await {
        let data = match message {
            Message::Text(text) => text.as_bytes().to_vec(),
            Message::Binary(data) => data.to_vec(),
            Message::Close(_) => return None,
            _ => continue,
        };
        let frame = Packet::decode_all(&data).unwrap().into_iter().find_map(|packet| match packet {
            Packet::Frame(frame) => Some(frame),
            Packet::Heartbeat => None,
        });
        if frame.is_some() {
            return frame;
        }
    }
    None
}

async fn send_frame(ws: &mut Broker, frame: &Frame) {
    let bytes = frame.to_bytes().unwrap();
    ws.send(Message::text(String::from_utf8(bytes.to_vec()).unwrap())).await.unwrap();
}

/// Accept one client, deliver one notification, return the commands the
/// client sent.
async fn run_broker(listener: TcpListener) -> Vec<Command> {
    let (stream, _) = listener.accept().await.unwrap();
    let mut ws = accept_async(stream).await.unwrap();
    let mut received = Vec::new();

    let connect = next_frame(&mut ws).await.unwrap();
    assert_eq!(connect.header(headers::HOST), Some("127.0.0.1"));
    received.push(connect.command);

    let connected = Frame::new(Command::Connected)
        .with_header(headers::VERSION, "1.2")
        .with_header(headers::HEART_BEAT, "0,0");
    send_frame(&mut ws, &connected).await;

    let subscribe = next_frame(&mut ws).await.unwrap();
    received.push(subscribe.command);
    let id = subscribe.header(headers::ID).unwrap().to_string();
    let destination = subscribe.header(headers::DESTINATION).unwrap().to_string();
    assert_eq!(destination, "/user/42/queue/notification");

    let message = Frame::new(Command::Message)
        .with_header(headers::SUBSCRIPTION, id)
        .with_header(headers::DESTINATION, destination)
        .with_header(headers::MESSAGE_ID, "1")
        .with_header(headers::CONTENT_TYPE, "application/json")
        .with_body(r#"{"status":"BORROWED","message":"Bạn đã mượn sách","bookTitle":"Dune"}"#);
    send_frame(&mut ws, &message).await;

    while let Some(frame) = next_frame(&mut ws).await {
        received.push(frame.command);
    }
    received
}

#[tokio::test]
async fn notification_arrives_over_websocket() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let broker = tokio::spawn(run_broker(listener));

    let options = ClientOptions {
        endpoint: format!("ws://127.0.0.1:{port}/ws/websocket"),
        heartbeat: Duration::ZERO,
        ..ClientOptions::default()
    };
    let driver = LiveDriver::with_tick_interval(Duration::from_millis(20));
    let identity = StaticIdentity::new(UserId::new("42"));
    let mut runtime = Runtime::new(driver, options.session_config().unwrap(), identity);
    let states = runtime.subscribe_state();

    runtime.start().await.unwrap();
    tokio::time::timeout(Duration::from_secs(10), async {
        while runtime.app().unread_count() == 0 {
            assert!(runtime.step().await.unwrap());
        }
    })
    .await
    .expect("notification never arrived");

    assert!(runtime.is_connected());
    assert_eq!(*states.borrow(), ConnectionState::Connected);

    let notification = runtime.app().notifications().next().unwrap();
    assert_eq!(notification.book_title(), Some("Dune"));
    assert!(!notification.is_read());

    runtime.disconnect().await.unwrap();
    assert_eq!(runtime.session().state(), ConnectionState::Disconnected);
    assert_eq!(runtime.app().unread_count(), 1);

    let received = tokio::time::timeout(Duration::from_secs(10), broker)
        .await
        .expect("broker did not finish")
        .unwrap();
    assert_eq!(received, vec![
        Command::Connect,
        Command::Subscribe,
        Command::Unsubscribe,
        Command::Disconnect
    ]);
}

/// The client runs on its own tokio runtime, dropped right after `stop`
/// the way process exit would drop it.
#[test]
fn goodbye_reaches_broker_before_exit() {
    let broker_rt = tokio::runtime::Runtime::new().unwrap();
    let listener = broker_rt.block_on(TcpListener::bind("127.0.0.1:0")).unwrap();
    let port = listener.local_addr().unwrap().port();
    let broker = broker_rt.spawn(run_broker(listener));

    let client_rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
    client_rt.block_on(async {
        let options = ClientOptions {
            endpoint: format!("ws://127.0.0.1:{port}/ws/websocket"),
            heartbeat: Duration::ZERO,
            ..ClientOptions::default()
        };
        let driver = LiveDriver::with_tick_interval(Duration::from_millis(20))
            .with_close_grace(Duration::from_secs(5));
        let identity = StaticIdentity::new(UserId::new("42"));
        let mut runtime = Runtime::new(driver, options.session_config().unwrap(), identity);

        runtime.start().await.unwrap();
        tokio::time::timeout(Duration::from_secs(10), async {
            while runtime.app().unread_count() == 0 {
                assert!(runtime.step().await.unwrap());
            }
        })
        .await
        .expect("notification never arrived");

        runtime.disconnect().await.unwrap();
        runtime.driver_mut().stop().await;
        assert_eq!(runtime.driver().closing_transports(), 0);
    });
    drop(client_rt);

    let received = broker_rt
        .block_on(async { tokio::time::timeout(Duration::from_secs(10), broker).await })
        .expect("broker did not finish")
        .unwrap();
    assert_eq!(received, vec![
        Command::Connect,
        Command::Subscribe,
        Command::Unsubscribe,
        Command::Disconnect
    ]);
}

#[tokio::test]
async fn refused_connection_schedules_retry() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let options = ClientOptions {
        endpoint: format!("ws://127.0.0.1:{port}/ws/websocket"),
        reconnect_base: Duration::from_secs(60),
        ..ClientOptions::default()
    };
    let driver = LiveDriver::with_tick_interval(Duration::from_millis(20));
    let identity = StaticIdentity::new(UserId::new("42"));
    let mut runtime = Runtime::new(driver, options.session_config().unwrap(), identity);

    runtime.start().await.unwrap();
    tokio::time::timeout(Duration::from_secs(10), async {
        while runtime.retry_deadline().is_none() {
            runtime.step().await.unwrap();
        }
    })
    .await
    .expect("no retry scheduled");

    assert!(!runtime.is_connected());
    assert_eq!(runtime.status().reconnect_attempts, 1);

    runtime.disconnect().await.unwrap();
    assert!(runtime.retry_deadline().is_none());
}
