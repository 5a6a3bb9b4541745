//! End-to-end exercise of the UDP transport: bind two sockets, send a
//! request one way and a response the other, and check what comes out
//! the event channel on each side.
use std::time::Duration;

use sip_core::builder::{RequestBuilder, ResponseBuilder};
use sip_core::types::{Message, Method, StatusCode, Uri};
use sip_transport::{bind_udp, Transport, TransportEvent};

#[tokio::test]
async fn udp_transport_roundtrips_request_and_response() {
    let (client, mut client_events) = bind_udp("127.0.0.1:0".parse().unwrap()).await.unwrap();
    let (server, mut server_events) = bind_udp("127.0.0.1:0".parse().unwrap()).await.unwrap();

    let server_addr = server.local_addr().unwrap();

    let request = RequestBuilder::new(Method::Register, Uri::sip("example.com"))
        .from(Uri::sip("alice@example.com"), "tag1")
        .to(Uri::sip("bob@example.com"))
        .call_id("call1@example.com")
        .cseq(1)
        .build();

    client.send_message(Message::Request(request), server_addr).await.unwrap();

    let event = tokio::time::timeout(Duration::from_secs(5), server_events.recv())
        .await
        .expect("server did not receive anything in time")
        .expect("server event channel closed");

    let (received_request, source) = match event {
        TransportEvent::MessageReceived { message: Message::Request(r), source, .. } => (r, source),
        other => panic!("unexpected event: {:?}", other),
    };

    assert_eq!(received_request.method, Method::Register);
    assert_eq!(received_request.call_id(), Some("call1@example.com"));

    let response = ResponseBuilder::for_request(StatusCode::Ok, &received_request, None).build();
    server.send_message(Message::Response(response), source).await.unwrap();

    let event = tokio::time::timeout(Duration::from_secs(5), client_events.recv())
        .await
        .expect("client did not receive anything in time")
        .expect("client event channel closed");

    match event {
        TransportEvent::MessageReceived { message: Message::Response(r), .. } => {
            assert_eq!(r.status, StatusCode::Ok);
            assert_eq!(r.call_id(), Some("call1@example.com"));
        }
        other => panic!("unexpected event: {:?}", other),
    }
}

#[tokio::test]
async fn udp_transport_reports_closed_after_close() {
    let (transport, mut events) = bind_udp("127.0.0.1:0".parse().unwrap()).await.unwrap();
    assert!(!transport.is_closed());
    transport.close().await.unwrap();
    assert!(transport.is_closed());

    // The receive loop notices `closed` on its next iteration and emits
    // `Closed`, but it may already be parked in `recv_from`; don't
    // require the event, just that `close`/`is_closed` themselves work.
    let _ = tokio::time::timeout(Duration::from_millis(100), events.recv()).await;
}
