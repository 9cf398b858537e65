// Integration tests for the RTMP server over loopback TCP

mod common;

use common::*;
use rtmp::{ControlMessage, RtmpCommand, ServerConfig, UserControlEvent, MSG_TYPE_USER_CONTROL};
use std::time::Duration;

#[tokio::test]
async fn test_connect_announces_session_parameters() {
    let server = start_server(test_config()).await;
    let mut client = TestClient::connect(server.addr).await.unwrap();

    let packets = client.rtmp_connect("live").await;
    assert_eq!(packets.len(), 4);
    let controls: Vec<_> = packets[..3]
        .iter()
        .map(|p| ControlMessage::decode(p.message_type(), &p.payload).unwrap())
        .collect();
    assert_eq!(
        controls,
        vec![
            ControlMessage::WindowAckSize(2500000),
            ControlMessage::SetPeerBandwidth { size: 2500000, limit_type: 2 },
            ControlMessage::SetChunkSize(1024),
        ]
    );

    let result = RtmpCommand::decode(&packets[3].payload).unwrap();
    assert_eq!(result.transaction_id, 1.0);
    assert_eq!(status_code(&result), "NetConnection.Connect.Success");
    assert_eq!(
        result.command_object.get_property("capabilities").and_then(|v| v.as_number()),
        Some(31.0)
    );
}

#[tokio::test]
async fn test_publish_and_play_end_to_end() {
    let server = start_server(test_config()).await;

    let mut publisher = TestClient::connect(server.addr).await.unwrap();
    assert_eq!(publisher.start_publish("cam1").await, "NetStream.Publish.Start");

    let mut viewer = TestClient::connect(server.addr).await.unwrap();
    let replies = viewer.start_play("cam1").await;
    assert_eq!(replies.len(), 3);
    assert_eq!(replies[0].message_type(), MSG_TYPE_USER_CONTROL);
    assert_eq!(
        UserControlEvent::decode(&replies[0].payload).unwrap(),
        UserControlEvent::StreamBegin(1)
    );
    let codes: Vec<_> = replies[1..]
        .iter()
        .map(|p| status_code(&RtmpCommand::decode(&p.payload).unwrap()))
        .collect();
    assert_eq!(codes, vec!["NetStream.Play.Reset", "NetStream.Play.Start"]);

    let media = sample_media(1);
    for packet in &media {
        publisher.send(packet).await.unwrap();
    }
    for expected in &media {
        let received = viewer.read_media().await;
        assert_eq!(received.message_type(), expected.message_type());
        assert_eq!(received.header.timestamp, expected.header.timestamp);
        assert_eq!(received.payload, expected.payload);
    }
}

#[tokio::test]
async fn test_viewer_waiting_before_publisher() {
    let server = start_server(test_config()).await;

    let mut viewer = TestClient::connect(server.addr).await.unwrap();
    viewer.start_play("late").await;

    let mut publisher = TestClient::connect(server.addr).await.unwrap();
    assert_eq!(publisher.start_publish("late").await, "NetStream.Publish.Start");

    let media = sample_media(1);
    for packet in &media {
        publisher.send(packet).await.unwrap();
    }
    for expected in &media {
        assert_eq!(viewer.read_media().await.payload, expected.payload);
    }

    let info = server.context.registry().channel_info("late").await.unwrap().unwrap();
    assert_eq!(info.viewers.len(), 1);
    assert!(info.publisher.is_some());
}

#[tokio::test]
async fn test_second_publisher_evicts_first() {
    let server = start_server(test_config()).await;

    let mut first = TestClient::connect(server.addr).await.unwrap();
    assert_eq!(first.start_publish("cam1").await, "NetStream.Publish.Start");

    let mut second = TestClient::connect(server.addr).await.unwrap();
    assert_eq!(second.start_publish("cam1").await, "NetStream.Publish.Start");

    // The evicted connection is closed by the server
    loop {
        if first.read_packet().await.is_err() {
            break;
        }
    }

    let info = server.context.registry().channel_info("cam1").await.unwrap().unwrap();
    assert!(info.publisher.is_some());
    assert_eq!(server.context.registry().channel_count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_unknown_command_keeps_connection() {
    let server = start_server(test_config()).await;
    let mut client = TestClient::connect(server.addr).await.unwrap();
    client.rtmp_connect("live").await;

    client
        .send_command(&RtmpCommand::new("fooBar", 2.0), 3, 0)
        .await
        .unwrap();
    client
        .send_command(&RtmpCommand::new("FCPublish", 3.0).arg("cam1"), 3, 0)
        .await
        .unwrap();
    assert_eq!(client.create_stream(4.0).await, 1);
    assert_eq!(client.create_stream(5.0).await, 2);
}

#[tokio::test]
async fn test_server_respects_connection_limit() {
    let config = ServerConfig::builder()
        .host("127.0.0.1")
        .port(0)
        .max_connections(1)
        .build()
        .unwrap();
    let server = start_server(config).await;

    let mut first = TestClient::connect(server.addr).await.unwrap();
    first.rtmp_connect("live").await;
    assert_eq!(server.context.active_connections(), 1);

    let rejected = tokio::time::timeout(Duration::from_secs(5), TestClient::connect(server.addr))
        .await
        .expect("rejected connection should close promptly");
    assert!(rejected.is_err());
}

#[tokio::test]
async fn test_server_config_validation() {
    assert!(ServerConfig::builder().chunk_size(64).build().is_err());
    assert!(ServerConfig::builder().chunk_size(70000).build().is_err());
    assert!(ServerConfig::builder().max_connections(0).build().is_err());
    assert!(ServerConfig::builder().host("").build().is_err());

    let config = ServerConfig::builder().port(0).chunk_size(4096).build().unwrap();
    assert_eq!(config.chunk_size, 4096);
    assert_eq!(config.bind_address(), "0.0.0.0:0");
}
