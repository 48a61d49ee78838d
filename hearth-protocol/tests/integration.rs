use hearth_packets::configuration::serverbound as conf_in;
use hearth_packets::handshake::serverbound as hand_in;
use hearth_packets::login::clientbound as login_out;
use hearth_packets::login::serverbound as login_in;
use hearth_packets::play::clientbound as play_out;
use hearth_packets::play::serverbound as play_in;
use hearth_packets::{
    DecodePacket, EncodePacket, FrameBuffer, NextState, Packet, PacketView, frame,
};
use hearth_protocol::{Server, ServerOptions, SessionManager, SessionState};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

async fn start_server(
    options: ServerOptions,
) -> (
    SocketAddr,
    Arc<SessionManager>,
    CancellationToken,
    JoinHandle<()>,
) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = listener.local_addr().expect("local addr failed");
    let server = Server::new(options);
    let manager = server.manager();
    let stop = CancellationToken::new();
    let handle = tokio::spawn({
        let stop = stop.clone();
        async move {
            server
                .listen(listener, stop)
                .await
                .expect("server listen failed");
        }
    });
    (addr, manager, stop, handle)
}

async fn send_packet<P: EncodePacket>(stream: &mut TcpStream, packet: &P) {
    let mut body = FrameBuffer::new();
    body.write_varint(P::ID);
    packet.encode(&mut body).expect("packet encode failed");
    let framed = frame::encode_frame(&body, None).expect("frame encode failed");
    stream.write_all(&framed).await.expect("frame write failed");
}

async fn read_raw_frame(stream: &mut TcpStream) -> Vec<u8> {
    let mut length: i32 = 0;
    for i in 0..5 {
        let byte = stream.read_u8().await.expect("frame length read failed");
        length |= ((byte & 0x7F) as i32) << (7 * i);
        if byte & 0x80 == 0 {
            break;
        }
    }
    let mut body = vec![0; length as usize];
    stream
        .read_exact(&mut body)
        .await
        .expect("frame body read failed");
    body
}

async fn read_frame(stream: &mut TcpStream) -> (i32, Vec<u8>) {
    let body = read_raw_frame(stream).await;
    let mut view = PacketView::new(&body);
    let id = view.read_varint().expect("packet id read failed");
    (id, view.read_remaining().to_vec())
}

async fn read_compressed_frame(stream: &mut TcpStream) -> (i32, Vec<u8>) {
    let body = read_raw_frame(stream).await;
    let mut scratch = Vec::new();
    let payload =
        frame::decode_compressed_body(&body, &mut scratch).expect("frame inflate failed");
    let mut view = PacketView::new(payload);
    let id = view.read_varint().expect("packet id read failed");
    (id, view.read_remaining().to_vec())
}

async fn send_compressed_packet<P: EncodePacket>(
    stream: &mut TcpStream,
    packet: &P,
    threshold: i32,
) {
    let mut body = FrameBuffer::new();
    body.write_varint(P::ID);
    packet.encode(&mut body).expect("packet encode failed");
    let framed = frame::encode_frame(&body, Some(threshold)).expect("frame encode failed");
    stream.write_all(&framed).await.expect("frame write failed");
}

async fn expect_eof(stream: &mut TcpStream) {
    let mut tail = [0u8; 32];
    loop {
        match stream.read(&mut tail).await {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }
    }
}

async fn wait_until(description: &str, mut condition: impl FnMut() -> bool) {
    for _ in 0..100 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("timed out waiting for: {description}");
}

/// Walks a fresh connection through handshake, offline login and finish
/// configuration, asserting the expected server replies along the way.
async fn login_to_play(stream: &mut TcpStream, user_name: &str) {
    send_packet(
        stream,
        &hand_in::HandshakePacket {
            protocol_version: 765,
            server_address: "localhost".to_owned(),
            server_port: 25565,
            next_state: NextState::Login,
        },
    )
    .await;
    send_packet(
        stream,
        &login_in::LoginStartPacket {
            user_name: user_name.to_owned(),
            user_id: None,
        },
    )
    .await;

    let (id, body) = read_frame(stream).await;
    assert_eq!(id, login_out::LoginSuccessPacket::ID);
    let success = login_out::LoginSuccessPacket::decode(&mut PacketView::new(&body))
        .expect("login success decode failed");
    assert_eq!(success.user_name, user_name);
    assert!(success.properties.is_empty());

    send_packet(stream, &conf_in::FinishConfigurationPacket).await;

    // a configuration keep-alive may race the finish on a slow run
    let (id, body) = loop {
        let (id, body) = read_frame(stream).await;
        if id != hearth_packets::configuration::clientbound::KeepAlivePacket::ID {
            break (id, body);
        }
    };
    assert_eq!(id, play_out::LoginPacket::ID);
    let login = play_out::LoginPacket::decode(&mut PacketView::new(&body))
        .expect("play login decode failed");
    assert_eq!(login.dimension_names, vec!["minecraft:overworld".to_owned()]);
}

#[tokio::test]
async fn status_ping_round_trip() {
    let (addr, _manager, stop, handle) = start_server(ServerOptions::default()).await;
    let mut stream = TcpStream::connect(addr).await.expect("connect failed");

    // handshake (proto=8, addr="localhost", port=25565, next_state=1),
    // status request and ping with payload 42, as literal wire bytes
    stream
        .write_all(&[
            0x0F, 0x00, 0x08, 0x09, b'l', b'o', b'c', b'a', b'l', b'h', b'o', b's', b't', 0x63,
            0xDD, 0x01,
        ])
        .await
        .unwrap();
    stream.write_all(&[0x01, 0x00]).await.unwrap();
    stream
        .write_all(&[0x09, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x2A])
        .await
        .unwrap();

    let (id, body) = read_frame(&mut stream).await;
    assert_eq!(id, 0x00);
    let mut view = PacketView::new(&body);
    let status: serde_json::Value =
        serde_json::from_str(view.read_str().unwrap()).expect("status body is not JSON");
    assert_eq!(status["version"]["name"], "1.20.4");
    assert_eq!(status["version"]["protocol"], 765);
    assert_eq!(status["players"]["max"], 100);
    assert_eq!(status["players"]["online"], 0);
    assert_eq!(status["description"]["text"], "A Minecraft Server");
    assert_eq!(status["enforcesSecureChat"], false);
    assert_eq!(status["previewsChat"], false);

    let (id, body) = read_frame(&mut stream).await;
    assert_eq!(id, 0x01);
    assert_eq!(i64::from_be_bytes(body[..8].try_into().unwrap()), 42);

    // the server closes the socket after the pong
    expect_eof(&mut stream).await;

    stop.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn offline_login_reaches_play() {
    let (addr, manager, stop, handle) = start_server(ServerOptions::default()).await;
    let mut stream = TcpStream::connect(addr).await.expect("connect failed");

    send_packet(
        &mut stream,
        &hand_in::HandshakePacket {
            protocol_version: 765,
            server_address: "localhost".to_owned(),
            server_port: 25565,
            next_state: NextState::Login,
        },
    )
    .await;
    send_packet(
        &mut stream,
        &login_in::LoginStartPacket {
            user_name: "Steve".to_owned(),
            user_id: None,
        },
    )
    .await;

    let (id, body) = read_frame(&mut stream).await;
    assert_eq!(id, login_out::LoginSuccessPacket::ID);
    let success = login_out::LoginSuccessPacket::decode(&mut PacketView::new(&body)).unwrap();
    assert_eq!(success.user_name, "Steve");
    assert_eq!(
        success.user_id.to_string(),
        "8667ba71-b85a-4004-af54-457a9734eed7",
        "offline uuid must be derived from the name"
    );
    assert!(success.properties.is_empty());

    send_packet(&mut stream, &conf_in::FinishConfigurationPacket).await;

    let (id, body) = read_frame(&mut stream).await;
    assert_eq!(id, play_out::LoginPacket::ID);
    let login = play_out::LoginPacket::decode(&mut PacketView::new(&body)).unwrap();
    assert_eq!(login.max_players, 100);
    assert_eq!(login.dimension_type, "minecraft:overworld");

    {
        let manager = Arc::clone(&manager);
        wait_until("player index at play entry", move || {
            manager
                .get_by_player("Steve")
                .is_some_and(|session| session.state() == SessionState::Play)
        })
        .await;
    }

    drop(stream);
    stop.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn malformed_length_prefix_disconnects() {
    let (addr, manager, stop, handle) = start_server(ServerOptions::default()).await;
    let mut stream = TcpStream::connect(addr).await.expect("connect failed");

    stream
        .write_all(&[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF])
        .await
        .unwrap();

    // no farewell packet exists while handshaking; the socket just closes
    expect_eof(&mut stream).await;

    {
        let manager = Arc::clone(&manager);
        wait_until("session removal", move || manager.session_count() == 0).await;
    }

    stop.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn idle_session_times_out() {
    let options = ServerOptions {
        session_idle_timeout: Duration::from_millis(300),
        heartbeat_interval: Duration::from_millis(50),
        keep_alive_interval: Duration::from_secs(60),
        ..ServerOptions::default()
    };
    let (addr, manager, stop, handle) = start_server(options).await;
    let mut stream = TcpStream::connect(addr).await.expect("connect failed");

    login_to_play(&mut stream, "Steve").await;

    // stay silent and wait for the reaper
    let (id, body) = read_frame(&mut stream).await;
    assert_eq!(id, play_out::DisconnectPacket::ID);
    let farewell = play_out::DisconnectPacket::decode(&mut PacketView::new(&body)).unwrap();
    assert_eq!(farewell.reason, "Timed out");
    expect_eof(&mut stream).await;

    {
        let manager = Arc::clone(&manager);
        wait_until("timed out counter", move || {
            manager.stats().timed_out_sessions == 1
        })
        .await;
    }

    stop.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn per_ip_limit_rejects_fourth_connection() {
    let options = ServerOptions {
        max_sessions_per_ip: 3,
        ..ServerOptions::default()
    };
    let (addr, manager, stop, handle) = start_server(options).await;

    let mut first = TcpStream::connect(addr).await.expect("connect failed");
    let _second = TcpStream::connect(addr).await.expect("connect failed");
    let _third = TcpStream::connect(addr).await.expect("connect failed");
    let mut fourth = TcpStream::connect(addr).await.expect("connect failed");

    {
        let manager = Arc::clone(&manager);
        wait_until("rejection counter", move || {
            manager.stats().rejected_sessions == 1
        })
        .await;
    }
    assert_eq!(manager.session_count(), 3);

    // the rejected socket closes without ever carrying a session
    expect_eof(&mut fourth).await;

    // admitted connections keep working
    send_packet(
        &mut first,
        &hand_in::HandshakePacket {
            protocol_version: 765,
            server_address: "localhost".to_owned(),
            server_port: 25565,
            next_state: NextState::Status,
        },
    )
    .await;
    first.write_all(&[0x01, 0x00]).await.unwrap();
    let (id, _body) = read_frame(&mut first).await;
    assert_eq!(id, 0x00);

    stop.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn server_keep_alive_reaches_playing_client() {
    let options = ServerOptions {
        heartbeat_interval: Duration::from_millis(50),
        keep_alive_interval: Duration::from_millis(200),
        session_idle_timeout: Duration::from_secs(10),
        ..ServerOptions::default()
    };
    let (addr, _manager, stop, handle) = start_server(options).await;
    let mut stream = TcpStream::connect(addr).await.expect("connect failed");

    login_to_play(&mut stream, "Alex").await;

    let (id, body) = read_frame(&mut stream).await;
    assert_eq!(id, play_out::KeepAlivePacket::ID);
    let ping = play_out::KeepAlivePacket::decode(&mut PacketView::new(&body)).unwrap();

    // answering keeps the session alive
    send_packet(&mut stream, &play_in::KeepAlivePacket { id: ping.id }).await;

    drop(stream);
    stop.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn graceful_stop_notifies_playing_clients() {
    let (addr, manager, stop, handle) = start_server(ServerOptions::default()).await;
    let mut stream = TcpStream::connect(addr).await.expect("connect failed");

    login_to_play(&mut stream, "Steve").await;
    stop.cancel();

    let (id, body) = read_frame(&mut stream).await;
    assert_eq!(id, play_out::DisconnectPacket::ID);
    let farewell = play_out::DisconnectPacket::decode(&mut PacketView::new(&body)).unwrap();
    assert_eq!(farewell.reason, "Server is shutting down");
    expect_eof(&mut stream).await;

    handle.await.unwrap();
    assert_eq!(manager.session_count(), 0);
}

#[tokio::test]
async fn legacy_ping_gets_legacy_reply() {
    let (addr, _manager, stop, handle) = start_server(ServerOptions::default()).await;
    let mut stream = TcpStream::connect(addr).await.expect("connect failed");

    stream.write_all(&[0xFE]).await.unwrap();

    let kick = stream.read_u8().await.expect("legacy reply read failed");
    assert_eq!(kick, 0xFF);
    let unit_count = stream.read_u16().await.expect("legacy length read failed");
    let mut payload = vec![0; usize::from(unit_count) * 2];
    stream
        .read_exact(&mut payload)
        .await
        .expect("legacy payload read failed");
    // the payload opens with the §1 marker
    assert_eq!(u16::from_be_bytes([payload[0], payload[1]]), 0x00A7);
    expect_eof(&mut stream).await;

    stop.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn unknown_play_packets_are_tolerated() {
    let (addr, manager, stop, handle) = start_server(ServerOptions::default()).await;
    let mut stream = TcpStream::connect(addr).await.expect("connect failed");

    login_to_play(&mut stream, "Steve").await;

    // an id this server does not implement, then a position update
    let mut unknown = FrameBuffer::new();
    unknown.write_varint(0x7D);
    unknown.write_bytes(&[0xDE, 0xAD, 0xBE, 0xEF]);
    let framed = frame::encode_frame(&unknown, None).unwrap();
    stream.write_all(&framed).await.unwrap();

    send_packet(
        &mut stream,
        &play_in::SetPlayerPositionPacket {
            x: 8.5,
            feet_y: 64.0,
            z: 8.5,
            on_ground: true,
        },
    )
    .await;

    // the session survives both packets
    {
        let manager = Arc::clone(&manager);
        wait_until("both packets processed", move || {
            manager
                .get_by_player("Steve")
                .is_some_and(|session| session.stats().packets_in >= 4)
        })
        .await;
    }
    let session = manager.get_by_player("Steve").unwrap();
    assert_eq!(session.state(), SessionState::Play);

    stop.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn compressed_login_round_trip() {
    let options = ServerOptions {
        compression_threshold: Some(64),
        ..ServerOptions::default()
    };
    let (addr, _manager, stop, handle) = start_server(options).await;
    let mut stream = TcpStream::connect(addr).await.expect("connect failed");

    send_packet(
        &mut stream,
        &hand_in::HandshakePacket {
            protocol_version: 765,
            server_address: "localhost".to_owned(),
            server_port: 25565,
            next_state: NextState::Login,
        },
    )
    .await;
    send_packet(
        &mut stream,
        &login_in::LoginStartPacket {
            user_name: "Steve".to_owned(),
            user_id: None,
        },
    )
    .await;

    // the compression notice itself is still an uncompressed frame
    let (id, body) = read_frame(&mut stream).await;
    assert_eq!(id, login_out::SetCompressionPacket::ID);
    let notice = login_out::SetCompressionPacket::decode(&mut PacketView::new(&body)).unwrap();
    assert_eq!(notice.threshold, 64);

    // the small login success travels with a zero data-length marker
    let (id, body) = read_compressed_frame(&mut stream).await;
    assert_eq!(id, login_out::LoginSuccessPacket::ID);
    let success = login_out::LoginSuccessPacket::decode(&mut PacketView::new(&body)).unwrap();
    assert_eq!(success.user_name, "Steve");

    // answer in kind; the play login exceeds the threshold and deflates
    send_compressed_packet(&mut stream, &conf_in::FinishConfigurationPacket, 64).await;
    let (id, body) = read_compressed_frame(&mut stream).await;
    assert_eq!(id, play_out::LoginPacket::ID);
    let login = play_out::LoginPacket::decode(&mut PacketView::new(&body)).unwrap();
    assert_eq!(login.dimension_name, "minecraft:overworld");

    drop(stream);
    stop.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn garbled_movement_disconnects_with_protocol_error() {
    let (addr, _manager, stop, handle) = start_server(ServerOptions::default()).await;
    let mut stream = TcpStream::connect(addr).await.expect("connect failed");

    login_to_play(&mut stream, "Steve").await;

    send_packet(
        &mut stream,
        &play_in::SetPlayerPositionPacket {
            x: 31_000_000.0,
            feet_y: 64.0,
            z: 0.0,
            on_ground: true,
        },
    )
    .await;

    let (id, body) = read_frame(&mut stream).await;
    assert_eq!(id, play_out::DisconnectPacket::ID);
    let farewell = play_out::DisconnectPacket::decode(&mut PacketView::new(&body)).unwrap();
    assert!(farewell.reason.starts_with("Protocol error"));
    expect_eof(&mut stream).await;

    stop.cancel();
    handle.await.unwrap();
}
