use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use msgsock::{AcceptOutcome, AckStatus, ResultCode, Session, SessionConfig, SessionError};

fn init_tracing() {
	let _ = tracing_subscriber::fmt()
		.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
		.with_test_writer()
		.try_init();
}

/// Spawns a receiver on `config.port`, waits until it is listening, and
/// runs `then` on the session once a peer has been accepted.
fn serve<R, F>(config: SessionConfig, then: F) -> JoinHandle<R>
where
	R: Send + 'static,
	F: FnOnce(&mut Session) -> R + Send + 'static,
{
	init_tracing();
	let (ready_tx, ready_rx) = mpsc::channel();
	let handle = thread::spawn(move || {
		let mut session = Session::receiver(config);
		session.acquire_listener().expect("listener");
		ready_tx.send(()).expect("ready signal");

		let shutdown = AtomicBool::new(false);
		let outcome = session.accept(&shutdown).expect("accept");
		assert_eq!(outcome, AcceptOutcome::Connected);
		then(&mut session)
	});
	ready_rx.recv().expect("receiver never started listening");
	handle
}

fn connected_sender(port: u16) -> Session {
	let mut sender = Session::sender("localhost", SessionConfig::new(port).io_timeout(5));
	sender.connect().expect("connect");
	assert_eq!(sender.last_result(), ResultCode::ClientConnected);
	sender
}

#[test]
fn ping_round_trip_with_ack() {
	let port = 16301;
	let server = serve(SessionConfig::new(port).io_timeout(5), |session| {
		let mut buf = [0u8; 64];
		let received = session.recv(&mut buf, &AtomicBool::new(false), true).expect("recv");
		(received.payload(&buf).to_vec(), received, session.message_size())
	});

	let mut sender = connected_sender(port);
	let sent = sender.send(b"ping", true).expect("send");
	assert_eq!(sent.bytes, 5);
	match &sent.ack {
		AckStatus::Received(ack) => {
			assert_eq!(ack.text(), ":ACK:ByteCount:5");
			assert_eq!(ack.byte_count(), Some(5));
		}
		other => panic!("expected an ACK, got {:?}", other),
	}
	assert_eq!(sender.last_result(), ResultCode::MessageSent);

	let (payload, received, size) = server.join().expect("server thread");
	assert_eq!(payload, b"ping");
	assert_eq!(received.size, 5);
	assert_eq!(received.ack, AckStatus::Sent);
	assert_eq!(size, 5);
}

#[test]
fn message_filling_whole_chunks_still_completes() {
	let port = 16302;
	let server = serve(SessionConfig::new(port).io_timeout(5).read_chunk(4), |session| {
		let mut buf = [0u8; 16];
		let received = session.recv(&mut buf, &AtomicBool::new(false), false).expect("recv");
		(received.size, buf[..received.size].to_vec(), session.last_result())
	});

	let mut sender = connected_sender(port);
	sender.send(b"abc", false).expect("send");

	let (size, bytes, result) = server.join().expect("server thread");
	assert_eq!(size, 4);
	assert_eq!(bytes, b"abc\0");
	assert_eq!(result, ResultCode::MessageReceived);
}

#[test]
fn short_read_ends_message() {
	let port = 16303;
	let server = serve(SessionConfig::new(port).io_timeout(5), |session| {
		let mut buf = [0u8; 1024];
		let received = session.recv(&mut buf, &AtomicBool::new(false), false).expect("recv");
		(received.size, received.payload(&buf).to_vec())
	});

	let mut sender = connected_sender(port);
	sender.send(b"hi", false).expect("send");

	let (size, payload) = server.join().expect("server thread");
	assert_eq!(size, 3);
	assert_eq!(payload, b"hi");
}

#[test]
fn oversized_message_is_rejected() {
	let port = 16304;
	let server = serve(SessionConfig::new(port).io_timeout(5).read_chunk(2), |session| {
		let mut buf = [0u8; 5];
		let err = session.recv(&mut buf, &AtomicBool::new(false), true).unwrap_err();
		(err, session.last_result(), session.message_size())
	});

	let mut sender = connected_sender(port);
	sender.send(b"abcdefghi", false).expect("send");

	let (err, result, size) = server.join().expect("server thread");
	assert!(matches!(err, SessionError::Overflow { accumulated: 4, capacity: 5 }), "{:?}", err);
	assert_eq!(result, ResultCode::MessageOverflow);
	assert_eq!(size, -4);
}

#[test]
fn shutdown_flag_ends_accept_within_one_timeout() {
	init_tracing();
	let mut receiver = Session::receiver(SessionConfig::new(16305).listen_timeout(1));
	receiver.acquire_listener().expect("listener");
	assert_eq!(receiver.last_result(), ResultCode::ListenerCreated);

	let shutdown = Arc::new(AtomicBool::new(false));
	let flag = Arc::clone(&shutdown);
	let setter = thread::spawn(move || {
		thread::sleep(Duration::from_millis(200));
		flag.store(true, Ordering::Release);
	});

	let started = Instant::now();
	let outcome = receiver.accept(&shutdown).expect("accept");
	setter.join().expect("setter thread");

	assert_eq!(outcome, AcceptOutcome::ShutdownRequested);
	assert_eq!(receiver.last_result(), ResultCode::ShutdownRequested);
	assert!(started.elapsed() < Duration::from_secs(3));
	assert!(!receiver.is_connected());
	assert!(receiver.has_listener());
}

#[test]
fn broken_pipe_closes_sender_connection() {
	let port = 16306;
	let (closed_tx, closed_rx) = mpsc::channel();
	let server = serve(SessionConfig::new(port), move |session| {
		assert!(session.close_connection());
		closed_tx.send(()).expect("closed signal");
	});

	let mut sender = connected_sender(port);
	closed_rx.recv().expect("server never closed");
	server.join().expect("server thread");

	// the first write after the peer closed only draws a reset
	let mut disconnected = None;
	for _ in 0..20 {
		match sender.send(b"are you there", false) {
			Err(err @ SessionError::Disconnected { .. }) => {
				disconnected = Some(err);
				break;
			}
			_ => thread::sleep(Duration::from_millis(50)),
		}
	}

	let err = disconnected.expect("send never saw the broken pipe");
	assert_eq!(err.code(), ResultCode::ClientDisconnected);
	assert_eq!(sender.last_result(), ResultCode::ClientDisconnected);
	assert!(!sender.is_connected());

	let err = sender.send(b"again", false).unwrap_err();
	assert!(matches!(err, SessionError::InvalidSession { .. }));
	assert_eq!(sender.last_result(), ResultCode::InvalidSession);
	assert!(!sender.is_valid());
}

#[test]
fn silent_peer_times_out_receive() {
	let port = 16307;
	let server = serve(SessionConfig::new(port).io_timeout(1), |session| {
		let mut buf = [0u8; 64];
		let err = session.recv(&mut buf, &AtomicBool::new(false), false).unwrap_err();
		(err, session.last_result())
	});

	let sender = connected_sender(port);
	let (err, result) = server.join().expect("server thread");
	assert!(matches!(err, SessionError::ReceiveTimeout { secs: 1 }), "{:?}", err);
	assert_eq!(result, ResultCode::ReceiveTimeout);
	sender.destroy();
}

#[test]
fn malformed_sessions_do_no_io() {
	init_tracing();
	let flag = AtomicBool::new(false);

	let mut negative = Session::receiver(SessionConfig::new(16308).listen_timeout(-1));
	let err = negative.acquire_listener().unwrap_err();
	assert_eq!(err.code(), ResultCode::InvalidSession);
	assert!(!negative.has_listener());

	let mut too_long = Session::sender("localhost", SessionConfig::new(16308).io_timeout(86_401));
	assert!(too_long.connect().is_err());
	assert_eq!(too_long.last_result(), ResultCode::InvalidSession);
	assert!(!too_long.is_connected());

	let mut unconnected = Session::sender("localhost", SessionConfig::new(16308));
	assert!(unconnected.send(b"hello", false).is_err());
	assert_eq!(unconnected.last_result(), ResultCode::InvalidSession);

	let mut no_listener = Session::receiver(SessionConfig::new(16308));
	assert!(no_listener.accept(&flag).is_err());
	let mut buf = [0u8; 8];
	assert!(no_listener.recv(&mut buf, &flag, false).is_err());
	assert_eq!(no_listener.last_result(), ResultCode::InvalidSession);

	no_listener.acquire_listener().expect("listener");
	let err = no_listener.acquire_listener().unwrap_err();
	assert!(matches!(err, SessionError::InvalidSession { .. }));
	assert!(no_listener.has_listener());
	no_listener.destroy();
}

#[test]
fn peer_closing_first_is_not_a_message() {
	let port = 16309;
	let (gone_tx, gone_rx) = mpsc::channel::<()>();
	let server = serve(SessionConfig::new(port).io_timeout(5), move |session| {
		gone_rx.recv().expect("sender never closed");
		let mut buf = [0u8; 64];
		let err = session.recv(&mut buf, &AtomicBool::new(false), false).unwrap_err();
		(err, session.last_result(), session.message_size())
	});

	connected_sender(port).destroy();
	gone_tx.send(()).expect("gone signal");

	let (err, result, size) = server.join().expect("server thread");
	assert!(matches!(err, SessionError::PeerClosed), "{:?}", err);
	assert_eq!(result, ResultCode::MessageNotReceived);
	assert_eq!(size, 0);
}

#[test]
fn embedded_null_is_refused_before_sending() {
	let port = 16310;
	let server = serve(SessionConfig::new(port).io_timeout(5), |session| {
		let mut buf = [0u8; 64];
		let received = session.recv(&mut buf, &AtomicBool::new(false), false).expect("recv");
		received.payload(&buf).to_vec()
	});

	let mut sender = connected_sender(port);
	let err = sender.send(b"a\0b", false).unwrap_err();
	assert!(matches!(err, SessionError::InteriorNul { position: 1 }));
	assert_eq!(sender.last_result(), ResultCode::MessageNotSent);
	assert!(sender.is_connected());

	sender.send(b"ok", false).expect("send");
	assert_eq!(server.join().expect("server thread"), b"ok");
}

#[test]
fn listener_serves_peers_one_after_another() {
	let port = 16311;
	let server = serve(SessionConfig::new(port).io_timeout(5), |session| {
		let shutdown = AtomicBool::new(false);
		let mut buf = [0u8; 64];
		let mut seen = Vec::new();

		let received = session.recv(&mut buf, &shutdown, true).expect("first recv");
		seen.push(received.payload(&buf).to_vec());
		assert!(session.accept(&shutdown).is_err(), "accept with a peer still open");
		assert!(session.close_connection());

		assert_eq!(session.accept(&shutdown).expect("second accept"), AcceptOutcome::Connected);
		let received = session.recv(&mut buf, &shutdown, true).expect("second recv");
		seen.push(received.payload(&buf).to_vec());
		seen
	});

	let mut first = connected_sender(port);
	first.send(b"one", true).expect("first send");
	first.destroy();

	let mut second = connected_sender(port);
	second.send(b"two", true).expect("second send");

	let seen = server.join().expect("server thread");
	assert_eq!(seen, vec![b"one".to_vec(), b"two".to_vec()]);
}

#[test]
fn nothing_listening_means_no_connection() {
	init_tracing();
	let mut sender = Session::sender("localhost", SessionConfig::new(16312));
	let err = sender.connect().unwrap_err();
	assert!(matches!(err, SessionError::NoConnection { port: 16312, .. }), "{:?}", err);
	assert_eq!(sender.last_result(), ResultCode::NoConnection);
	assert!(!sender.is_connected());
}

#[test]
fn message_spanning_several_chunks_is_reassembled() {
	let port = 16313;
	let server = serve(SessionConfig::new(port).io_timeout(5).read_chunk(4), |session| {
		let shutdown = AtomicBool::new(false);
		let mut buf = [0u8; 32];
		let mut seen = Vec::new();
		for _ in 0..2 {
			let received = session.recv(&mut buf, &shutdown, true).expect("recv");
			seen.push((received.size, received.payload(&buf).to_vec()));
		}
		seen
	});

	let mut sender = connected_sender(port);
	// 10 bytes on the wire: chunks of 4, 4 and a short 2
	let sent = sender.send(b"abcdefghi", true).expect("send");
	assert!(matches!(&sent.ack, AckStatus::Received(ack) if ack.byte_count() == Some(10)));
	// 8 bytes: two full chunks, the second ending on the terminator
	let sent = sender.send(b"abcdefg", true).expect("send");
	assert!(matches!(&sent.ack, AckStatus::Received(ack) if ack.text() == ":ACK:ByteCount:8"));

	let seen = server.join().expect("server thread");
	assert_eq!(seen, vec![(10, b"abcdefghi".to_vec()), (8, b"abcdefg".to_vec())]);
}

#[test]
fn receiver_closing_without_ack_fails_the_wait() {
	let port = 16314;
	let server = serve(SessionConfig::new(port).io_timeout(5), |session| {
		let mut buf = [0u8; 64];
		let received = session.recv(&mut buf, &AtomicBool::new(false), false).expect("recv");
		assert_eq!(received.ack, AckStatus::NotRequested);
		assert!(session.close_connection());
	});

	let mut sender = connected_sender(port);
	let sent = sender.send(b"anyone", true).expect("send itself succeeds");
	assert_eq!(sent.bytes, 7);
	assert_eq!(sent.ack, AckStatus::Failed(ResultCode::AckReceiveFailed));
	assert_eq!(sender.last_result(), ResultCode::AckReceiveFailed);
	server.join().expect("server thread");
}

#[test]
fn overflow_sends_no_ack() {
	let port = 16315;
	let (done_tx, done_rx) = mpsc::channel::<()>();
	let server = serve(SessionConfig::new(port).io_timeout(5), move |session| {
		let mut buf = [0u8; 4];
		let err = session.recv(&mut buf, &AtomicBool::new(false), true).unwrap_err();
		// hold the connection open until the sender gave up waiting
		done_rx.recv().expect("sender never finished");
		err.code()
	});

	let mut sender = Session::sender("localhost", SessionConfig::new(port).io_timeout(1));
	sender.connect().expect("connect");
	let sent = sender.send(b"far too long", true).expect("send");
	assert_eq!(sent.ack, AckStatus::Failed(ResultCode::AckReceiveFailed));
	done_tx.send(()).expect("done signal");

	assert_eq!(server.join().expect("server thread"), ResultCode::MessageOverflow);
}
