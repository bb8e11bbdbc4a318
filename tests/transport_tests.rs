use std::io::{BufRead, BufReader, Read, Write};
use std::net::{IpAddr, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use hostwatch::monitor::{RequestOutcome, TrafficMonitor};
use hostwatch::testkit::monitor::{MonitorEvent, RecordingMonitor};
use hostwatch::transport::{MonitoredListener, MonitoredTcpListener};

#[test]
fn blocking_accept_registers_and_close_releases() {
    let monitor = Arc::new(TrafficMonitor::<IpAddr>::new("blocking"));
    let listener = MonitoredListener::bind("127.0.0.1:0", Arc::clone(&monitor)).unwrap();
    let addr = listener.local_addr().unwrap();

    let client = thread::spawn(move || {
        let mut stream = TcpStream::connect(addr).unwrap();
        stream.write_all(b"hello\n").unwrap();
        let mut reply = String::new();
        BufReader::new(stream).read_line(&mut reply).unwrap();
        reply
    });

    let mut stream = listener.accept().unwrap();
    let host = stream.peer_host();
    assert!(host.is_loopback());
    assert_eq!(monitor.traffic_info_for(&host).unwrap().connection_count(), 1);

    let mut buf = [0u8; 6];
    stream.read_exact(&mut buf).unwrap();
    stream.write_all(&buf).unwrap();
    monitor.request_result(&host, RequestOutcome::Success, Duration::from_micros(10));

    stream.close().unwrap();
    stream.close().unwrap();
    assert_eq!(client.join().unwrap(), "hello\n");

    let info = monitor.traffic_info_for(&host).unwrap();
    assert_eq!(info.connection_count(), 0);
    assert_eq!(info.success_count(), 1);
    assert_eq!(listener.open_connections(), 0);
}

#[test]
fn blocking_connections_from_one_host_add_up() {
    let monitor = Arc::new(TrafficMonitor::<IpAddr>::new("blocking"));
    let listener = MonitoredListener::bind("127.0.0.1:0", Arc::clone(&monitor)).unwrap();
    let addr = listener.local_addr().unwrap();

    let clients: Vec<TcpStream> = (0..3).map(|_| TcpStream::connect(addr).unwrap()).collect();
    let streams: Vec<_> = listener.incoming().take(3).map(Result::unwrap).collect();
    let host = streams[0].peer_host();

    assert_eq!(monitor.traffic_info_for(&host).unwrap().connection_count(), 3);
    assert_eq!(listener.open_hosts(), vec![host; 3]);

    drop(streams);
    drop(clients);
    assert_eq!(monitor.traffic_info_for(&host).unwrap().connection_count(), 0);
}

#[test]
fn blocking_release_survives_peer_disconnect() {
    let monitor = Arc::new(RecordingMonitor::new());
    let listener = MonitoredListener::bind("127.0.0.1:0", Arc::clone(&monitor)).unwrap();
    let addr = listener.local_addr().unwrap();

    let client = TcpStream::connect(addr).unwrap();
    let mut stream = listener.accept().unwrap();
    let host = stream.peer_host();
    drop(client);

    // The peer is gone; close may or may not report an error.
    let _ = stream.close();
    assert_eq!(
        monitor.events(),
        vec![MonitorEvent::Connected(host), MonitorEvent::Released(host)]
    );
}

#[tokio::test]
async fn tokio_listener_tracks_many_connections() {
    let monitor = Arc::new(TrafficMonitor::<IpAddr>::new("async"));
    let listener = MonitoredTcpListener::bind("127.0.0.1:0", Arc::clone(&monitor))
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();

    let mut clients = Vec::new();
    let mut streams = Vec::new();
    for _ in 0..4 {
        clients.push(tokio::net::TcpStream::connect(addr).await.unwrap());
        streams.push(listener.accept().await.unwrap());
    }
    let host = streams[0].peer_host();
    assert_eq!(monitor.traffic_info_for(&host).unwrap().connection_count(), 4);

    for stream in &mut streams[..2] {
        stream.close().await.unwrap();
    }
    assert_eq!(monitor.traffic_info_for(&host).unwrap().connection_count(), 2);
    assert_eq!(listener.open_connections(), 2);

    drop(streams);
    assert_eq!(monitor.traffic_info_for(&host).unwrap().connection_count(), 0);
    assert_eq!(listener.open_connections(), 0);
}
