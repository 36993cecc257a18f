use std::{
    net::{Ipv4Addr, SocketAddr},
    thread,
    time::{Duration, Instant},
};

use tower_duel_network::{discovery, DiscoveryHost};

#[test]
fn client_finds_host_on_loopback() {
    let mut host = DiscoveryHost::bind(0, "duel-box", 7777).expect("bind");
    let port = host.local_port().expect("port");

    let responder = thread::spawn(move || {
        let deadline = Instant::now() + Duration::from_secs(2);
        let mut answered = 0;
        while Instant::now() < deadline && answered == 0 {
            answered += host.poll().expect("poll");
            thread::sleep(Duration::from_millis(5));
        }
        answered
    });

    let target = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
    let sessions =
        discovery::find_sessions_at(target, Duration::from_millis(1_500), 4).expect("discover");

    assert_eq!(responder.join().expect("responder"), 1);
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].name, "duel-box");
    assert_eq!(sessions[0].port, 7777);
    assert_eq!(sessions[0].address(), SocketAddr::from((Ipv4Addr::LOCALHOST, 7777)));
}

#[test]
fn search_without_hosts_times_out_empty() {
    let probe = std::net::UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).expect("bind");
    let target = probe.local_addr().expect("addr");

    let started = Instant::now();
    let sessions =
        discovery::find_sessions_at(target, Duration::from_millis(100), 4).expect("discover");

    assert!(sessions.is_empty());
    assert!(started.elapsed() >= Duration::from_millis(100));
}
