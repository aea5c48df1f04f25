//! Session stage: data delivery, termination, invariants

use crate::harness::{AC_MAC, CLIENT_MAC, Harness, ROGUE_MAC};
use pppoe_engine::Error;
use pppoe_engine::dataplane::{DisconnectReason, EndpointState, Event};
use pppoe_engine::protocol::ethernet::FrameBuilder;
use pppoe_engine::protocol::pppoe::{
    PPPOE_SESSION_ETHERTYPE, PppoeBuilder, codes, tags,
};

const LCP_ECHO: &[u8] = &[0xc0, 0x21, 0x09, 0x01, 0x00, 0x08, 0x12, 0x34, 0x56, 0x78];

/// Client connected to AC_MAC on session 42
fn connected() -> Harness {
    let mut h = Harness::new(CLIENT_MAC);
    h.engine.connect(h.id, "", "").unwrap();
    let uniq = h.wire.take()[0]
        .pppoe()
        .find_tag(tags::HOST_UNIQ)
        .unwrap()
        .to_vec();

    let pado = PppoeBuilder::discovery(codes::PADO)
        .ac_name(b"ac")
        .add_tag(tags::HOST_UNIQ, &uniq)
        .build();
    h.discovery(AC_MAC, &pado);
    let pads = PppoeBuilder::discovery(codes::PADS)
        .session_id(42)
        .add_tag(tags::HOST_UNIQ, &uniq)
        .build();
    h.discovery(AC_MAC, &pads);

    assert_eq!(h.engine.state(h.id).unwrap(), EndpointState::Connected);
    h.wire.take();
    h.host.events();
    h
}

#[test]
fn test_data_from_peer_delivered() {
    let mut h = connected();
    let frame = PppoeBuilder::session(42).payload(LCP_ECHO).build();
    h.engine.on_frame(AC_MAC, PPPOE_SESSION_ETHERTYPE, &frame);

    assert_eq!(h.host.data(), vec![LCP_ECHO.to_vec()]);
    assert_eq!(h.engine.metrics().data_delivered.get(), 1);
}

#[test]
fn test_data_from_other_station_dropped() {
    let mut h = connected();
    let frame = PppoeBuilder::session(42).payload(LCP_ECHO).build();
    h.engine.on_frame(ROGUE_MAC, PPPOE_SESSION_ETHERTYPE, &frame);

    assert!(h.host.data().is_empty());
    assert_eq!(h.engine.state(h.id).unwrap(), EndpointState::Connected);
    assert_eq!(h.engine.metrics().data_dropped.get(), 1);
}

#[test]
fn test_data_for_other_session_dropped() {
    let mut h = connected();
    let frame = PppoeBuilder::session(43).payload(LCP_ECHO).build();
    h.engine.on_frame(AC_MAC, PPPOE_SESSION_ETHERTYPE, &frame);
    assert!(h.host.data().is_empty());
}

#[test]
fn test_padding_not_delivered() {
    let mut h = connected();
    let mut frame = PppoeBuilder::session(42).payload(&[0xc0, 0x21]).build();
    frame.extend_from_slice(&[0u8; 30]);

    let raw = FrameBuilder::new(CLIENT_MAC, AC_MAC)
        .ethertype(PPPOE_SESSION_ETHERTYPE)
        .payload(&frame)
        .build();
    h.engine.on_ethernet_frame(&raw);

    assert_eq!(h.host.data(), vec![vec![0xc0, 0x21]]);
}

#[test]
fn test_send_data_encapsulates() {
    let mut h = connected();
    h.engine.send_data(h.id, LCP_ECHO).unwrap();

    let sent = h.wire.take();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].dst, AC_MAC);
    assert_eq!(sent[0].ethertype, PPPOE_SESSION_ETHERTYPE);
    let frame = sent[0].pppoe();
    assert_eq!(frame.code(), codes::SESSION);
    assert_eq!(frame.session_id(), 42);
    assert_eq!(frame.payload(), LCP_ECHO);
}

#[test]
fn test_peer_terminates() {
    let mut h = connected();

    // Wrong session, then wrong station: both ignored
    h.discovery(AC_MAC, &PppoeBuilder::discovery(codes::PADT).session_id(7).build());
    h.discovery(ROGUE_MAC, &PppoeBuilder::discovery(codes::PADT).session_id(42).build());
    assert_eq!(h.engine.state(h.id).unwrap(), EndpointState::Connected);

    h.discovery(AC_MAC, &PppoeBuilder::discovery(codes::PADT).session_id(42).build());
    assert_eq!(h.engine.state(h.id).unwrap(), EndpointState::Disconnected);
    assert_eq!(h.engine.session_id(h.id).unwrap(), None);
    assert_eq!(h.engine.peer_address(h.id).unwrap(), None);
    assert_eq!(
        h.host.events(),
        vec![Event::Disconnected(DisconnectReason::Normal)]
    );
    assert!(h.wire.take().is_empty());

    assert!(matches!(
        h.engine.send_data(h.id, LCP_ECHO),
        Err(Error::NotConnected(_))
    ));
}

#[test]
fn test_local_disconnect() {
    let mut h = connected();
    h.engine.disconnect(h.id).unwrap();

    let sent = h.wire.take();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].is_discovery(codes::PADT));
    assert_eq!(sent[0].dst, AC_MAC);
    assert_eq!(sent[0].pppoe().session_id(), 42);
    assert_eq!(
        h.host.events(),
        vec![Event::Disconnected(DisconnectReason::Normal)]
    );
    assert_eq!(h.engine.session_id(h.id).unwrap(), None);
    assert_eq!(h.engine.peer_address(h.id).unwrap(), None);

    // Data for the old session is no longer accepted
    let frame = PppoeBuilder::session(42).payload(LCP_ECHO).build();
    h.engine.on_frame(AC_MAC, PPPOE_SESSION_ETHERTYPE, &frame);
    assert!(h.host.data().is_empty());
}

#[test]
fn test_connected_has_no_timers() {
    let mut h = connected();
    assert!(!h.engine.endpoint(h.id).unwrap().timers().any_armed());
    h.ticks(600);
    assert_eq!(h.engine.state(h.id).unwrap(), EndpointState::Connected);
    assert!(h.wire.take().is_empty());
}

#[test]
fn test_metrics_track_lifecycle() {
    let mut h = connected();
    h.engine.disconnect(h.id).unwrap();

    let metrics = h.engine.metrics();
    assert_eq!(metrics.padi_sent.get(), 1);
    assert_eq!(metrics.padr_sent.get(), 1);
    assert_eq!(metrics.padt_sent.get(), 1);
    assert_eq!(metrics.sessions_established.get(), 1);
    assert_eq!(metrics.sessions_terminated.get(), 1);
    assert_eq!(metrics.discovery_failures.get(), 0);
}
