//! A client engine and an AC engine wired back to back

use crate::harness::{AC_MAC, CLIENT_MAC, Harness};
use pppoe_engine::dataplane::{DisconnectReason, EndpointState, Event};
use pppoe_engine::protocol::MacAddr;
use pppoe_engine::protocol::ethernet::FrameBuilder;

/// Carry every pending frame from each side to the other until both go quiet
fn pump(client: &mut Harness, ac: &mut Harness) {
    loop {
        let to_ac = client.wire.take();
        let to_client = ac.wire.take();
        if to_ac.is_empty() && to_client.is_empty() {
            return;
        }
        for sent in to_ac {
            let raw = FrameBuilder::new(sent.dst, CLIENT_MAC)
                .ethertype(sent.ethertype)
                .payload(&sent.payload)
                .build();
            ac.engine.on_ethernet_frame(&raw);
        }
        for sent in to_client {
            let raw = FrameBuilder::new(sent.dst, AC_MAC)
                .ethertype(sent.ethertype)
                .payload(&sent.payload)
                .build();
            client.engine.on_ethernet_frame(&raw);
        }
    }
}

#[test]
fn test_full_session_between_engines() {
    let mut client = Harness::new(CLIENT_MAC);
    let mut ac = Harness::new(AC_MAC);
    ac.engine.set_local_name(ac.id, "bras").unwrap();
    ac.engine.set_local_service(ac.id, "internet").unwrap();
    ac.engine.listen(ac.id).unwrap();

    client.engine.connect(client.id, "bras", "internet").unwrap();
    pump(&mut client, &mut ac);

    assert_eq!(ac.engine.state(ac.id).unwrap(), EndpointState::Ringing);
    assert_eq!(ac.host.events(), vec![Event::Ringing]);
    assert_eq!(client.engine.state(client.id).unwrap(), EndpointState::Connecting);

    let session_id = ac.engine.accept(ac.id).unwrap();
    pump(&mut client, &mut ac);

    assert_eq!(client.engine.session_id(client.id).unwrap(), Some(session_id));
    assert_eq!(client.engine.peer_address(client.id).unwrap(), Some(AC_MAC));
    assert_eq!(ac.engine.peer_address(ac.id).unwrap(), Some(CLIENT_MAC));
    assert_eq!(client.host.events(), vec![Event::Connected]);
    assert_eq!(ac.host.events(), vec![Event::Connected]);

    client.engine.send_data(client.id, &[0xc0, 0x21, 0x01]).unwrap();
    ac.engine.send_data(ac.id, &[0x80, 0x21, 0x01]).unwrap();
    pump(&mut client, &mut ac);
    assert_eq!(ac.host.data(), vec![vec![0xc0, 0x21, 0x01]]);
    assert_eq!(client.host.data(), vec![vec![0x80, 0x21, 0x01]]);

    client.engine.disconnect(client.id).unwrap();
    pump(&mut client, &mut ac);
    assert_eq!(ac.engine.state(ac.id).unwrap(), EndpointState::Disconnected);
    assert_eq!(
        ac.host.events(),
        vec![Event::Disconnected(DisconnectReason::Normal)]
    );
    assert_eq!(
        client.host.events(),
        vec![Event::Disconnected(DisconnectReason::Normal)]
    );
}

#[test]
fn test_client_skips_ac_with_wrong_service() {
    let mut client = Harness::new(CLIENT_MAC);
    let mut ac = Harness::new(AC_MAC);
    ac.engine.set_local_service(ac.id, "video").unwrap();
    ac.engine.listen(ac.id).unwrap();

    client.engine.connect(client.id, "", "internet").unwrap();
    pump(&mut client, &mut ac);

    assert_eq!(client.engine.state(client.id).unwrap(), EndpointState::Looking);
    assert_eq!(ac.engine.state(ac.id).unwrap(), EndpointState::Listening);
    assert_eq!(ac.engine.metrics().pado_sent.get(), 0);
}

#[test]
fn test_any_service_client_finds_named_ac() {
    let mut client = Harness::new(CLIENT_MAC);
    let mut ac = Harness::new(AC_MAC);
    ac.engine.set_local_service(ac.id, "video").unwrap();
    ac.engine.listen(ac.id).unwrap();

    client.engine.connect(client.id, "", "").unwrap();
    pump(&mut client, &mut ac);

    assert_eq!(ac.engine.state(ac.id).unwrap(), EndpointState::Ringing);
    ac.engine.accept(ac.id).unwrap();
    pump(&mut client, &mut ac);
    assert_eq!(client.engine.state(client.id).unwrap(), EndpointState::Connected);
    assert_ne!(client.engine.peer_address(client.id).unwrap(), Some(MacAddr::BROADCAST));
}
