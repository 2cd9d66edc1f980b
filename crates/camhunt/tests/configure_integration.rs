//! Integration tests for the configuration transaction.
//!
//! # Purpose
//!
//! These tests run `ConfigurationService::configure` against a registry
//! filled by a real discovery round, with both services sharing one scripted
//! channel.  They verify:
//!
//! - A success reply moves the registry record to the new addresses, and a
//!   rejection leaves it where it was.
//! - A missing reply reports the fallback code after every window expired
//!   and leaves the registry untouched.
//! - The push frame carries the sofia digest and the packed addresses.
//! - Unknown devices and bind failures are reported before anything is sent.

use std::io;
use std::net::Ipv4Addr;
use std::time::Duration;

use camhunt::application::configure_device::{
    ConfigOutcome, ConfigurationService, ConfigureError, ConfigureOptions,
};
use camhunt::application::discover_devices::DiscoveryService;
use camhunt::application::manage_devices::DeviceRegistry;
use camhunt::infrastructure::network::mock::{MockChannelProvider, ScriptedChannel};
use camhunt_core::{
    decode_frame, decode_json_payload, encode_frame, sofia_hash, ConfigCommand, MessageType,
    NetworkSettings, ResultCode,
};

const MAC: &str = "00:12:34:56:78:9a";

/// Builds a registry holding one discovered camera at 192.168.1.10.
fn discovered(provider: &MockChannelProvider) -> DeviceRegistry {
    let body = format!(
        r#"{{"NetWork.NetCommon":{{"MAC":"{MAC}","HostName":"Cam1","HostIP":"0x0A01A8C0","Submask":"0x00FFFFFF","GateWay":"0x0101A8C0","TCPPort":34567}},"Ret":100}}"#
    );
    provider
        .channel()
        .push_datagram(encode_frame(MessageType::ProbeReply, body.as_bytes()).unwrap());
    let mut registry = DeviceRegistry::new();
    DiscoveryService::default().discover(provider, &mut registry).unwrap();
    registry
}

fn new_settings() -> NetworkSettings {
    NetworkSettings::parse("10.0.0.50", "255.255.255.0", "10.0.0.1").unwrap()
}

fn config_reply(code: u32) -> Vec<u8> {
    encode_frame(MessageType::ConfigReply, format!(r#"{{"Ret":{code}}}"#).as_bytes()).unwrap()
}

#[test]
fn test_success_reply_updates_registry() {
    // Arrange
    let provider = MockChannelProvider::new(ScriptedChannel::new());
    let mut registry = discovered(&provider);
    provider.channel().push_datagram(config_reply(100));

    // Act
    let outcome = ConfigurationService::default()
        .configure(&provider, &mut registry, MAC, &new_settings(), "secret")
        .unwrap();

    // Assert
    assert_eq!(outcome, ConfigOutcome::Reply(ResultCode::SUCCESS));
    assert_eq!(outcome.to_string(), "Success");
    let record = registry.get(MAC).unwrap();
    assert_eq!(record.host_ip(), Some(Ipv4Addr::new(10, 0, 0, 50)));
    assert_eq!(record.gateway(), Some(Ipv4Addr::new(10, 0, 0, 1)));
    assert_eq!(record.host_name(), Some("Cam1"));
}

#[test]
fn test_rejected_reply_leaves_registry_untouched() {
    // Arrange
    let provider = MockChannelProvider::new(ScriptedChannel::new());
    let mut registry = discovered(&provider);
    provider.channel().push_datagram(config_reply(214));

    // Act
    let outcome = ConfigurationService::default()
        .configure(&provider, &mut registry, MAC, &new_settings(), "wrong")
        .unwrap();

    // Assert
    assert_eq!(outcome, ConfigOutcome::Reply(ResultCode::ILLEGAL_PASSWORD));
    assert!(outcome.is_reply());
    let record = registry.get(MAC).unwrap();
    assert_eq!(record.host_ip(), Some(Ipv4Addr::new(192, 168, 1, 10)));
    assert_eq!(record.gateway(), Some(Ipv4Addr::new(192, 168, 1, 1)));
}

#[test]
fn test_incorrect_password_reply_leaves_registry_untouched() {
    let provider = MockChannelProvider::new(ScriptedChannel::new());
    let mut registry = discovered(&provider);
    provider.channel().push_datagram(config_reply(203));

    let outcome = ConfigurationService::default()
        .configure(&provider, &mut registry, MAC, &new_settings(), "wrong")
        .unwrap();

    assert_eq!(outcome, ConfigOutcome::Reply(ResultCode::INCORRECT_PASSWORD));
    assert_eq!(registry.get(MAC).unwrap().host_ip(), Some(Ipv4Addr::new(192, 168, 1, 10)));
}

#[test]
fn test_huge_reply_timeout_does_not_overflow() {
    // Arrange
    let provider = MockChannelProvider::new(ScriptedChannel::new());
    let mut registry = discovered(&provider);
    provider.channel().push_datagram(config_reply(100));
    let service = ConfigurationService::new(ConfigureOptions {
        reply_timeout: Duration::MAX,
        ..ConfigureOptions::default()
    });

    // Act
    let outcome = service
        .configure(&provider, &mut registry, MAC, &new_settings(), "secret")
        .unwrap();

    // Assert
    assert_eq!(outcome, ConfigOutcome::Reply(ResultCode::SUCCESS));
}

#[test]
fn test_no_reply_reports_fallback_after_every_window() {
    // Arrange
    let provider = MockChannelProvider::new(ScriptedChannel::new());
    let mut registry = discovered(&provider);
    let waits_before = provider.channel().waits().len();
    let sent_before = provider.channel().sent().len();

    // Act
    let outcome = ConfigurationService::default()
        .configure(&provider, &mut registry, MAC, &new_settings(), "secret")
        .unwrap();

    // Assert
    assert_eq!(outcome, ConfigOutcome::NoReply);
    assert_eq!(outcome.code(), ResultCode(203));
    assert_eq!(provider.channel().waits().len() - waits_before, 4);
    assert_eq!(provider.channel().sent().len() - sent_before, 1, "push is sent once");
    assert_eq!(registry.get(MAC).unwrap().host_ip(), Some(Ipv4Addr::new(192, 168, 1, 10)));
}

#[test]
fn test_unrelated_datagrams_do_not_hide_the_reply() {
    let provider = MockChannelProvider::new(ScriptedChannel::new());
    let mut registry = discovered(&provider);
    let service = ConfigurationService::new(ConfigureOptions {
        reply_timeout: Duration::from_secs(5),
        ..ConfigureOptions::default()
    });
    provider.channel().push_datagram(b"noise".to_vec());
    provider.channel().push_timeout();
    provider.channel().push_datagram(config_reply(150));

    let outcome = service
        .configure(&provider, &mut registry, MAC, &new_settings(), "")
        .unwrap();

    assert_eq!(outcome, ConfigOutcome::Reply(ResultCode::SUCCESS_RESTART_REQUIRED));
    assert_eq!(registry.get(MAC).unwrap().host_ip(), Some(Ipv4Addr::new(10, 0, 0, 50)));
}

#[test]
fn test_push_carries_digest_and_packed_addresses() {
    let provider = MockChannelProvider::new(ScriptedChannel::new());
    let mut registry = discovered(&provider);
    provider.channel().push_datagram(config_reply(100));

    ConfigurationService::default()
        .configure(&provider, &mut registry, MAC, &new_settings(), "secret")
        .unwrap();

    let sent = provider.channel().sent();
    let push = sent.last().expect("push must be sent");
    let frame = decode_frame(&push.bytes).unwrap();
    assert_eq!(frame.header.kind(), Some(MessageType::ConfigPush));
    let command: ConfigCommand = decode_json_payload(&frame.payload).unwrap();
    assert_eq!(command.mac, MAC);
    assert_eq!(command.dvr_mac, MAC);
    assert_eq!(command.password, sofia_hash("secret"));
    assert_eq!(command.username, "admin");
    assert_eq!(command.host_ip.to_ipv4(), Ipv4Addr::new(10, 0, 0, 50));
    assert_eq!(command.tcp_port, Some(34567));
}

#[test]
fn test_unknown_device_is_rejected_before_sending() {
    let channel = ScriptedChannel::new();
    let provider = MockChannelProvider::new(channel.clone());
    let mut registry = DeviceRegistry::new();

    let err = ConfigurationService::default()
        .configure(&provider, &mut registry, MAC, &new_settings(), "secret")
        .unwrap_err();

    assert!(matches!(err, ConfigureError::UnknownDevice(mac) if mac == MAC));
    assert!(channel.sent().is_empty());
}

#[test]
fn test_bind_failure_is_reported() {
    let provider = MockChannelProvider::new(ScriptedChannel::new());
    let mut registry = discovered(&provider);
    let failing = provider.failing_open(io::ErrorKind::PermissionDenied);

    let err = ConfigurationService::default()
        .configure(&failing, &mut registry, MAC, &new_settings(), "secret")
        .unwrap_err();

    assert!(matches!(err, ConfigureError::Bind { .. }));
}
