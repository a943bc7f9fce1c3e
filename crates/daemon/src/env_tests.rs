// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;
use yare::parameterized;

#[test]
#[serial]
fn ports_default_when_unset() {
    std::env::remove_var("DROVER_CONSOLE_PORT");
    std::env::remove_var("DROVER_AGENT_PORT");

    assert_eq!(console_port().unwrap(), DEFAULT_CONSOLE_PORT);
    assert_eq!(agent_port().unwrap(), DEFAULT_AGENT_PORT);
}

#[test]
#[serial]
fn port_parses_override() {
    std::env::set_var("DROVER_CONSOLE_PORT", "7000");
    let port = console_port();
    std::env::remove_var("DROVER_CONSOLE_PORT");

    assert_eq!(port.unwrap(), 7000);
}

#[test]
#[serial]
fn invalid_port_is_an_error() {
    std::env::set_var("DROVER_AGENT_PORT", "seventy");
    let port = agent_port();
    std::env::remove_var("DROVER_AGENT_PORT");

    match port {
        Err(LifecycleError::InvalidEnv { var, value }) => {
            assert_eq!(var, "DROVER_AGENT_PORT");
            assert_eq!(value, "seventy");
        }
        other => panic!("expected InvalidEnv, got {:?}", other),
    }
}

#[test]
#[serial]
fn bad_timeout_falls_back_to_default() {
    std::env::set_var("DROVER_CONNECT_TIMEOUT_MS", "soon");
    let timeout = connect_timeout();
    std::env::remove_var("DROVER_CONNECT_TIMEOUT_MS");

    assert_eq!(timeout, Duration::from_secs(5));
}

#[test]
#[serial]
fn handshake_timeout_reads_millis() {
    std::env::set_var("DROVER_HANDSHAKE_TIMEOUT_MS", "250");
    let timeout = handshake_timeout();
    std::env::remove_var("DROVER_HANDSHAKE_TIMEOUT_MS");

    assert_eq!(timeout, Duration::from_millis(250));
}

#[parameterized(
    unset = { None, true },
    one = { Some("1"), true },
    zero = { Some("0"), false },
    false_upper = { Some("FALSE"), false },
    off = { Some(" off "), false },
    anything_else = { Some("maybe"), true },
)]
#[serial]
fn use_console_values(value: Option<&str>, expected: bool) {
    match value {
        Some(value) => std::env::set_var("DROVER_USE_CONSOLE", value),
        None => std::env::remove_var("DROVER_USE_CONSOLE"),
    }
    let enabled = use_console();
    std::env::remove_var("DROVER_USE_CONSOLE");

    assert_eq!(enabled, expected);
}

#[test]
#[serial]
fn empty_host_falls_back_to_loopback() {
    std::env::set_var("DROVER_CONSOLE_HOST", "");
    let host = console_host();
    std::env::remove_var("DROVER_CONSOLE_HOST");

    assert_eq!(host, "127.0.0.1");
}

#[test]
#[serial]
fn console_listens_on_every_interface_by_default() {
    std::env::remove_var("DROVER_CONSOLE_BIND");
    assert_eq!(console_bind(), "0.0.0.0");

    std::env::set_var("DROVER_CONSOLE_BIND", "10.0.0.5");
    let bind = console_bind();
    std::env::remove_var("DROVER_CONSOLE_BIND");
    assert_eq!(bind, "10.0.0.5");
}

#[test]
#[serial]
fn log_dir_unset_or_empty_is_none() {
    std::env::set_var("DROVER_LOG_DIR", "");
    assert_eq!(log_dir(), None);
    std::env::remove_var("DROVER_LOG_DIR");
    assert_eq!(log_dir(), None);
}
