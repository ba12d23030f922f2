// tests/integration/dispatcher_test.rs

//! Integration tests for the dispatcher's allow-list, routing and delivery.

use super::test_helpers::{RecordingGateway, TestContext};
use chatrelay::core::handler::{HandlerRegistry, LoginHandler};
use chatrelay::core::handler::dispatcher::send_server_notice;
use chatrelay::core::protocol::MessageType;
use chatrelay::core::protocol::payloads::{ErrorResponse, ServerNotice};
use chatrelay::core::ChatError;

#[tokio::test]
async fn test_server_only_type_is_a_protocol_violation() {
    let mut ctx = TestContext::new();
    ctx.login(1, "bob").await;

    for msg_type in [
        MessageType::ServerNotice,
        MessageType::UserLoginResponse,
        MessageType::UserJoinNotice,
        MessageType::ErrorResponse,
        MessageType::FileRequest,
    ] {
        ctx.gateway.clear();
        ctx.send_raw(1, msg_type.code(), &b"{}"[..]).await;

        let error = ctx.only_error_for(1);
        assert_eq!(error.error_code, "PROTOCOL_VIOLATION", "{msg_type}");
        assert!(ctx.gateway.broadcasts().is_empty());
    }
    assert!(ctx.dispatcher.sessions().is_authenticated(1));
}

#[tokio::test]
async fn test_unknown_code_is_rejected() {
    let mut ctx = TestContext::new();
    ctx.connect(1);

    ctx.send_raw(1, 77, &b"{}"[..]).await;

    let error = ctx.only_error_for(1);
    assert_eq!(error.error_code, "UNKNOWN_MESSAGE_TYPE");
    assert!(error.message.contains("77"));
}

#[tokio::test]
async fn test_missing_handler_drops_message() {
    let registry = HandlerRegistry::builder()
        .register(LoginHandler)
        .unwrap()
        .build();
    let mut ctx = TestContext::with_registry(registry);
    ctx.login(1, "bob").await;

    ctx.chat(1, "is anyone there?").await;

    assert!(ctx.gateway.all().is_empty());
}

#[tokio::test]
async fn test_errors_go_only_to_sender() {
    let mut ctx = TestContext::new();
    ctx.login(1, "bob").await;
    ctx.connect(2);

    ctx.chat(2, "sneaky").await;

    assert!(ctx.gateway.directs_to(1).is_empty());
    let sent = ctx.gateway.all();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].target, Some(2));
    let error: ErrorResponse = sent[0].json();
    assert_eq!(error.error_code, "AUTH_REQUIRED");
}

#[tokio::test]
async fn test_send_failure_does_not_stop_dispatch() {
    let mut ctx = TestContext::new();
    ctx.connect(1);
    ctx.gateway.mark_unreachable(1);

    ctx.send(
        1,
        MessageType::UserLoginRequest,
        &chatrelay::core::protocol::payloads::LoginRequest {
            nickname: "bob".into(),
        },
    )
    .await;

    assert!(ctx.dispatcher.sessions().is_authenticated(1));
    let broadcasts = ctx.gateway.broadcasts();
    assert_eq!(broadcasts.len(), 1);
    assert_eq!(broadcasts[0].msg_type, MessageType::UserJoinNotice);
}

#[tokio::test]
async fn test_message_before_connect_is_rejected() {
    let mut ctx = TestContext::new();

    ctx.send(
        9,
        MessageType::UserLoginRequest,
        &chatrelay::core::protocol::payloads::LoginRequest {
            nickname: "ghost".into(),
        },
    )
    .await;

    assert_eq!(ctx.only_error_for(9).error_code, "NOT_CONNECTED");
}

#[test]
fn test_send_server_notice_targets() {
    let gateway = RecordingGateway::new();

    send_server_notice(&gateway, None, "maintenance at noon").unwrap();
    send_server_notice(&gateway, Some(4), "just for you").unwrap();

    let sent = gateway.all();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].target, None);
    assert_eq!(sent[0].exclude, None);
    assert_eq!(sent[0].msg_type, MessageType::ServerNotice);
    let notice: ServerNotice = sent[0].json();
    assert_eq!(notice.message, "maintenance at noon");
    assert_eq!(sent[1].target, Some(4));
}

#[test]
fn test_send_server_notice_unknown_target() {
    let gateway = RecordingGateway::new();
    gateway.mark_unreachable(12);

    let err = send_server_notice(&gateway, Some(12), "hello").unwrap_err();
    assert_eq!(err, ChatError::NotConnected(12));
}
