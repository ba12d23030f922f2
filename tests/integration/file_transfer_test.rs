// tests/integration/file_transfer_test.rs

//! Integration tests for the upload flow: FileInfo, FileChunk, FileEnd.

use super::test_helpers::{TestContext, sha256_hex};
use chatrelay::core::protocol::MessageType;
use chatrelay::core::protocol::payloads::{FileStatusNotice, ServerNotice, TransferStatus};

#[tokio::test]
async fn test_upload_completes_with_matching_checksum() {
    let mut ctx = TestContext::new();
    ctx.login(1, "bob").await;

    ctx.file_start(1, "a.txt", 5).await;

    let start_reply = &ctx.gateway.directs_to(1)[0];
    assert_eq!(start_reply.msg_type, MessageType::ServerNotice);
    let started = &ctx.gateway.broadcasts()[0];
    assert_eq!(started.msg_type, MessageType::FileInfo);
    let notice: FileStatusNotice = started.json();
    assert_eq!(notice.filename, "a.txt");
    assert_eq!(notice.status, TransferStatus::Started);
    ctx.gateway.clear();

    ctx.file_chunk(1, b"hel").await;
    ctx.file_chunk(1, b"lo").await;
    assert!(ctx.gateway.all().is_empty(), "chunks produce no messages");
    assert_eq!(ctx.dispatcher.transfers().session(1).unwrap().bytes_received, 5);

    ctx.file_end(1, "a.txt", &sha256_hex(b"hello")).await;

    let directs = ctx.gateway.directs_to(1);
    assert_eq!(directs.len(), 1);
    assert_eq!(directs[0].msg_type, MessageType::FileEnd);
    let completed: FileStatusNotice = directs[0].json();
    assert_eq!(completed.status, TransferStatus::Completed);
    assert_eq!(completed.nickname, "bob");
    assert_eq!(completed.filename, "a.txt");

    let broadcasts = ctx.gateway.broadcasts();
    assert_eq!(broadcasts.len(), 1);
    assert_eq!(broadcasts[0].msg_type, MessageType::ServerNotice);
    assert_eq!(broadcasts[0].exclude, Some(1));
    let shared: ServerNotice = broadcasts[0].json();
    assert!(shared.message.contains("bob"));
    assert!(shared.message.contains("a.txt"));

    let stored = ctx.upload_dir.path().join("a.txt");
    assert_eq!(std::fs::read(stored).unwrap(), b"hello");
    assert_eq!(ctx.dispatcher.transfers().active_count(), 0);
}

#[tokio::test]
async fn test_uppercase_checksum_is_accepted() {
    let mut ctx = TestContext::new();
    ctx.login(1, "bob").await;
    ctx.file_start(1, "b.bin", 3).await;
    ctx.file_chunk(1, b"abc").await;
    ctx.gateway.clear();

    ctx.file_end(1, "b.bin", &sha256_hex(b"abc").to_uppercase()).await;

    let completed: FileStatusNotice = ctx.gateway.directs_to(1)[0].json();
    assert_eq!(completed.status, TransferStatus::Completed);
}

#[tokio::test]
async fn test_checksum_mismatch_discards_file() {
    let mut ctx = TestContext::new();
    ctx.login(1, "bob").await;
    ctx.file_start(1, "a.txt", 5).await;
    ctx.file_chunk(1, b"hello").await;
    ctx.gateway.clear();

    ctx.file_end(1, "a.txt", &sha256_hex(b"jello")).await;

    let error = ctx.only_error_for(1);
    assert_eq!(error.error_code, "CHECKSUM_MISMATCH");

    let broadcasts = ctx.gateway.broadcasts();
    assert_eq!(broadcasts.len(), 1);
    assert_eq!(broadcasts[0].msg_type, MessageType::ErrorResponse);
    let failed: FileStatusNotice = broadcasts[0].json();
    assert_eq!(failed.status, TransferStatus::Failed);
    assert_eq!(failed.filename, "a.txt");

    assert!(!ctx.upload_dir.path().join("a.txt").exists());
    assert!(ctx.dispatcher.transfers().session(1).is_none());
}

#[tokio::test]
async fn test_overflowing_chunk_cancels_transfer() {
    let mut ctx = TestContext::new();
    ctx.login(1, "bob").await;
    ctx.file_start(1, "small.txt", 4).await;
    ctx.gateway.clear();

    ctx.file_chunk(1, b"12345").await;

    assert_eq!(ctx.only_error_for(1).error_code, "TRANSFER_OVERFLOW");
    assert!(ctx.dispatcher.transfers().session(1).is_none());
    assert!(!ctx.upload_dir.path().join("small.txt").exists());
}

#[tokio::test]
async fn test_incomplete_transfer_is_reported() {
    let mut ctx = TestContext::new();
    ctx.login(1, "bob").await;
    ctx.file_start(1, "part.txt", 10).await;
    ctx.file_chunk(1, b"1234").await;
    ctx.gateway.clear();

    ctx.file_end(1, "part.txt", &sha256_hex(b"1234")).await;

    assert_eq!(ctx.only_error_for(1).error_code, "INCOMPLETE_TRANSFER");
    let failed: FileStatusNotice = ctx.gateway.broadcasts()[0].json();
    assert_eq!(failed.status, TransferStatus::Failed);
    assert!(!ctx.upload_dir.path().join("part.txt").exists());
}

#[tokio::test]
async fn test_chunk_without_transfer() {
    let mut ctx = TestContext::new();
    ctx.login(1, "bob").await;

    ctx.file_chunk(1, b"stray").await;

    assert_eq!(ctx.only_error_for(1).error_code, "NO_ACTIVE_TRANSFER");
}

#[tokio::test]
async fn test_end_without_transfer() {
    let mut ctx = TestContext::new();
    ctx.login(1, "bob").await;

    ctx.file_end(1, "ghost.txt", "00").await;

    assert_eq!(ctx.only_error_for(1).error_code, "NO_ACTIVE_TRANSFER");
    assert!(ctx.gateway.broadcasts().is_empty());
}

#[tokio::test]
async fn test_invalid_file_metadata() {
    let mut ctx = TestContext::new();
    ctx.login(1, "bob").await;

    for (filename, size) in [("", 10), ("  ", 10), ("ok.txt", 0), ("ok.txt", -5), ("..", 3)] {
        ctx.gateway.clear();
        ctx.file_start(1, filename, size).await;
        assert_eq!(
            ctx.only_error_for(1).error_code,
            "INVALID_FILE_INFO",
            "filename {filename:?} size {size}"
        );
        assert!(ctx.gateway.broadcasts().is_empty());
    }
    assert_eq!(ctx.dispatcher.transfers().active_count(), 0);
}

#[tokio::test]
async fn test_file_start_requires_login() {
    let mut ctx = TestContext::new();
    ctx.connect(1);

    ctx.file_start(1, "a.txt", 5).await;

    assert_eq!(ctx.only_error_for(1).error_code, "AUTH_REQUIRED");
    assert_eq!(ctx.dispatcher.transfers().active_count(), 0);
}

#[tokio::test]
async fn test_path_components_are_stripped() {
    let mut ctx = TestContext::new();
    ctx.login(1, "bob").await;

    ctx.file_start(1, "../../etc/passwd", 2).await;
    ctx.file_chunk(1, b"ok").await;
    ctx.file_end(1, "../../etc/passwd", &sha256_hex(b"ok")).await;

    assert!(ctx.upload_dir.path().join("passwd").exists());
    let completed: FileStatusNotice = ctx
        .gateway
        .directs_to(1)
        .into_iter()
        .find(|s| s.msg_type == MessageType::FileEnd)
        .unwrap()
        .json();
    assert_eq!(completed.filename, "passwd");
}

#[tokio::test]
async fn test_new_transfer_supersedes_old_one() {
    let mut ctx = TestContext::new();
    ctx.login(1, "bob").await;
    ctx.file_start(1, "first.txt", 10).await;
    ctx.file_chunk(1, b"abc").await;

    ctx.file_start(1, "second.txt", 3).await;

    assert!(!ctx.upload_dir.path().join(".1-first.txt.part").exists());
    let session = ctx.dispatcher.transfers().session(1).unwrap();
    assert_eq!(session.filename, "second.txt");
    assert_eq!(session.bytes_received, 0);
}

#[tokio::test]
async fn test_disconnect_cancels_transfer() {
    let mut ctx = TestContext::new();
    ctx.login(1, "bob").await;
    ctx.file_start(1, "a.txt", 5).await;
    ctx.file_chunk(1, b"he").await;

    ctx.dispatcher.on_disconnected(1).await;

    assert_eq!(ctx.dispatcher.transfers().active_count(), 0);
    assert!(std::fs::read_dir(ctx.upload_dir.path()).unwrap().next().is_none());
}

#[tokio::test]
async fn test_transfers_are_per_connection() {
    let mut ctx = TestContext::new();
    ctx.login(1, "bob").await;
    ctx.login(2, "alice").await;

    ctx.file_start(1, "one.txt", 3).await;
    ctx.file_start(2, "two.txt", 3).await;
    ctx.file_chunk(1, b"111").await;
    ctx.file_chunk(2, b"222").await;
    ctx.gateway.clear();

    ctx.file_end(2, "two.txt", &sha256_hex(b"222")).await;
    ctx.file_end(1, "one.txt", &sha256_hex(b"111")).await;

    assert_eq!(std::fs::read(ctx.upload_dir.path().join("one.txt")).unwrap(), b"111");
    assert_eq!(std::fs::read(ctx.upload_dir.path().join("two.txt")).unwrap(), b"222");
    assert!(ctx.gateway.directs().iter().all(|s| s.msg_type == MessageType::FileEnd));
}

#[tokio::test]
async fn test_same_filename_from_two_connections() {
    let mut ctx = TestContext::new();
    ctx.login(1, "bob").await;
    ctx.login(2, "alice").await;

    ctx.file_start(1, "a.txt", 5).await;
    ctx.file_chunk(1, b"hello").await;
    ctx.file_start(2, "a.txt", 100).await;
    ctx.file_chunk(2, b"partial").await;
    ctx.dispatcher.on_disconnected(2).await;
    ctx.gateway.clear();

    ctx.file_end(1, "a.txt", &sha256_hex(b"hello")).await;

    let completed: FileStatusNotice = ctx
        .gateway
        .directs_to(1)
        .iter()
        .find(|s| s.msg_type == MessageType::FileEnd)
        .unwrap()
        .json();
    assert_eq!(completed.status, TransferStatus::Completed);
    assert_eq!(
        std::fs::read(ctx.upload_dir.path().join("a.txt")).unwrap(),
        b"hello"
    );
    assert_eq!(ctx.dispatcher.transfers().active_count(), 0);
}
