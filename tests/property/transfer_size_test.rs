// tests/property/transfer_size_test.rs

//! Property-based tests for upload size accounting and checksum verification.

use crate::test_helpers::sha256_hex;
use chatrelay::core::ChatError;
use chatrelay::core::state::{FileTransferManager, sanitize_filename};
use proptest::prelude::*;
use tempfile::TempDir;

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 50,
        max_shrink_iters: 500,
        ..ProptestConfig::default()
    })]

    #[test]
    fn test_any_chunking_of_a_file_verifies(
        data in proptest::collection::vec(any::<u8>(), 1..4096),
        cut_points in proptest::collection::vec(any::<prop::sample::Index>(), 0..8),
    ) {
        tokio_test::block_on(async {
            let dir = TempDir::new().unwrap();
            let mut transfers = FileTransferManager::new(dir.path());
            transfers.start(1, "blob.bin", data.len() as i64).await.unwrap();

            let mut cuts: Vec<usize> = cut_points.iter().map(|i| i.index(data.len())).collect();
            cuts.push(0);
            cuts.push(data.len());
            cuts.sort_unstable();
            cuts.dedup();
            for window in cuts.windows(2) {
                transfers.append_chunk(1, &data[window[0]..window[1]]).await.unwrap();
            }

            let completed = transfers.finish(1, &sha256_hex(&data)).await.unwrap();
            assert_eq!(completed.size, data.len() as u64);
            assert_eq!(std::fs::read(&completed.path).unwrap(), data);
        });
    }

    #[test]
    fn test_received_bytes_never_exceed_declared_size(
        declared in 1i64..512,
        chunks in proptest::collection::vec(1usize..128, 1..16),
    ) {
        tokio_test::block_on(async {
            let dir = TempDir::new().unwrap();
            let mut transfers = FileTransferManager::new(dir.path());
            transfers.start(1, "sized.bin", declared).await.unwrap();

            for len in chunks {
                match transfers.append_chunk(1, &vec![7u8; len]).await {
                    Ok(total) => assert!(total <= declared as u64),
                    Err(e) => {
                        assert_eq!(e, ChatError::TransferOverflow { declared: declared as u64 });
                        assert!(transfers.session(1).is_none());
                        assert!(!dir.path().join("sized.bin").exists());
                        break;
                    }
                }
            }
        });
    }

    #[test]
    fn test_sanitized_names_have_no_separators(name in ".{0,64}") {
        let sanitized = sanitize_filename(&name);
        prop_assert!(!sanitized.contains('/'));
        prop_assert!(!sanitized.contains('\\'));
        prop_assert!(sanitized != "." && sanitized != "..");
        prop_assert_eq!(sanitized.trim(), sanitized.as_str());
    }
}
