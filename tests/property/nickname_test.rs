// tests/property/nickname_test.rs

//! Property-based tests for nickname validation and uniqueness.

use crate::test_helpers::TestContext;
use chatrelay::core::protocol::MessageType;
use chatrelay::core::protocol::payloads::LoginRequest;
use chatrelay::core::state::{SessionRegistry, is_valid_nickname};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 100,
        max_shrink_iters: 1000,
        ..ProptestConfig::default()
    })]

    #[test]
    fn test_well_formed_nicknames_are_accepted(nickname in "[A-Za-z0-9]{3,15}") {
        prop_assert!(is_valid_nickname(&nickname));

        let mut sessions = SessionRegistry::new();
        sessions.on_connect(1, "127.0.0.1:1");
        prop_assert!(sessions.login(1, &nickname).is_ok());
        prop_assert_eq!(sessions.nickname(1), Some(nickname.as_str()));
    }

    #[test]
    fn test_short_or_long_nicknames_are_rejected(
        nickname in prop_oneof!["[A-Za-z0-9]{0,2}", "[A-Za-z0-9]{16,40}"]
    ) {
        prop_assert!(!is_valid_nickname(&nickname));
    }

    #[test]
    fn test_nicknames_with_other_characters_are_rejected(
        prefix in "[A-Za-z0-9]{1,6}",
        bad in "[^A-Za-z0-9]",
        suffix in "[A-Za-z0-9]{1,6}",
    ) {
        let nickname = format!("{prefix}{bad}{suffix}");
        prop_assert!(!is_valid_nickname(&nickname));
    }

    #[test]
    fn test_a_nickname_has_at_most_one_holder(
        nickname in "[a-z0-9]{3,15}",
        contenders in 2u64..6,
    ) {
        tokio_test::block_on(async {
            let mut ctx = TestContext::new();
            for id in 1..=contenders {
                ctx.connect(id);
                ctx.send(id, MessageType::UserLoginRequest, &LoginRequest {
                    nickname: nickname.clone(),
                }).await;
            }

            let holders = (1..=contenders)
                .filter(|id| ctx.dispatcher.sessions().nickname(*id) == Some(nickname.as_str()))
                .count();
            assert_eq!(holders, 1);
            assert_eq!(ctx.dispatcher.sessions().nickname(1), Some(nickname.as_str()));
        });
    }
}
