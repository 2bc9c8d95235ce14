//! Property tests for the policy compiler.

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use safeliza_sdk::compile;
use safeliza_state::session::TOKEN_ACTION_SELECTORS;
use safeliza_state::{
    Address, DecimalAmount, PolicyConfig, PolicyKind, TimeFrameForm, TokenPolicy, ValueLimitForm,
};

fn address_strategy() -> impl Strategy<Value = Address> {
    any::<[u8; 20]>().prop_map(Address::new)
}

/// A decimal amount with at most `decimals` fractional digits.
fn amount_strategy(decimals: u8) -> impl Strategy<Value = DecimalAmount> {
    let max_scale = usize::from(decimals.min(8));
    (0u64..1_000_000_000, 0..=max_scale, 0u64..100_000_000).prop_map(|(int, scale, frac)| {
        let text = if scale == 0 {
            int.to_string()
        } else {
            let digits = format!("{:08}", frac);
            format!("{}.{}", int, &digits[..scale])
        };
        text.parse().unwrap()
    })
}

fn token_strategy() -> impl Strategy<Value = TokenPolicy> {
    (address_strategy(), 0u8..=18)
        .prop_flat_map(|(address, decimals)| {
            amount_strategy(decimals).prop_map(move |limit| (address, decimals, limit))
        })
        .prop_map(|(address, decimals, limit)| {
            TokenPolicy::new(address, "TKN", "Token", decimals, limit).unwrap()
        })
}

prop_compose! {
    fn config_strategy()(
        sudo in any::<bool>(),
        spending_active in any::<bool>(),
        tokens in prop::collection::vec(token_strategy(), 0..5),
        value_active in any::<bool>(),
        value in amount_strategy(18),
        time_active in any::<bool>(),
        start in 0i64..4_000_000_000,
        length in 0i64..10_000_000,
        universal in any::<bool>(),
    ) -> PolicyConfig {
        let mut config = PolicyConfig::default();
        config.sudo.active = sudo;
        config.spending_limits.active = spending_active;
        for token in tokens {
            config.spending_limits.upsert_token(token);
        }
        config.value_limit = ValueLimitForm::new(value_active, value).unwrap();
        config.time_frame = TimeFrameForm::between(
            Utc.timestamp_opt(start, 0).unwrap(),
            Utc.timestamp_opt(start + length, 0).unwrap(),
        );
        config.time_frame.active = time_active;
        config.universal_action.active = universal;
        config
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// Sudo always compiles to exactly one sudo descriptor and no actions.
    #[test]
    fn prop_sudo_short_circuits(mut config in config_strategy()) {
        config.sudo.active = true;
        let compiled = compile(&config);
        prop_assert!(compiled.is_sudo());
        prop_assert!(compiled.actions.is_empty());
    }

    /// Three actions per token, in transfer, transferFrom, balanceOf order.
    #[test]
    fn prop_actions_follow_tokens(config in config_strategy()) {
        prop_assume!(!config.sudo.active && config.spending_limits.active);
        let compiled = compile(&config);
        let tokens = config.spending_limits.token_policies();

        prop_assert_eq!(compiled.actions.len(), 3 * tokens.len());
        for (token, chunk) in tokens.iter().zip(compiled.actions.chunks(3)) {
            for (action, selector) in chunk.iter().zip(TOKEN_ACTION_SELECTORS.iter()) {
                prop_assert_eq!(&action.action_target, token.token_address());
                prop_assert_eq!(&action.action_target_selector, selector);
            }
        }
    }

    /// Descriptors appear in canonical order and universal action never does.
    #[test]
    fn prop_canonical_order(config in config_strategy()) {
        prop_assume!(!config.sudo.active);
        let kinds: Vec<PolicyKind> = compile(&config).policies.iter().map(|p| p.kind).collect();

        let mut expected = Vec::new();
        if config.value_limit.is_active() {
            expected.push(PolicyKind::ValueLimit);
        }
        if config.spending_limits.active && !config.spending_limits.token_policies().is_empty() {
            expected.push(PolicyKind::SpendingLimits);
        }
        if config.time_frame.active {
            expected.push(PolicyKind::TimeFrame);
        }
        prop_assert_eq!(kinds, expected);
    }

    /// Compiling twice yields identical output.
    #[test]
    fn prop_compile_is_idempotent(config in config_strategy()) {
        prop_assert_eq!(compile(&config), compile(&config));
    }

    /// Scaled limits divide back to the entered amount.
    #[test]
    fn prop_limits_round_trip(token in token_strategy()) {
        let back = token.limit_base_units().to_decimal(token.token_decimals());
        prop_assert_eq!(&back, token.limit());
    }
}
