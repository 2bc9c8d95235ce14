use safeliza_state::time::unix_seconds;
use safeliza_state::{
    ActionDescriptor, CompiledSession, Policy, PolicyConfig, PolicyDescriptor, PolicyKind,
    PolicyParams, SessionAuthority, TokenLimitParams, TokenPolicy, TOKEN_ACTION_SELECTORS,
};
use tracing::debug;

/// Compile the operator's policy form into the backend's session encoding.
///
/// Sudo short-circuits everything else. Otherwise active policies are
/// emitted in canonical order (value limit, spending limits, time frame),
/// and each spending-limited token grants its transfer, transferFrom and
/// balanceOf selectors.
pub fn compile(config: &PolicyConfig) -> CompiledSession {
    if !config.sudo.active && config.time_frame.active && config.time_frame.window().is_none() {
        debug!("time frame active without both bounds, nothing emitted");
    }
    compile_authority(&config.authority())
}

pub fn compile_authority(authority: &SessionAuthority) -> CompiledSession {
    let policies = match authority {
        SessionAuthority::Sudo => {
            debug!("sudo session, skipping restricted policies");
            return SessionBuilder::new().add_policy(PolicyDescriptor::sudo()).build();
        },
        SessionAuthority::Restricted(policies) => policies,
    };

    let mut builder = SessionBuilder::new();
    for policy in policies {
        builder = match policy {
            Policy::ValueLimit { limit_wei } => builder.add_policy(PolicyDescriptor {
                kind: PolicyKind::ValueLimit,
                params: PolicyParams::ValueLimit {
                    limit: limit_wei.clone(),
                },
            }),
            Policy::SpendingLimits(tokens) if tokens.is_empty() => {
                debug!("spending limits active without tokens, nothing emitted");
                builder
            },
            Policy::SpendingLimits(tokens) => builder.add_spending_limits(tokens),
            Policy::TimeFrame {
                valid_after,
                valid_until,
            } => builder.add_policy(PolicyDescriptor {
                kind: PolicyKind::TimeFrame,
                params: PolicyParams::TimeFrame {
                    valid_after: unix_seconds(valid_after),
                    valid_until: unix_seconds(valid_until),
                },
            }),
            Policy::UniversalAction { usage_count } => {
                debug!(usage_count, "universal action is not supported by the backend yet");
                builder
            },
        };
    }
    builder.build()
}

/// Fluent accumulator for a [`CompiledSession`].
#[derive(Default)]
struct SessionBuilder {
    policies: Vec<PolicyDescriptor>,
    actions: Vec<ActionDescriptor>,
}

impl SessionBuilder {
    fn new() -> Self {
        Self::default()
    }

    fn add_policy(mut self, descriptor: PolicyDescriptor) -> Self {
        self.policies.push(descriptor);
        self
    }

    fn add_spending_limits(mut self, tokens: &[TokenPolicy]) -> Self {
        let params = tokens
            .iter()
            .map(|token| TokenLimitParams {
                token: *token.token_address(),
                limit: token.limit_base_units().clone(),
            })
            .collect();
        self.policies.push(PolicyDescriptor {
            kind: PolicyKind::SpendingLimits,
            params: PolicyParams::SpendingLimits(params),
        });

        for token in tokens {
            self.actions
                .extend(TOKEN_ACTION_SELECTORS.iter().map(|selector| ActionDescriptor {
                    action_target: *token.token_address(),
                    action_target_selector: *selector,
                }));
        }
        self
    }

    fn build(self) -> CompiledSession {
        CompiledSession {
            policies: self.policies,
            actions: self.actions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use safeliza_state::time::parse_wall_clock;
    use safeliza_state::{SessionConfigDto, TimeFrameForm, ValueLimitForm};
    use serde_json::json;

    const USDC: &str = "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48";

    fn usdc(limit: &str) -> TokenPolicy {
        TokenPolicy::new(USDC.parse().unwrap(), "USDC", "USD Coin", 6, limit.parse().unwrap())
            .unwrap()
    }

    #[test]
    fn sudo_overrides_everything() {
        let mut config = PolicyConfig::default();
        config.sudo.active = true;
        config.value_limit = ValueLimitForm::new(true, "1".parse().unwrap()).unwrap();
        config.spending_limits.active = true;
        config.spending_limits.upsert_token(usdc("10"));

        let compiled = compile(&config);
        assert!(compiled.is_sudo());
        assert!(compiled.actions.is_empty());
    }

    #[test]
    fn value_limit_only() {
        let mut config = PolicyConfig::default();
        config.value_limit = ValueLimitForm::new(true, "0.1".parse().unwrap()).unwrap();

        let compiled = compile(&config);
        assert_eq!(
            serde_json::to_value(&compiled.policies).unwrap(),
            json!([{ "policy": "valueLimit", "params": { "limit": "100000000000000000" } }])
        );
        assert!(compiled.actions.is_empty());
    }

    #[test]
    fn spending_limit_scales_and_grants_selectors() {
        let mut config = PolicyConfig::default();
        config.spending_limits.active = true;
        config.spending_limits.upsert_token(usdc("1.5"));

        let compiled = compile(&config);
        assert_eq!(
            serde_json::to_value(&compiled).unwrap(),
            json!({
                "policies": [{
                    "policy": "spendingLimits",
                    "params": [{ "token": USDC, "limit": "1500000" }]
                }],
                "actions": [
                    { "actionTarget": USDC, "actionTargetSelector": "0xa9059cbb" },
                    { "actionTarget": USDC, "actionTargetSelector": "0x23b872dd" },
                    { "actionTarget": USDC, "actionTargetSelector": "0x70a08231" }
                ]
            })
        );
    }

    #[test]
    fn canonical_order_and_time_frame_seconds() {
        let mut config = PolicyConfig::default();
        config.time_frame = TimeFrameForm::between(
            parse_wall_clock("2024-01-01T00:00:00Z").unwrap(),
            parse_wall_clock("2024-01-02T00:00:00Z").unwrap(),
        );
        config.spending_limits.active = true;
        config.spending_limits.upsert_token(usdc("5"));
        config.value_limit = ValueLimitForm::new(true, "2".parse().unwrap()).unwrap();
        config.universal_action.active = true;

        let compiled = compile(&config);
        let kinds: Vec<_> = compiled.policies.iter().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            vec![PolicyKind::ValueLimit, PolicyKind::SpendingLimits, PolicyKind::TimeFrame]
        );
        assert_eq!(
            compiled.policies[2].params,
            PolicyParams::TimeFrame {
                valid_after: 1704067200,
                valid_until: 1704153600
            }
        );
    }

    #[test]
    fn active_but_empty_policies_are_dropped() {
        let mut config = PolicyConfig::default();
        config.spending_limits.active = true;
        config.universal_action.active = true;
        config.time_frame.active = true;
        config.time_frame.start_time = parse_wall_clock("2024-01-01T00:00:00Z").ok();
        assert_eq!(compile(&config), CompiledSession::default());
    }

    #[test]
    fn inactive_forms_keep_their_values_out() {
        let mut config = PolicyConfig::default();
        config.spending_limits.upsert_token(usdc("3"));
        config.value_limit = ValueLimitForm::new(false, "9".parse().unwrap()).unwrap();
        assert_eq!(compile(&config), CompiledSession::default());
    }

    #[test]
    fn dto_puts_policies_under_user_op() {
        let mut config = PolicyConfig::default();
        config.sudo.active = true;
        let dto = SessionConfigDto::from(compile(&config));
        assert_eq!(
            serde_json::to_value(dto).unwrap(),
            json!({
                "userOpPolicies": [{ "policy": "sudo", "params": null }],
                "erc7739Policies": [],
                "actions": []
            })
        );
    }
}
