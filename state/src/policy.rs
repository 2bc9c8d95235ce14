//! Operator-editable policy form and the authority it describes.
//!
//! `PolicyConfig` mirrors the editing form one-to-one (every policy carries
//! its own `active` flag). `SessionAuthority` is what the form means once
//! the flags are resolved: sudo and restricted policies can never coexist.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::error::Result;
use crate::units::{BaseUnits, DecimalAmount, NATIVE_DECIMALS};

/// Unrestricted access toggle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SudoForm {
    pub active: bool,
}

/// Per-token spending cap.
///
/// The base-unit limit is computed when the entry is built, so an entry that
/// exists is always scalable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTokenPolicy", into = "RawTokenPolicy")]
pub struct TokenPolicy {
    token_address: Address,
    token_symbol: String,
    token_name: String,
    token_decimals: u8,
    limit: DecimalAmount,
    limit_base_units: BaseUnits,
}

impl TokenPolicy {
    pub fn new(
        token_address: Address,
        token_symbol: impl Into<String>,
        token_name: impl Into<String>,
        token_decimals: u8,
        limit: DecimalAmount,
    ) -> Result<Self> {
        let limit_base_units = limit.to_base_units(token_decimals)?;
        Ok(Self {
            token_address,
            token_symbol: token_symbol.into(),
            token_name: token_name.into(),
            token_decimals,
            limit,
            limit_base_units,
        })
    }

    pub fn token_address(&self) -> &Address {
        &self.token_address
    }

    pub fn token_symbol(&self) -> &str {
        &self.token_symbol
    }

    pub fn token_name(&self) -> &str {
        &self.token_name
    }

    pub fn token_decimals(&self) -> u8 {
        self.token_decimals
    }

    pub fn limit(&self) -> &DecimalAmount {
        &self.limit
    }

    /// Limit scaled by `token_decimals`.
    pub fn limit_base_units(&self) -> &BaseUnits {
        &self.limit_base_units
    }

    pub fn set_limit(&mut self, limit: DecimalAmount) -> Result<()> {
        self.limit_base_units = limit.to_base_units(self.token_decimals)?;
        self.limit = limit;
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTokenPolicy {
    token_address: Address,
    #[serde(default)]
    token_symbol: String,
    #[serde(default)]
    token_name: String,
    #[serde(with = "decimals_as_string")]
    token_decimals: u8,
    limit: DecimalAmount,
}

impl TryFrom<RawTokenPolicy> for TokenPolicy {
    type Error = crate::error::StateError;

    fn try_from(raw: RawTokenPolicy) -> Result<Self> {
        TokenPolicy::new(
            raw.token_address,
            raw.token_symbol,
            raw.token_name,
            raw.token_decimals,
            raw.limit,
        )
    }
}

impl From<TokenPolicy> for RawTokenPolicy {
    fn from(policy: TokenPolicy) -> Self {
        Self {
            token_address: policy.token_address,
            token_symbol: policy.token_symbol,
            token_name: policy.token_name,
            token_decimals: policy.token_decimals,
            limit: policy.limit,
        }
    }
}

/// Token pickers report decimals as a string; accept both shapes.
mod decimals_as_string {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(decimals: &u8, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(decimals)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::String(s) => s.trim().parse().map_err(serde::de::Error::custom),
            serde_json::Value::Number(n) => n
                .as_u64()
                .and_then(|n| u8::try_from(n).ok())
                .ok_or_else(|| serde::de::Error::custom("token decimals out of range")),
            other => Err(serde::de::Error::custom(format!(
                "expected token decimals, found {}",
                other
            ))),
        }
    }
}

/// Spending caps keyed by token address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpendingLimitsForm {
    pub active: bool,
    #[serde(default, deserialize_with = "dedup_tokens")]
    token_policies: Vec<TokenPolicy>,
}

impl SpendingLimitsForm {
    pub fn token_policies(&self) -> &[TokenPolicy] {
        &self.token_policies
    }

    /// Insert or replace the entry for `policy.token_address()`.
    ///
    /// A replaced entry keeps its position.
    pub fn upsert_token(&mut self, policy: TokenPolicy) {
        match self
            .token_policies
            .iter_mut()
            .find(|p| p.token_address == policy.token_address)
        {
            Some(existing) => *existing = policy,
            None => self.token_policies.push(policy),
        }
    }

    pub fn remove_token(&mut self, token: &Address) -> Option<TokenPolicy> {
        let idx = self
            .token_policies
            .iter()
            .position(|p| &p.token_address == token)?;
        Some(self.token_policies.remove(idx))
    }
}

fn dedup_tokens<'de, D: serde::Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Vec<TokenPolicy>, D::Error> {
    let raw = Vec::<TokenPolicy>::deserialize(deserializer)?;
    let mut form = SpendingLimitsForm::default();
    for policy in raw {
        form.upsert_token(policy);
    }
    Ok(form.token_policies)
}

/// Validity window. Either bound may still be blank while the operator is
/// filling in the form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeFrameForm {
    pub active: bool,
    #[serde(default, with = "crate::time")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, with = "crate::time")]
    pub end_time: Option<DateTime<Utc>>,
}

impl TimeFrameForm {
    /// An active window from `start` to `end`.
    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            active: true,
            start_time: Some(start),
            end_time: Some(end),
        }
    }

    /// Both bounds, once both are filled in.
    pub fn window(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        self.start_time.zip(self.end_time)
    }
}

/// Usage-count policy. Exposed in the form but not yet compiled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UniversalActionForm {
    pub active: bool,
    #[serde(default)]
    pub usage_count: u64,
}

/// Native-currency ceiling, stored with its wei value.
///
/// Precision is only enforced while the limit is active: an inactive form
/// keeps whatever was typed, and activating it validates the amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawValueLimit", into = "RawValueLimit")]
pub struct ValueLimitForm {
    active: bool,
    value_limit: DecimalAmount,
    // Always `Some` while active
    value_limit_wei: Option<BaseUnits>,
}

impl ValueLimitForm {
    pub fn new(active: bool, value_limit: DecimalAmount) -> Result<Self> {
        let value_limit_wei = scale_value_limit(active, &value_limit)?;
        Ok(Self {
            active,
            value_limit,
            value_limit_wei,
        })
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) -> Result<()> {
        scale_value_limit(active, &self.value_limit)?;
        self.active = active;
        Ok(())
    }

    pub fn value_limit(&self) -> &DecimalAmount {
        &self.value_limit
    }

    /// `None` when the typed amount is finer than one wei.
    pub fn value_limit_wei(&self) -> Option<&BaseUnits> {
        self.value_limit_wei.as_ref()
    }

    pub fn set_value_limit(&mut self, value_limit: DecimalAmount) -> Result<()> {
        self.value_limit_wei = scale_value_limit(self.active, &value_limit)?;
        self.value_limit = value_limit;
        Ok(())
    }
}

fn scale_value_limit(active: bool, value_limit: &DecimalAmount) -> Result<Option<BaseUnits>> {
    match value_limit.to_base_units(NATIVE_DECIMALS) {
        Ok(wei) => Ok(Some(wei)),
        Err(e) if active => Err(e),
        Err(_) => Ok(None),
    }
}

impl Default for ValueLimitForm {
    fn default() -> Self {
        Self {
            active: false,
            value_limit: DecimalAmount::zero(),
            value_limit_wei: Some(BaseUnits::default()),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawValueLimit {
    active: bool,
    #[serde(default)]
    value_limit: DecimalAmount,
}

impl TryFrom<RawValueLimit> for ValueLimitForm {
    type Error = crate::error::StateError;

    fn try_from(raw: RawValueLimit) -> Result<Self> {
        ValueLimitForm::new(raw.active, raw.value_limit)
    }
}

impl From<ValueLimitForm> for RawValueLimit {
    fn from(form: ValueLimitForm) -> Self {
        Self {
            active: form.active,
            value_limit: form.value_limit,
        }
    }
}

/// The whole policy form for one account-editing session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyConfig {
    #[serde(default)]
    pub sudo: SudoForm,
    #[serde(default)]
    pub spending_limits: SpendingLimitsForm,
    #[serde(default)]
    pub time_frame: TimeFrameForm,
    #[serde(default)]
    pub universal_action: UniversalActionForm,
    #[serde(default)]
    pub value_limit: ValueLimitForm,
}

impl PolicyConfig {
    /// Resolve the form's flags into the authority it grants.
    ///
    /// Restricted policies come out in canonical order: value limit,
    /// spending limits, time frame, universal action. An active time frame
    /// is left out until both of its bounds are set.
    pub fn authority(&self) -> SessionAuthority {
        if self.sudo.active {
            return SessionAuthority::Sudo;
        }

        let mut policies = Vec::new();
        if let (true, Some(wei)) = (self.value_limit.active, &self.value_limit.value_limit_wei) {
            policies.push(Policy::ValueLimit {
                limit_wei: wei.clone(),
            });
        }
        if self.spending_limits.active {
            policies.push(Policy::SpendingLimits(
                self.spending_limits.token_policies.clone(),
            ));
        }
        // A window with a blank bound contributes nothing.
        if let (true, Some((start, end))) = (self.time_frame.active, self.time_frame.window()) {
            policies.push(Policy::TimeFrame {
                valid_after: start,
                valid_until: end,
            });
        }
        if self.universal_action.active {
            policies.push(Policy::UniversalAction {
                usage_count: self.universal_action.usage_count,
            });
        }
        SessionAuthority::Restricted(policies)
    }
}

/// What a session is allowed to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAuthority {
    /// Unrestricted; no other policy may accompany it
    Sudo,
    /// Bounded by the listed policies, in canonical order
    Restricted(Vec<Policy>),
}

/// A single restriction on a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Policy {
    ValueLimit {
        limit_wei: BaseUnits,
    },
    SpendingLimits(Vec<TokenPolicy>),
    TimeFrame {
        valid_after: DateTime<Utc>,
        valid_until: DateTime<Utc>,
    },
    UniversalAction {
        usage_count: u64,
    },
}
