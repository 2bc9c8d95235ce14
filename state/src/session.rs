//! Compiled session descriptors in the session backend's wire format.

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::address::{Address, Selector};
use crate::units::BaseUnits;

/// `transfer(address,uint256)`
pub const TRANSFER_SELECTOR: Selector = Selector::new([0xa9, 0x05, 0x9c, 0xbb]);
/// `transferFrom(address,address,uint256)`
pub const TRANSFER_FROM_SELECTOR: Selector = Selector::new([0x23, 0xb8, 0x72, 0xdd]);
/// `balanceOf(address)`
pub const BALANCE_OF_SELECTOR: Selector = Selector::new([0x70, 0xa0, 0x82, 0x31]);

/// Selectors granted per spending-limited token, in emission order.
pub const TOKEN_ACTION_SELECTORS: [Selector; 3] = [
    TRANSFER_SELECTOR,
    TRANSFER_FROM_SELECTOR,
    BALANCE_OF_SELECTOR,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PolicyKind {
    Sudo,
    SpendingLimits,
    ValueLimit,
    TimeFrame,
    UniversalAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenLimitParams {
    pub token: Address,
    pub limit: BaseUnits,
}

/// Parameters of one descriptor. Serialises untagged; `None` becomes `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PolicyParams {
    None,
    SpendingLimits(Vec<TokenLimitParams>),
    #[serde(rename_all = "camelCase")]
    ValueLimit {
        limit: BaseUnits,
    },
    #[serde(rename_all = "camelCase")]
    TimeFrame {
        valid_after: i64,
        valid_until: i64,
    },
}

/// One entry of the backend's ordered policy list: `{"policy", "params"}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyDescriptor {
    pub kind: PolicyKind,
    pub params: PolicyParams,
}

impl PolicyDescriptor {
    pub fn sudo() -> Self {
        Self {
            kind: PolicyKind::Sudo,
            params: PolicyParams::None,
        }
    }
}

impl Serialize for PolicyDescriptor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("PolicyDescriptor", 2)?;
        state.serialize_field("policy", &self.kind)?;
        state.serialize_field("params", &self.params)?;
        state.end()
    }
}

/// A target contract and function the session may call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionDescriptor {
    pub action_target: Address,
    pub action_target_selector: Selector,
}

/// Output of the policy compiler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompiledSession {
    pub policies: Vec<PolicyDescriptor>,
    pub actions: Vec<ActionDescriptor>,
}

impl CompiledSession {
    pub fn is_sudo(&self) -> bool {
        matches!(self.policies.as_slice(), [p] if p.kind == PolicyKind::Sudo)
    }
}

/// `sessionConfigDto` body of a configure-smart-session request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfigDto {
    pub user_op_policies: Vec<PolicyDescriptor>,
    pub erc7739_policies: Vec<PolicyDescriptor>,
    pub actions: Vec<ActionDescriptor>,
}

impl From<CompiledSession> for SessionConfigDto {
    fn from(session: CompiledSession) -> Self {
        Self {
            user_op_policies: session.policies,
            erc7739_policies: Vec::new(),
            actions: session.actions,
        }
    }
}
