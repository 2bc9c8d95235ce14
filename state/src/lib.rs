//! SafeLiza State Module
//!
//! Plain data for SafeLiza smart sessions: the operator's policy form, the
//! compiled session descriptors sent to the session backend, and the records
//! the backend returns. Nothing in this crate performs I/O.

pub mod address;
pub mod error;
pub mod policy;
pub mod records;
pub mod session;
pub mod time;
pub mod units;

pub use address::{Address, OperationHash, Selector};
pub use error::{Result, StateError};
pub use policy::{
    Policy, PolicyConfig, SessionAuthority, SpendingLimitsForm, SudoForm, TimeFrameForm,
    TokenPolicy, UniversalActionForm, ValueLimitForm,
};
pub use records::{
    AccountRef, ChainSafes, EndpointState, InstalledModules, PendingKind, PendingSession,
    PreparedUserOperation, Receipt, SafeSummary, SessionConfigRecord, SessionConfigured,
    SessionCreationReceipt, UserOperationCall, UserOperationReceipt, UserProfile,
};
pub use session::{
    ActionDescriptor, CompiledSession, PolicyDescriptor, PolicyKind, PolicyParams,
    SessionConfigDto, TokenLimitParams, TOKEN_ACTION_SELECTORS,
};
pub use units::{BaseUnits, DecimalAmount, NATIVE_DECIMALS};
