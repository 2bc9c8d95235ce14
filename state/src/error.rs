use thiserror::Error;

/// Errors raised while turning operator input into state values.
///
/// Every variant is a boundary failure: once a value exists it is well formed
/// and the compiler never has to re-check it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    /// Decimal string is not `digits[.digits]`
    #[error("Invalid decimal amount: {0:?}")]
    InvalidDecimal(String),

    /// Decimal carries more fractional digits than the unit allows
    #[error("Amount {amount} has more than {decimals} fractional digits")]
    ExcessPrecision { amount: String, decimals: u8 },

    /// Not a 0x-prefixed 20 byte hex address
    #[error("Invalid address: {0:?}")]
    InvalidAddress(String),

    /// Not a 0x-prefixed 32 byte hex hash
    #[error("Invalid hash: {0:?}")]
    InvalidHash(String),

    /// Not a 0x-prefixed 4 byte hex selector
    #[error("Invalid selector: {0:?}")]
    InvalidSelector(String),

    /// Wall-clock string could not be parsed
    #[error("Invalid timestamp: {0:?}")]
    InvalidTimestamp(String),
}

/// Result type alias for state conversions
pub type Result<T> = std::result::Result<T, StateError>;
