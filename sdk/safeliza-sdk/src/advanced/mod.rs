pub mod authenticator;
pub mod webauthn;
