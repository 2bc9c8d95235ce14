// Session backend routes, relative to the configured base URL.
pub const PASSKEY_CHALLENGE_PATH: &str = "/auth/passkey/challenge";
pub const PASSKEY_VERIFY_PATH: &str = "/auth/passkey/verify";
pub const CURRENT_USER_PATH: &str = "/auth/user";
pub const LOGOUT_PATH: &str = "/auth/logout";
pub const INSTALLED_MODULES_PATH: &str = "/safe/installed-modules";
pub const CONFIGURE_SMART_SESSION_PATH: &str = "/safe/configure-smart-session";
pub const SIGN_SESSION_CREATION_PATH: &str = "/safe/sign-session-creation";
pub const CREATE_USER_OPERATION_PATH: &str = "/safe/create-safe-passkey-user-operation";
pub const EXECUTE_USER_OPERATION_PATH: &str = "/safe/execute-signed-passkey-user-operation";
pub const SESSION_DETAILS_PATH: &str = "/safe/get-session-details";
pub const ACTIVATE_ENDPOINT_PATH: &str = "/safe/activate-endpoint";

pub const BACKEND_URL_ENV: &str = "SAFELIZA_BACKEND_URL";
pub const REQUEST_TIMEOUT_ENV: &str = "SAFELIZA_REQUEST_TIMEOUT_MS";
pub const CONNECT_TIMEOUT_ENV: &str = "SAFELIZA_CONNECT_TIMEOUT_MS";

pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;
