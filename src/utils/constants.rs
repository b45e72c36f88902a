//! Shared constants and invariants

pub const DEFAULT_API_URL: &str = "http://localhost:3001";
pub const API_PREFIX: &str = "/api/v1";
pub const API_URL_ENV: &str = "DEPLOYAJA_API_URL";

pub const CONFIG_DIR: &str = ".deployaja";
pub const CONFIG_FILE: &str = "config.yaml";
pub const TOKEN_FILE: &str = "token";
pub const DEPLOY_FILE: &str = "deployaja.yaml";

pub const DEFAULT_REFRESH_BUFFER_SECS: u64 = 300;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

pub const REFRESH_ENDPOINT: &str = "auth/refresh";

// Event stream
pub const ENTRY_CHANNEL_CAPACITY: usize = 100;
pub const ERROR_CHANNEL_CAPACITY: usize = 1;
pub const SSE_DATA_PREFIX: &str = "data: ";
pub const SSE_DONE_SENTINEL: &str = "[DONE]";
