//! Setting keys understood by the integration and their installed defaults.

pub const DOMAIN_NAME: &str = "fastly.domain_name";
pub const APPLICATION_ID: &str = "fastly.application_id";
pub const API_KEY: &str = "fastly.api_key";
pub const MAX_AGE: &str = "fastly.max_age";
pub const PURGE_ON_PUBLISH: &str = "fastly.purge_on_publish";
pub const STALE_WHILE_REVALIDATE: &str = "fastly.stale_while_revalidate";
pub const STALE_IF_ERROR: &str = "fastly.stale_if_error";
pub const DISABLE_SESSION_AFFINITY: &str = "fastly.disable_session_affinity";
pub const API_DELAY_MS: &str = "fastly.api_delay_ms";

/// Table every key lives under in the settings file.
pub const SECTION: &str = "fastly";

pub const DEFAULT_DOMAIN_NAME: &str = "www.example.com";
pub const DEFAULT_APPLICATION_ID: &str = " ";
pub const DEFAULT_API_KEY: &str = " ";
pub const DEFAULT_MAX_AGE: &str = "3600";
pub const DEFAULT_PURGE_ON_PUBLISH: &str = "true";
pub const DEFAULT_STALE_WHILE_REVALIDATE: &str = "30";
pub const DEFAULT_STALE_IF_ERROR: &str = "86400";
pub const DEFAULT_DISABLE_SESSION_AFFINITY: &str = "true";
/// Value written by the installer.
pub const DEFAULT_API_DELAY_MS: &str = "10000";

/// Delay applied when the configured value is missing, malformed or negative.
/// Deliberately distinct from [`DEFAULT_API_DELAY_MS`].
pub const API_DELAY_FALLBACK_MS: u64 = 5000;

/// Every key paired with the value the installer writes when it is absent.
pub const INSTALLED_DEFAULTS: [(&str, &str); 9] = [
    (DOMAIN_NAME, DEFAULT_DOMAIN_NAME),
    (APPLICATION_ID, DEFAULT_APPLICATION_ID),
    (API_KEY, DEFAULT_API_KEY),
    (MAX_AGE, DEFAULT_MAX_AGE),
    (PURGE_ON_PUBLISH, DEFAULT_PURGE_ON_PUBLISH),
    (STALE_WHILE_REVALIDATE, DEFAULT_STALE_WHILE_REVALIDATE),
    (STALE_IF_ERROR, DEFAULT_STALE_IF_ERROR),
    (DISABLE_SESSION_AFFINITY, DEFAULT_DISABLE_SESSION_AFFINITY),
    (API_DELAY_MS, DEFAULT_API_DELAY_MS),
];

/// Field name of a key inside [`SECTION`].
pub fn field_name(key: &str) -> &str {
    key.strip_prefix(SECTION)
        .and_then(|rest| rest.strip_prefix('.'))
        .unwrap_or(key)
}
