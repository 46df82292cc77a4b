//! HTTP client construction for the external search services.

use crate::error::Result;
use std::time::Duration;

/// Default timeout for index and encoder requests.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Create an HTTP client with a custom timeout.
///
/// Every request made through the client fails instead of hanging once the
/// timeout elapses.
pub fn create_client_with_timeout(timeout: Duration) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(5)))
        .build()?;
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builds() {
        assert!(create_client_with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS)).is_ok());
        assert!(create_client_with_timeout(Duration::from_millis(500)).is_ok());
    }
}
