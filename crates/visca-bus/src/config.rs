use std::time::Duration;

/// Controls bus controller behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusConfig {
    /// Per-byte read timeout for replies.
    pub read_timeout: Duration,
    /// Default wait used by [`BusController::execute`](crate::BusController::execute).
    pub completion_timeout: Duration,
    /// Address handed to the first device during enumeration.
    pub first_address: u8,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_secs(2),
            completion_timeout: Duration::from_secs(10),
            first_address: 1,
        }
    }
}
