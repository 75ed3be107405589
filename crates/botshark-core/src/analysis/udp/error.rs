use thiserror::Error;

/// Errors returned while extracting a UDP datagram from a frame.
///
/// These never abort an analysis; the frame is simply not dissected.
#[derive(Debug, Error)]
pub enum UdpError {
    #[error("packet slice error: {0}")]
    Slice(String),
    #[error("missing network layer in packet")]
    MissingNetworkLayer,
    #[error("missing IP payload in packet")]
    MissingIpPayload,
    #[error("datagram too short: need {needed} bytes, got {actual}")]
    TooShort { needed: usize, actual: usize },
}
