/// The current state of an HTTP exchange.
/// This roughly matches net/base/load_states.h, reduced to the phases a
/// raw HTTP/1.1 GET goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    /// The exchange is idle (not started or finished).
    #[default]
    Idle,

    /// Waiting for a pooled socket or dialing a new one.
    Connecting,

    /// Writing the request head.
    SendingRequest,

    /// Waiting for the status line and headers.
    WaitingForResponse,

    /// Reading the response body.
    ReadingResponse,
}
