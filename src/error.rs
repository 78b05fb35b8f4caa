//! Unified error types for the simdeck core.
//!
//! A single `Error` enum that every subsystem can convert into, keeping
//! error handling uniform at the call sites that bridge subsystems.
//! Expected "not found" conditions never surface here — lookups return
//! `Option` and log; only genuine contract violations (bad coercion,
//! exhausted transaction space, dead transport) become errors.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the crate funnels into this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A dataref value could not be coerced or is malformed.
    Value(ValueError),
    /// The framing/dispatch protocol hit a contract violation.
    Protocol(ProtocolError),
    /// A transport channel failed.
    Transport(TransportError),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(e) => write!(f, "value: {e}"),
            Self::Protocol(e) => write!(f, "protocol: {e}"),
            Self::Transport(e) => write!(f, "transport: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Value errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// `value_typed()` was asked to coerce a value into a type it cannot
    /// represent (e.g. a non-numeric string into a float). The caller is
    /// responsible for validating types before requesting coercion.
    Coercion { path: String, want: &'static str },
}

impl fmt::Display for ValueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Coercion { path, want } => {
                write!(f, "{path}: cannot coerce value to {want}")
            }
        }
    }
}

impl std::error::Error for ValueError {}

impl From<ValueError> for Error {
    fn from(e: ValueError) -> Self {
        Self::Value(e)
    }
}

// ---------------------------------------------------------------------------
// Protocol errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    /// All 255 transaction ids are pending; the caller issued more
    /// concurrent tracked requests than the id space allows.
    TransactionSpaceExhausted,
    /// Outbound payload exceeds what the wire format can express.
    PayloadTooLarge(usize),
    /// Framebuffer payload length does not match width × height × 2.
    BadFramebufferLength { expected: usize, got: usize },
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TransactionSpaceExhausted => write!(f, "transaction id space exhausted"),
            Self::PayloadTooLarge(n) => write!(f, "payload too large ({n} bytes)"),
            Self::BadFramebufferLength { expected, got } => {
                write!(f, "framebuffer length {got}, expected {expected}")
            }
        }
    }
}

impl std::error::Error for ProtocolError {}

impl From<ProtocolError> for Error {
    fn from(e: ProtocolError) -> Self {
        Self::Protocol(e)
    }
}

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// The peer closed the connection or it was never established.
    NotConnected,
    /// Underlying I/O error (kind retained, message logged at the source).
    Io(std::io::ErrorKind),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConnected => write!(f, "not connected"),
            Self::Io(kind) => write!(f, "I/O error: {kind:?}"),
        }
    }
}

impl std::error::Error for TransportError {}

impl From<std::io::Error> for TransportError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.kind())
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
