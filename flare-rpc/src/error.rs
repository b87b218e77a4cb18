use std::any::Any;
use std::error::Error;
use std::fmt;

use anyerror::AnyError;

use crate::naming::Shape;

/// Invalid build-time configuration. Raised by `build()`, never by a call.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid name `{name}`: {reason}")]
    InvalidName { name: String, reason: &'static str },
    #[error("service `{0}` is bound more than once")]
    DuplicateService(String),
    #[error("method name `{method}` is used twice in service `{service}`")]
    DuplicateMethod { service: String, method: String },
    #[error("method `{method}` of service `{service}` has more than one handler")]
    DuplicateHandler { service: String, method: String },
    #[error("parameter #{index} of `{service}/{method}` has no name")]
    MissingParamName {
        service: String,
        method: String,
        index: usize,
    },
    #[error("parameter `{param}` is declared twice in `{service}/{method}`")]
    DuplicateParam {
        service: String,
        method: String,
        param: String,
    },
    #[error(
        "`{service}/{method}` declares {declared} parameters but its handler takes {actual}"
    )]
    ArityMismatch {
        service: String,
        method: String,
        declared: usize,
        actual: usize,
    },
    #[error("`{service}/{method}` is declared {declared:?} but bound as {actual:?}")]
    ShapeMismatch {
        service: String,
        method: String,
        declared: Shape,
        actual: Shape,
    },
    #[error("method `{method}` of service `{service}` has no handler")]
    UnboundMethod { service: String, method: String },
    #[error("service `{service}` declares no method `{method}`")]
    UnknownMethod { service: String, method: String },
    #[error("method `{method}` of service `{service}` declares no parameter `{param}`")]
    UnknownParam {
        service: String,
        method: String,
        param: String,
    },
    #[error("address `{address}` collides with `{existing}`")]
    RouteCollision { address: String, existing: String },
}

#[derive(
    serde::Serialize, serde::Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash,
)]
pub enum FaultKind {
    /// No service/method behind the address.
    NotFound,
    Deserialization,
    Instantiation,
    /// The bound method returned an error or panicked.
    Invocation,
    Serialization,
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FaultKind::NotFound => "not found",
            FaultKind::Deserialization => "deserialization",
            FaultKind::Instantiation => "instantiation",
            FaultKind::Invocation => "invocation",
            FaultKind::Serialization => "serialization",
        };
        f.write_str(s)
    }
}

/// Error descriptor relayed from the dispatcher to the caller.
///
/// The shape does not depend on whether the failing method was synchronous
/// or returned a future.
#[derive(
    thiserror::Error,
    serde::Serialize,
    serde::Deserialize,
    Clone,
    Debug,
    PartialEq,
    Eq,
)]
#[error("{kind} error ({type_name}): {message}")]
pub struct Fault {
    pub kind: FaultKind,
    pub type_name: String,
    pub message: String,
}

pub const PANIC_TYPE: &str = "panic";

impl Fault {
    pub fn new(
        kind: FaultKind,
        type_name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Fault {
            kind,
            type_name: type_name.into(),
            message: message.into(),
        }
    }

    /// Tag `err` with its Rust type name.
    pub fn of<E: fmt::Display + ?Sized>(kind: FaultKind, err: &E) -> Self {
        Fault::new(kind, std::any::type_name::<E>(), err.to_string())
    }

    pub fn invocation<E: fmt::Display + ?Sized>(err: &E) -> Self {
        Fault::of(FaultKind::Invocation, err)
    }

    pub fn not_found(address: &str) -> Self {
        Fault::new(
            FaultKind::NotFound,
            "address",
            format!("no method bound at '{address}'"),
        )
    }

    pub fn panic(kind: FaultKind, payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "panicked".to_string()
        };
        Fault::new(kind, PANIC_TYPE, message)
    }
}

pub type TransportError = Box<dyn Error + Send + Sync>;

#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("encode error: {0}")]
    Encode(AnyError),
    #[error("decode error: {0}")]
    Decode(AnyError),
    #[error("remote error: {0}")]
    Remote(Fault),
}

impl ClientError {
    /// The remote fault, if the call reached a dispatcher and failed there.
    pub fn fault(&self) -> Option<&Fault> {
        match self {
            ClientError::Remote(f) => Some(f),
            _ => None,
        }
    }
}
