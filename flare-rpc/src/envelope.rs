use crate::codec::Payload;
use crate::context::Context;
use crate::params::ArgBundle;

/// Body of every call; the address carries the service and method.
#[derive(
    serde::Serialize, serde::Deserialize, Clone, Debug, Default, PartialEq, Eq,
)]
pub struct Request {
    pub context: Context,
    pub args: ArgBundle,
}

/// Outcome of a call. A `Failure` payload always encodes a
/// [`Fault`](crate::Fault).
#[derive(
    serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq, Eq,
)]
pub enum Reply {
    Success(Payload),
    Failure(Payload),
}

impl Reply {
    pub fn is_success(&self) -> bool {
        matches!(self, Reply::Success(_))
    }

    pub fn payload(&self) -> &Payload {
        match self {
            Reply::Success(p) | Reply::Failure(p) => p,
        }
    }

    pub fn into_result(self) -> Result<Payload, Payload> {
        match self {
            Reply::Success(p) => Ok(p),
            Reply::Failure(p) => Err(p),
        }
    }
}
