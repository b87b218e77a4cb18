use anyerror::AnyError;
use bytes::Bytes;
use serde::{Serialize, de::DeserializeOwned};

/// Encoded bytes tagged with the content type of the codec that made them.
#[derive(
    serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq, Eq,
)]
pub struct Payload {
    pub content_type: String,
    pub bytes: Bytes,
}

impl Payload {
    pub fn new(content_type: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Payload {
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }
}

/// Stateless codec shared by every call of a dispatcher or proxy.
pub trait MsgSerde: Send + Sync + 'static {
    fn content_type(&self) -> &str;

    fn to_bytes<T: Serialize + ?Sized>(&self, value: &T) -> Result<Bytes, AnyError>;

    fn from_bytes<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, AnyError>;

    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Payload, AnyError> {
        Ok(Payload::new(self.content_type(), self.to_bytes(value)?))
    }

    fn decode<T: DeserializeOwned>(&self, payload: &Payload) -> Result<T, AnyError> {
        if payload.content_type != self.content_type() {
            return Err(AnyError::error(format!(
                "unsupported content type '{}', expected '{}'",
                payload.content_type,
                self.content_type()
            )));
        }
        self.from_bytes(&payload.bytes)
    }
}

#[cfg(feature = "bincode")]
pub use self::bincode_serde::BincodeMsgSerde;

#[cfg(feature = "bincode")]
mod bincode_serde {
    use anyerror::AnyError;
    use bytes::Bytes;
    use serde::{Serialize, de::DeserializeOwned};

    use super::MsgSerde;

    #[derive(Clone, Copy, Debug, Default)]
    pub struct BincodeMsgSerde;

    impl BincodeMsgSerde {
        pub const CONTENT_TYPE: &'static str = "application/x-bincode";
        const BINCODE_CONFIG: bincode::config::Configuration =
            bincode::config::standard();
    }

    impl MsgSerde for BincodeMsgSerde {
        fn content_type(&self) -> &str {
            Self::CONTENT_TYPE
        }

        fn to_bytes<T: Serialize + ?Sized>(
            &self,
            value: &T,
        ) -> Result<Bytes, AnyError> {
            let payload =
                bincode::serde::encode_to_vec(value, Self::BINCODE_CONFIG)
                    .map_err(|e| AnyError::new(&e))?;
            Ok(Bytes::from(payload))
        }

        fn from_bytes<T: DeserializeOwned>(
            &self,
            bytes: &[u8],
        ) -> Result<T, AnyError> {
            let (value, _) =
                bincode::serde::decode_from_slice(bytes, Self::BINCODE_CONFIG)
                    .map_err(|e| AnyError::new(&e))?;
            Ok(value)
        }
    }
}

#[cfg(feature = "bitcode")]
pub use self::bitcode_serde::BitcodeMsgSerde;

#[cfg(feature = "bitcode")]
mod bitcode_serde {
    use anyerror::AnyError;
    use bytes::Bytes;
    use serde::{Serialize, de::DeserializeOwned};

    use super::MsgSerde;

    #[derive(Clone, Copy, Debug, Default)]
    pub struct BitcodeMsgSerde;

    impl BitcodeMsgSerde {
        pub const CONTENT_TYPE: &'static str = "application/x-bitcode";
    }

    impl MsgSerde for BitcodeMsgSerde {
        fn content_type(&self) -> &str {
            Self::CONTENT_TYPE
        }

        fn to_bytes<T: Serialize + ?Sized>(
            &self,
            value: &T,
        ) -> Result<Bytes, AnyError> {
            let payload =
                bitcode::serialize(value).map_err(|e| AnyError::new(&e))?;
            Ok(Bytes::from(payload))
        }

        fn from_bytes<T: DeserializeOwned>(
            &self,
            bytes: &[u8],
        ) -> Result<T, AnyError> {
            bitcode::deserialize(bytes).map_err(|e| AnyError::new(&e))
        }
    }
}
