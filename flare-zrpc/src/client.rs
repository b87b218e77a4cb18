use bytes::Bytes;
use flare_rpc::{Payload, Reply, Transport, TransportError};
use zenoh::bytes::{Encoding, ZBytes};
use zenoh::query::QueryTarget;

use crate::encoding::content_type;

/// [`Transport`] issuing each call as a Zenoh query on
/// `{prefix}/{service}/{method}`.
pub struct ZrpcTransport {
    z_session: zenoh::Session,
    prefix: String,
    content_type: String,
}

impl ZrpcTransport {
    /// `content_type` names the codec the proxy uses. Replies encoded with
    /// any other codec keep the remote's encoding and fail to decode.
    pub fn new(
        z_session: zenoh::Session,
        prefix: impl Into<String>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            z_session,
            prefix: prefix.into(),
            content_type: content_type.into(),
        }
    }

    fn payload(&self, bytes: &ZBytes, encoding: &Encoding) -> Payload {
        Payload::new(
            content_type(&self.content_type, Some(encoding)),
            Bytes::copy_from_slice(&bytes.to_bytes()),
        )
    }
}

#[async_trait::async_trait]
impl Transport for ZrpcTransport {
    async fn exchange(
        &self,
        address: &str,
        request: Payload,
    ) -> Result<Reply, TransportError> {
        let key_expr = format!("{}{}", self.prefix, address);
        let get_result = self
            .z_session
            .get(key_expr)
            .target(QueryTarget::BestMatching)
            .payload(ZBytes::from(request.bytes.to_vec()))
            .encoding(Encoding::from(request.content_type))
            .await?;
        let reply = get_result.recv_async().await?;
        match reply.result() {
            Ok(sample) => Ok(Reply::Success(
                self.payload(sample.payload(), sample.encoding()),
            )),
            Err(err) => {
                Ok(Reply::Failure(self.payload(err.payload(), err.encoding())))
            }
        }
    }
}
