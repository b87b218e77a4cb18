use std::sync::Arc;

use crate::codec::{MsgSerde, Payload};
use crate::dispatch::Dispatcher;
use crate::envelope::Reply;
use crate::error::TransportError;

/// Delivers an encoded request to the endpoint serving `address` and hands
/// back its reply. Implemented by transport bindings; proxies never do I/O
/// themselves.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn exchange(
        &self,
        address: &str,
        request: Payload,
    ) -> Result<Reply, TransportError>;
}

/// In-process transport straight into a [`Dispatcher`].
pub struct LocalTransport<S> {
    dispatcher: Arc<Dispatcher<S>>,
}

impl<S: MsgSerde> LocalTransport<S> {
    pub fn new(dispatcher: Arc<Dispatcher<S>>) -> Self {
        LocalTransport { dispatcher }
    }
}

#[async_trait::async_trait]
impl<S: MsgSerde> Transport for LocalTransport<S> {
    async fn exchange(
        &self,
        address: &str,
        request: Payload,
    ) -> Result<Reply, TransportError> {
        Ok(self.dispatcher.serve(address, &request).await)
    }
}
