use std::{error::Error, sync::Arc};

use bytes::Bytes;
use flare_rpc::{Dispatcher, MsgSerde, Payload, Reply};
use tokio::sync::{Semaphore, watch};
use tracing::{debug, error, info, warn};
use zenoh::bytes::{Encoding, ZBytes};
use zenoh::query::Query;

use crate::encoding::content_type;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Key expression prefix; calls arrive on `{prefix}/{service}/{method}`.
    pub prefix: String,
    /// Max calls in flight. Zero is treated as one.
    pub concurrency: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            prefix: "flare/rpc".to_string(),
            concurrency: 16,
        }
    }
}

/// Serves a [`Dispatcher`] on a Zenoh queryable.
///
/// Successful calls are answered with `reply`, failed ones with `reply_err`.
/// The codec's content type travels as the Zenoh encoding both ways.
/// Dropping the server stops the serving loop.
pub struct ZrpcServer<S> {
    config: ServerConfig,
    z_session: zenoh::Session,
    dispatcher: Arc<Dispatcher<S>>,
    close_sender: watch::Sender<bool>,
}

impl<S: MsgSerde> ZrpcServer<S> {
    pub fn new(
        z_session: zenoh::Session,
        config: ServerConfig,
        dispatcher: Arc<Dispatcher<S>>,
    ) -> Self {
        let (close_sender, _) = watch::channel(false);
        ZrpcServer {
            config,
            z_session,
            dispatcher,
            close_sender,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub async fn start(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let key_expr = format!("{}/**", self.config.prefix);
        info!("registering rpc on '{}'", key_expr);
        let queryable =
            self.z_session.declare_queryable(key_expr.clone()).await?;
        let prefix = self.config.prefix.clone();
        let dispatcher = self.dispatcher.clone();
        let permits =
            Arc::new(Semaphore::new(self.config.concurrency.max(1) as usize));
        let mut close = self.close_sender.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    query = queryable.recv_async() => match query {
                        Ok(query) => {
                            let permits = permits.clone();
                            let dispatcher = dispatcher.clone();
                            let prefix = prefix.clone();
                            tokio::spawn(async move {
                                let Ok(_permit) = permits.acquire_owned().await
                                else {
                                    return;
                                };
                                Self::handle(dispatcher, &prefix, query).await;
                            });
                        }
                        Err(err) => {
                            error!("error on queryable '{}': {}", key_expr, err);
                            break;
                        }
                    },
                    _ = close.changed() => {
                        info!("closing rpc on '{}'", key_expr);
                        break;
                    }
                }
            }
        });
        Ok(())
    }

    pub fn close(&self) {
        self.close_sender.send_replace(true);
    }

    async fn handle(dispatcher: Arc<Dispatcher<S>>, prefix: &str, query: Query) {
        let key = query.key_expr().as_str();
        let path = key.strip_prefix(prefix).unwrap_or(key).to_string();
        let bytes = match query.payload() {
            Some(payload) => Bytes::copy_from_slice(&payload.to_bytes()),
            None => {
                warn!("receive rpc to '{}' without payload", key);
                Bytes::new()
            }
        };
        let content_type =
            content_type(dispatcher.serde().content_type(), query.encoding());
        let request = Payload::new(content_type, bytes);
        debug!("serve '{}'", path);
        match dispatcher.serve(&path, &request).await {
            Reply::Success(payload) => {
                let byte = ZBytes::from(payload.bytes.to_vec());
                let encoding = Encoding::from(payload.content_type);
                if let Err(e) =
                    query.reply(query.key_expr(), byte).encoding(encoding).await
                {
                    warn!("error on replying '{}', {}", query.key_expr(), e);
                }
            }
            Reply::Failure(payload) => {
                let byte = ZBytes::from(payload.bytes.to_vec());
                let encoding = Encoding::from(payload.content_type);
                if let Err(e) = query.reply_err(byte).encoding(encoding).await {
                    warn!("error on error replying '{}', {}", query.key_expr(), e);
                }
            }
        }
    }
}

impl<S> Drop for ZrpcServer<S> {
    fn drop(&mut self) {
        self.close_sender.send_replace(true);
    }
}
