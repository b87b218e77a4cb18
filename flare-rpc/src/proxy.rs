use std::marker::PhantomData;
use std::sync::Arc;

use hashbrown::HashMap;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::codec::MsgSerde;
use crate::context::Context;
use crate::envelope::{Reply, Request};
use crate::error::{ClientError, ConfigError, Fault};
use crate::naming::{Interface, MethodNames, NamingOverrides};
use crate::params::Params;
use crate::routing::address;
use crate::transport::Transport;

/// Typed handle to one remote method, obtained from [`Proxy::method`].
pub struct RemoteMethod<P, R> {
    address: Arc<str>,
    params: Arc<[String]>,
    _types: PhantomData<fn(P) -> R>,
}

impl<P, R> Clone for RemoteMethod<P, R> {
    fn clone(&self) -> Self {
        RemoteMethod {
            address: self.address.clone(),
            params: self.params.clone(),
            _types: PhantomData,
        }
    }
}

impl<P, R> RemoteMethod<P, R> {
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }
}

struct MethodEntry {
    address: Arc<str>,
    names: MethodNames,
}

pub struct ProxyBuilder<S> {
    interface: Interface,
    overrides: NamingOverrides,
    serde: S,
    transport: Arc<dyn Transport>,
}

impl<S: MsgSerde> ProxyBuilder<S> {
    pub fn named(mut self, service: impl Into<String>) -> Self {
        self.overrides = self.overrides.service(service);
        self
    }

    pub fn rename_method(
        mut self,
        declared: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        self.overrides = self.overrides.method(declared, name);
        self
    }

    pub fn rename_param(
        mut self,
        method: impl Into<String>,
        declared: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        self.overrides = self.overrides.param(method, declared, name);
        self
    }

    pub fn with_overrides(mut self, overrides: NamingOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn build(self) -> Result<Proxy<S>, ConfigError> {
        let names = self.interface.resolve(&self.overrides)?;
        let table = names
            .methods
            .into_iter()
            .map(|m| {
                let entry = MethodEntry {
                    address: address(&names.service, &m.name).into(),
                    names: m,
                };
                (entry.names.declared.clone(), entry)
            })
            .collect();
        Ok(Proxy {
            service: names.service,
            serde: Arc::new(self.serde),
            transport: self.transport,
            table,
        })
    }
}

/// Client-side stand-in for a remote service.
///
/// Resolves the same names and addresses a [`Dispatcher`](crate::Dispatcher)
/// would for the same [`Interface`] and overrides, and sends calls through
/// the injected [`Transport`].
pub struct Proxy<S> {
    service: String,
    serde: Arc<S>,
    transport: Arc<dyn Transport>,
    table: HashMap<String, MethodEntry>,
}

impl<S: MsgSerde> Proxy<S> {
    pub fn builder(
        interface: Interface,
        serde: S,
        transport: Arc<dyn Transport>,
    ) -> ProxyBuilder<S> {
        ProxyBuilder {
            interface,
            overrides: NamingOverrides::default(),
            serde,
            transport,
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    /// Address of a method, by declared name.
    pub fn address(&self, declared: &str) -> Option<&str> {
        self.table.get(declared).map(|e| &*e.address)
    }

    pub fn method<P, R>(&self, declared: &str) -> Result<RemoteMethod<P, R>, ConfigError>
    where
        P: Params,
        R: DeserializeOwned,
    {
        let entry =
            self.table
                .get(declared)
                .ok_or_else(|| ConfigError::UnknownMethod {
                    service: self.service.clone(),
                    method: declared.to_string(),
                })?;
        let declared_params = entry.names.params.len();
        if P::ARITY > declared_params {
            return Err(ConfigError::MissingParamName {
                service: self.service.clone(),
                method: entry.names.name.clone(),
                index: declared_params,
            });
        }
        if P::ARITY < declared_params {
            return Err(ConfigError::ArityMismatch {
                service: self.service.clone(),
                method: entry.names.name.clone(),
                declared: declared_params,
                actual: P::ARITY,
            });
        }
        Ok(RemoteMethod {
            address: entry.address.clone(),
            params: entry.names.params.clone(),
            _types: PhantomData,
        })
    }

    pub async fn call<P, R>(
        &self,
        method: &RemoteMethod<P, R>,
        context: &Context,
        params: P,
    ) -> Result<R, ClientError>
    where
        P: Params,
        R: DeserializeOwned,
    {
        let args = params
            .encode(&*self.serde, method.params())
            .map_err(ClientError::Encode)?;
        let request = Request {
            context: context.clone(),
            args,
        };
        match self.call_raw(method.address(), &request).await? {
            Reply::Success(payload) => {
                self.serde.decode(&payload).map_err(ClientError::Decode)
            }
            Reply::Failure(payload) => {
                let fault: Fault =
                    self.serde.decode(&payload).map_err(ClientError::Decode)?;
                Err(ClientError::Remote(fault))
            }
        }
    }

    /// Send an already built request and return the reply undecoded.
    pub async fn call_raw(
        &self,
        address: &str,
        request: &Request,
    ) -> Result<Reply, ClientError> {
        let payload = self.serde.encode(request).map_err(ClientError::Encode)?;
        debug!("call '{}'", address);
        let reply = self.transport.exchange(address, payload).await?;
        Ok(reply)
    }
}
