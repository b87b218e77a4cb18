use std::fmt::Display;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use bytes::Bytes;
use futures::FutureExt;
use futures::future::{self, BoxFuture};
use hashbrown::HashMap;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::codec::{MsgSerde, Payload};
use crate::context::{CallerContext, Context};
use crate::envelope::{Reply, Request};
use crate::error::{ConfigError, Fault, FaultKind};
use crate::instance::{Contextual, InstanceFactory};
use crate::naming::{Interface, NamingOverrides, ServiceNames, Shape};
use crate::params::{ArgBundle, Params};
use crate::routing::{Router, address};

type HandlerFuture = BoxFuture<'static, Result<Payload, Fault>>;

type Handler<T, S> = Box<
    dyn Fn(&Arc<S>, Arc<T>, CallerContext, &[String], &ArgBundle) -> HandlerFuture
        + Send
        + Sync,
>;

struct BoundMethod<T, S> {
    arity: usize,
    shape: Shape,
    handler: Handler<T, S>,
}

fn ready(result: Result<Payload, Fault>) -> HandlerFuture {
    future::ready(result).boxed()
}

fn encode_value<S: MsgSerde, R: Serialize>(
    serde: &S,
    value: &R,
) -> Result<Payload, Fault> {
    serde
        .encode(value)
        .map_err(|e| Fault::of(FaultKind::Serialization, &e))
}

/// Encodes `fault`, falling back to a `Serialization` fault describing why
/// it could not be encoded.
fn failure<S: MsgSerde>(serde: &S, fault: &Fault) -> Reply {
    let encoded = serde.encode(fault).or_else(|err| {
        warn!("cannot encode fault '{}': {}", fault, err);
        serde.encode(&Fault::of(FaultKind::Serialization, &err))
    });
    match encoded {
        Ok(payload) => Reply::Failure(payload),
        Err(err) => {
            error!("cannot encode fallback fault: {}", err);
            Reply::Failure(Payload::new(serde.content_type(), Bytes::new()))
        }
    }
}

/// An implementation bound to an [`Interface`], with one handler per
/// declared method.
pub struct ServiceBinding<T, S> {
    interface: Interface,
    overrides: NamingOverrides,
    factory: InstanceFactory<T>,
    handlers: Vec<(String, BoundMethod<T, S>)>,
}

impl<T, S> ServiceBinding<T, S>
where
    T: Send + Sync + 'static,
    S: MsgSerde,
{
    /// Every call runs against `implementation` itself.
    pub fn shared(interface: Interface, implementation: T) -> Self {
        Self::with_factory(interface, InstanceFactory::shared(implementation))
    }

    /// Every call runs against a copy bound to the caller's context.
    pub fn contextual(interface: Interface, implementation: T) -> Self
    where
        T: Contextual,
    {
        Self::with_factory(interface, InstanceFactory::contextual(implementation))
    }

    fn with_factory(interface: Interface, factory: InstanceFactory<T>) -> Self {
        ServiceBinding {
            interface,
            overrides: NamingOverrides::default(),
            factory,
            handlers: Vec::new(),
        }
    }

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

    /// Bind a method that completes in place.
    pub fn sync<P, R, E, F>(mut self, method: impl Into<String>, f: F) -> Self
    where
        P: Params,
        R: Serialize + Send + 'static,
        E: Display + 'static,
        F: Fn(&T, &mut Context, P) -> Result<R, E> + Send + Sync + 'static,
    {
        let handler: Handler<T, S> = Box::new(
            move |serde: &Arc<S>,
                  instance: Arc<T>,
                  caller: CallerContext,
                  names: &[String],
                  args: &ArgBundle|
                  -> HandlerFuture {
                let params = match P::decode(&**serde, names, args) {
                    Ok(params) => params,
                    Err(err) => {
                        return ready(Err(Fault::of(
                            FaultKind::Deserialization,
                            &err,
                        )));
                    }
                };
                let mut context = caller.into_context();
                let invoked = panic::catch_unwind(AssertUnwindSafe(|| {
                    f(&*instance, &mut context, params)
                }));
                ready(match invoked {
                    Ok(Ok(value)) => encode_value(&**serde, &value),
                    Ok(Err(err)) => Err(Fault::invocation(&err)),
                    Err(panic) => Err(Fault::panic(FaultKind::Invocation, panic)),
                })
            },
        );
        self.handlers.push((
            method.into(),
            BoundMethod {
                arity: P::ARITY,
                shape: Shape::Sync,
                handler,
            },
        ));
        self
    }

    /// Bind a method that returns a future. The reply is produced when the
    /// future settles; the instance lives until then.
    pub fn future<P, R, E, F, Fut>(mut self, method: impl Into<String>, f: F) -> Self
    where
        P: Params,
        R: Serialize + Send + 'static,
        E: Display + Send + 'static,
        F: Fn(Arc<T>, Context, P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
    {
        let handler: Handler<T, S> = Box::new(
            move |serde: &Arc<S>,
                  instance: Arc<T>,
                  caller: CallerContext,
                  names: &[String],
                  args: &ArgBundle|
                  -> HandlerFuture {
                let params = match P::decode(&**serde, names, args) {
                    Ok(params) => params,
                    Err(err) => {
                        return ready(Err(Fault::of(
                            FaultKind::Deserialization,
                            &err,
                        )));
                    }
                };
                let pending = match panic::catch_unwind(AssertUnwindSafe(|| {
                    f(instance, caller.into_context(), params)
                })) {
                    Ok(pending) => pending,
                    Err(panic) => {
                        return ready(Err(Fault::panic(
                            FaultKind::Invocation,
                            panic,
                        )));
                    }
                };
                let serde = serde.clone();
                async move {
                    match AssertUnwindSafe(pending).catch_unwind().await {
                        Ok(Ok(value)) => encode_value(&*serde, &value),
                        Ok(Err(err)) => Err(Fault::invocation(&err)),
                        Err(panic) => {
                            Err(Fault::panic(FaultKind::Invocation, panic))
                        }
                    }
                }
                .boxed()
            },
        );
        self.handlers.push((
            method.into(),
            BoundMethod {
                arity: P::ARITY,
                shape: Shape::Async,
                handler,
            },
        ));
        self
    }

    fn resolve(self) -> Result<BoundService<T, S>, ConfigError> {
        let names = self.interface.resolve(&self.overrides)?;
        let service = names.service.clone();
        let mut methods = HashMap::with_capacity(self.handlers.len());
        for (declared, bound) in self.handlers {
            let Some(decl) = names.method(&declared) else {
                return Err(ConfigError::UnknownMethod {
                    service,
                    method: declared,
                });
            };
            if methods.contains_key(&decl.name) {
                return Err(ConfigError::DuplicateHandler {
                    service,
                    method: decl.name.clone(),
                });
            }
            let declared_params = decl.params.len();
            if bound.arity > declared_params {
                return Err(ConfigError::MissingParamName {
                    service,
                    method: decl.name.clone(),
                    index: declared_params,
                });
            }
            if bound.arity < declared_params {
                return Err(ConfigError::ArityMismatch {
                    service,
                    method: decl.name.clone(),
                    declared: declared_params,
                    actual: bound.arity,
                });
            }
            if bound.shape != decl.shape {
                return Err(ConfigError::ShapeMismatch {
                    service,
                    method: decl.name.clone(),
                    declared: decl.shape,
                    actual: bound.shape,
                });
            }
            methods.insert(
                decl.name.clone(),
                BoundHandler {
                    params: decl.params.clone(),
                    handler: bound.handler,
                },
            );
        }
        if let Some(unbound) =
            names.methods.iter().find(|m| !methods.contains_key(&m.name))
        {
            return Err(ConfigError::UnboundMethod {
                service,
                method: unbound.declared.clone(),
            });
        }
        Ok(BoundService {
            names,
            factory: self.factory,
            methods,
        })
    }
}

struct BoundHandler<T, S> {
    params: Arc<[String]>,
    handler: Handler<T, S>,
}

struct BoundService<T, S> {
    names: ServiceNames,
    factory: InstanceFactory<T>,
    methods: HashMap<String, BoundHandler<T, S>>,
}

trait Service<S>: Send + Sync {
    fn names(&self) -> &ServiceNames;

    fn invoke(
        &self,
        serde: &Arc<S>,
        method: &str,
        context: Context,
        args: &ArgBundle,
    ) -> HandlerFuture;
}

impl<T, S> Service<S> for BoundService<T, S>
where
    T: Send + Sync + 'static,
    S: MsgSerde,
{
    fn names(&self) -> &ServiceNames {
        &self.names
    }

    fn invoke(
        &self,
        serde: &Arc<S>,
        method: &str,
        context: Context,
        args: &ArgBundle,
    ) -> HandlerFuture {
        let Some(bound) = self.methods.get(method) else {
            return ready(Err(Fault::not_found(&address(
                &self.names.service,
                method,
            ))));
        };
        let caller =
            CallerContext::new(self.names.service.as_str(), method, context);
        let instance = match self.factory.instance(&caller) {
            Ok(instance) => instance,
            Err(fault) => return ready(Err(fault)),
        };
        (bound.handler)(serde, instance, caller, &bound.params, args)
    }
}

pub struct DispatcherBuilder<S> {
    serde: S,
    case_sensitive: bool,
    services: Vec<Result<Box<dyn Service<S>>, ConfigError>>,
}

impl<S: MsgSerde> DispatcherBuilder<S> {
    /// Match addresses literally instead of folding case.
    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn bind<T>(mut self, binding: ServiceBinding<T, S>) -> Self
    where
        T: Send + Sync + 'static,
    {
        let service = binding
            .resolve()
            .map(|s| Box::new(s) as Box<dyn Service<S>>);
        self.services.push(service);
        self
    }

    pub fn build(self) -> Result<Dispatcher<S>, ConfigError> {
        let mut services: HashMap<String, Box<dyn Service<S>>> =
            HashMap::with_capacity(self.services.len());
        let mut routes = Vec::new();
        for service in self.services {
            let service = service?;
            let names = service.names();
            if services.contains_key(&names.service) {
                return Err(ConfigError::DuplicateService(names.service.clone()));
            }
            for m in &names.methods {
                routes.push((names.service.clone(), m.name.clone()));
            }
            info!(
                "bind service '{}' with {} methods",
                names.service,
                names.methods.len()
            );
            services.insert(names.service.clone(), service);
        }
        let router = Router::new(routes, self.case_sensitive)?;
        Ok(Dispatcher {
            serde: Arc::new(self.serde),
            services,
            router,
        })
    }
}

/// Resolves calls to bound services and runs the
/// decode, invoke, encode pipeline.
///
/// Immutable once built; share it behind an `Arc` between any number of
/// concurrent callers.
pub struct Dispatcher<S> {
    serde: Arc<S>,
    services: HashMap<String, Box<dyn Service<S>>>,
    router: Router,
}

impl<S: MsgSerde> Dispatcher<S> {
    pub fn builder(serde: S) -> DispatcherBuilder<S> {
        DispatcherBuilder {
            serde,
            case_sensitive: false,
            services: Vec::new(),
        }
    }

    pub fn serde(&self) -> &S {
        &self.serde
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn services(&self) -> impl Iterator<Item = &ServiceNames> {
        self.services.values().map(|s| s.names())
    }

    /// Call by exact service and method name. Synchronous methods run before
    /// this returns; asynchronous ones run as the returned future is polled.
    pub fn dispatch(
        &self,
        service: &str,
        method: &str,
        context: Context,
        args: ArgBundle,
    ) -> BoxFuture<'static, Reply> {
        debug!("dispatch '{}/{}'", service, method);
        let outcome = match self.services.get(service) {
            Some(bound) => bound.invoke(&self.serde, method, context, &args),
            None => ready(Err(Fault::not_found(&address(service, method)))),
        };
        self.complete(address(service, method), outcome)
    }

    /// Like [`Dispatcher::dispatch`] with the encoded [`Request`] body.
    pub fn dispatch_payload(
        &self,
        service: &str,
        method: &str,
        request: &Payload,
    ) -> BoxFuture<'static, Reply> {
        match self.serde.decode::<Request>(request) {
            Ok(Request { context, args }) => {
                self.dispatch(service, method, context, args)
            }
            Err(err) => self.complete(
                address(service, method),
                ready(Err(Fault::of(FaultKind::Deserialization, &err))),
            ),
        }
    }

    /// Resolve `path` through the router, then dispatch.
    pub fn serve(&self, path: &str, request: &Payload) -> BoxFuture<'static, Reply> {
        match self.router.resolve(path) {
            Some(route) => {
                self.dispatch_payload(&route.service, &route.method, request)
            }
            None => {
                warn!("no route for '{}'", path);
                let reply = failure(&*self.serde, &Fault::not_found(path));
                future::ready(reply).boxed()
            }
        }
    }

    fn complete(
        &self,
        address: String,
        outcome: HandlerFuture,
    ) -> BoxFuture<'static, Reply> {
        let serde = self.serde.clone();
        async move {
            match outcome.await {
                Ok(payload) => {
                    debug!("'{}' completed", address);
                    Reply::Success(payload)
                }
                Err(fault) => {
                    warn!("'{}' failed: {}", address, fault);
                    failure(&*serde, &fault)
                }
            }
        }
        .boxed()
    }
}
