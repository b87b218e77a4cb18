use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use anyerror::AnyError;

use crate::context::CallerContext;
use crate::error::{Fault, FaultKind};

/// Implementations that want a fresh copy bound to each caller.
///
/// `bind` is called right before every invocation on the registered
/// prototype; the returned value serves that one call.
pub trait Contextual: Sized + Send + Sync + 'static {
    fn bind(&self, caller: &CallerContext) -> Result<Self, AnyError>;
}

type BindFn<T> = fn(&T, &CallerContext) -> Result<T, AnyError>;

/// Produces the instance a call runs against, either the shared one or a
/// per-call copy. Chosen once when the service is bound.
pub enum InstanceFactory<T> {
    Shared(Arc<T>),
    PerCall { prototype: Arc<T>, bind: BindFn<T> },
}

impl<T> InstanceFactory<T>
where
    T: Send + Sync + 'static,
{
    pub fn shared(implementation: T) -> Self {
        InstanceFactory::Shared(Arc::new(implementation))
    }

    pub fn contextual(implementation: T) -> Self
    where
        T: Contextual,
    {
        InstanceFactory::PerCall {
            prototype: Arc::new(implementation),
            bind: T::bind,
        }
    }

    pub fn is_per_call(&self) -> bool {
        matches!(self, InstanceFactory::PerCall { .. })
    }

    pub fn instance(&self, caller: &CallerContext) -> Result<Arc<T>, Fault> {
        match self {
            InstanceFactory::Shared(instance) => Ok(instance.clone()),
            InstanceFactory::PerCall { prototype, bind } => {
                match panic::catch_unwind(AssertUnwindSafe(|| {
                    bind(&**prototype, caller)
                })) {
                    Ok(Ok(instance)) => Ok(Arc::new(instance)),
                    Ok(Err(err)) => {
                        Err(Fault::of(FaultKind::Instantiation, &err))
                    }
                    Err(panic) => {
                        Err(Fault::panic(FaultKind::Instantiation, panic))
                    }
                }
            }
        }
    }
}
