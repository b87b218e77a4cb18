mod codec;
mod context;
mod dispatch;
mod envelope;
mod error;
mod instance;
mod naming;
mod params;
mod proxy;
pub mod routing;
mod transport;

#[cfg(feature = "bincode")]
pub use codec::BincodeMsgSerde;
#[cfg(feature = "bitcode")]
pub use codec::BitcodeMsgSerde;
pub use codec::MsgSerde;
pub use codec::Payload;
pub use context::CallerContext;
pub use context::Context;
pub use dispatch::Dispatcher;
pub use dispatch::DispatcherBuilder;
pub use dispatch::ServiceBinding;
pub use envelope::Reply;
pub use envelope::Request;
pub use error::ClientError;
pub use error::ConfigError;
pub use error::Fault;
pub use error::FaultKind;
pub use error::PANIC_TYPE;
pub use error::TransportError;
pub use instance::Contextual;
pub use instance::InstanceFactory;
pub use naming::Interface;
pub use naming::MethodDecl;
pub use naming::MethodNames;
pub use naming::NamingOverrides;
pub use naming::ServiceNames;
pub use naming::Shape;
pub use params::ArgBundle;
pub use params::Params;
pub use proxy::Proxy;
pub use proxy::ProxyBuilder;
pub use proxy::RemoteMethod;
pub use transport::LocalTransport;
pub use transport::Transport;

pub use anyerror::AnyError;
