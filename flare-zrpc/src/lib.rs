mod client;
mod encoding;
mod server;

pub use client::ZrpcTransport;
pub use server::ServerConfig;
pub use server::ZrpcServer;
