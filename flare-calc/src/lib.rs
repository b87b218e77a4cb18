pub mod calc;
pub mod cli;

use std::error::Error;
use std::sync::Arc;

use calc::{CALLER_KEY, calc_binding, calc_interface};
use cli::{CalcCli, CalcCommands, CallOperation, ConnectionArgs, ServerArgs};
use flare_rpc::{BincodeMsgSerde, Context, Dispatcher, MsgSerde, Proxy};
use flare_zrpc::{ServerConfig, ZrpcServer, ZrpcTransport};
use tracing::info;

pub async fn handle_cli(
    cli: CalcCli,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    match cli.command {
        CalcCommands::Server(options) => start_server(options).await,
        CalcCommands::Call { opt, connection } => {
            call(opt, connection).await
        }
    }
}

pub async fn start_server(
    options: ServerArgs,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("use option {options:?}");
    let dispatcher = Dispatcher::builder(BincodeMsgSerde)
        .case_sensitive(options.case_sensitive)
        .bind(calc_binding())
        .build()?;
    for route in dispatcher.router().routes() {
        info!("route {}", route.pattern.literal());
    }
    let z_session = zenoh::open(zenoh::Config::default()).await?;
    let config = ServerConfig {
        prefix: options.prefix,
        concurrency: options.concurrency,
    };
    let server = ZrpcServer::new(z_session, config, Arc::new(dispatcher));
    server.start().await?;
    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    server.close();
    Ok(())
}

pub async fn call(
    opt: CallOperation,
    connection: ConnectionArgs,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let z_session = zenoh::open(zenoh::Config::default()).await?;
    let transport = Arc::new(ZrpcTransport::new(
        z_session,
        connection.prefix,
        BincodeMsgSerde.content_type(),
    ));
    let proxy =
        Proxy::builder(calc_interface(), BincodeMsgSerde, transport).build()?;
    let mut ctx = Context::new();
    if let Some(caller) = connection.caller {
        ctx.put(CALLER_KEY, caller);
    }
    let (method, a, b) = match opt {
        CallOperation::Plus { a, b } => ("plus", a, b),
        CallOperation::Minus { a, b } => ("minus", a, b),
        CallOperation::Times { a, b } => ("times", a, b),
        CallOperation::Divide { a, b } => ("divide", a, b),
        CallOperation::Whoami => {
            let whoami = proxy.method::<(), Option<String>>("whoami")?;
            let caller = proxy.call(&whoami, &ctx, ()).await?;
            println!("{}", caller.as_deref().unwrap_or("<anonymous>"));
            return Ok(());
        }
    };
    let handle = proxy.method::<(f64, f64), f64>(method)?;
    let out = proxy.call(&handle, &ctx, (a, b)).await?;
    println!("{out}");
    Ok(())
}
