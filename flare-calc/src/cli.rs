#[derive(clap::Parser, Clone, Debug)]
#[command(version, about, long_about = None)]
pub struct CalcCli {
    #[command(subcommand)]
    pub command: CalcCommands,
}

#[derive(clap::Subcommand, Clone, Debug)]
pub enum CalcCommands {
    /// Start as server
    Server(ServerArgs),
    /// Call a calculator method
    #[clap(aliases = &["c"])]
    Call {
        #[command(subcommand)]
        opt: CallOperation,
        #[clap(flatten)]
        connection: ConnectionArgs,
    },
}

#[derive(clap::Subcommand, Clone, Debug)]
pub enum CallOperation {
    Plus { a: f64, b: f64 },
    Minus { a: f64, b: f64 },
    Times { a: f64, b: f64 },
    Divide { a: f64, b: f64 },
    /// Echo the caller name the server saw
    Whoami,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// Zenoh key prefix the server listens on
    #[arg(short, long, env = "FLARE_RPC_PREFIX", default_value = "flare/rpc")]
    pub prefix: String,
    /// Name sent along in the call context
    #[arg(long, env = "FLARE_RPC_CALLER")]
    pub caller: Option<String>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ServerArgs {
    /// Zenoh key prefix to listen on
    #[arg(short, long, env = "FLARE_RPC_PREFIX", default_value = "flare/rpc")]
    pub prefix: String,
    /// Max calls in flight
    #[arg(
        long,
        default_value_t = 16,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub concurrency: u32,
    /// Match service and method names exactly
    #[arg(long, default_value_t = false)]
    pub case_sensitive: bool,
}
