use clap::Parser;
use std::net::SocketAddr;
use trace_exec::ResourceLimits;
use trace_exec_server::{create_app, run_server};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to listen on
    #[arg(short, long, default_value = "0.0.0.0:3000")]
    addr: SocketAddr,

    /// Maximum number of concurrent executions
    #[arg(short, long, default_value = "10")]
    max_concurrent: usize,

    /// Memory limit in bytes for executed programs
    #[arg(long, default_value = "536870912")] // 512MB
    memory_limit: u64,

    /// File size limit in bytes for executed programs
    #[arg(long, default_value = "10485760")] // 10MB
    file_size_limit: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let resource_limits = ResourceLimits {
        memory: args.memory_limit,
        file_size: args.file_size_limit,
    };

    let app = create_app(args.max_concurrent, resource_limits);
    run_server(app, args.addr).await?;

    Ok(())
}
