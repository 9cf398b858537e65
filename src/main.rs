use clap::Parser;
use log::{error, info};
use rtmp::{Result, RtmpServer, ServerConfig};

#[derive(Parser, Debug)]
#[command(name = "rtmp-live")]
#[command(about = "Live RTMP ingest and fan-out server", long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(long, env = "RTMP_HOST", default_value = "0.0.0.0")]
    host: String,

    #[arg(short, long, env = "RTMP_PORT", default_value_t = 1935)]
    port: u16,

    /// Outbound chunk size announced after connect
    #[arg(long, env = "RTMP_CHUNK_SIZE", default_value_t = 1024)]
    chunk_size: u32,

    #[arg(long, env = "RTMP_MAX_CONNECTIONS", default_value_t = 1000)]
    max_connections: usize,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, env = "RTMP_VERBOSE")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let config = ServerConfig::builder()
        .host(args.host)
        .port(args.port)
        .chunk_size(args.chunk_size)
        .max_connections(args.max_connections)
        .build()?;

    info!("Starting RTMP server on {}", config.bind_address());
    info!("  - Max connections: {}", config.max_connections);
    info!("  - Chunk size: {}", config.chunk_size);

    let server = RtmpServer::new(config);
    tokio::select! {
        result = server.listen() => {
            if let Err(e) = &result {
                error!("Server stopped: {}", e);
            }
            result
        }
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                error!("Error waiting for Ctrl+C: {}", e);
            }
            info!("Received Ctrl+C, shutting down server");
            Ok(())
        }
    }
}
