use std::net::SocketAddr;

use mudsession::SessionConfig;
use tokio::net::TcpListener;
use tracing::{info, Level};

mod game;
mod logon;
mod registry;
mod train;

use logon::{Logon, Roster};
use registry::Registry;

fn usage_and_exit() -> ! {
    eprintln!(
        "doormud (session server)\n\n\
USAGE:\n  doormud [--bind HOST:PORT]\n\n\
ENV:\n  DOORMUD_BIND        default 0.0.0.0:4000\n  DOORMUD_WRAP_WIDTH  default 80 (columns for outgoing word wrap)\n"
    );
    std::process::exit(2);
}

#[derive(Debug, Clone)]
struct Config {
    bind: SocketAddr,
    wrap_width: usize,
}

fn parse_args() -> Config {
    let mut bind: SocketAddr = std::env::var("DOORMUD_BIND")
        .unwrap_or_else(|_| "0.0.0.0:4000".to_string())
        .parse()
        .unwrap_or_else(|_| usage_and_exit());

    let wrap_width = std::env::var("DOORMUD_WRAP_WIDTH")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(SessionConfig::default().wrap_width);

    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--bind" => {
                let v = it.next().unwrap_or_else(|| usage_and_exit());
                bind = v.parse().unwrap_or_else(|_| usage_and_exit());
            }
            "-h" | "--help" => usage_and_exit(),
            _ => usage_and_exit(),
        }
    }

    Config { bind, wrap_width }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,doormud=info".into()),
        )
        .with_target(false)
        .with_max_level(Level::INFO)
        .init();

    let cfg = parse_args();
    let listener = TcpListener::bind(cfg.bind).await?;

    let registry = Registry::default();
    let roster = Roster::default();

    info!(bind = %cfg.bind, wrap_width = cfg.wrap_width, "doormud listening");

    loop {
        let (stream, peer) = listener.accept().await?;
        let registry = registry.clone();
        let session_cfg = SessionConfig {
            wrap_width: cfg.wrap_width,
            ..SessionConfig::default()
        };
        let handle = mudsession::attach(
            stream,
            peer,
            Box::new(Logon::new(registry.clone(), roster.clone())),
            session_cfg,
        );
        registry.insert(handle.clone());
        info!(session = %handle.id(), peer = %peer, online = registry.len(), "connection accepted");

        tokio::spawn(async move {
            handle.closed().await;
            registry.remove(handle.id());
            info!(session = %handle.id(), online = registry.len(), "connection removed");
        });
    }
}
