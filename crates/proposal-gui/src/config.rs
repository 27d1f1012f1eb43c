use anyhow::{Context, Result};
use std::env;
use std::net::SocketAddr;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub listen_addr: String,
    pub max_concurrency: usize,
}

impl AppConfig {
    const DEFAULT_LISTEN_ADDR: &'static str = "0.0.0.0:8080";

    pub fn from_env() -> Result<Self> {
        let listen_addr = env::var("PROPOSAL_LISTEN_ADDR")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| Self::DEFAULT_LISTEN_ADDR.to_string());
        listen_addr
            .parse::<SocketAddr>()
            .with_context(|| format!("PROPOSAL_LISTEN_ADDR is not a socket address: {listen_addr}"))?;

        let max_concurrency = env::var("PROPOSAL_MAX_CONCURRENCY")
            .ok()
            .and_then(|value| value.trim().parse::<usize>().ok())
            .filter(|value| *value > 0)
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|nz| nz.get())
                    .unwrap_or(4)
            });

        Ok(Self {
            listen_addr,
            max_concurrency,
        })
    }
}
