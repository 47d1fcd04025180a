use std::{env, net::SocketAddr, path::PathBuf, time::Duration};

use anyhow::{Context, bail};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app_name: String,
    pub bind_addr: SocketAddr,
    pub camera_url: String,
    pub upstream_connect_timeout: Duration,
    /// `None` lets a silent upstream hold the relay slot indefinitely.
    pub upstream_idle_timeout: Option<Duration>,
    pub static_dir: Option<PathBuf>,
    pub cors_origins: Vec<String>,
    pub log_dir: PathBuf,
    pub log_stdout: bool,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let app_name = env::var("APP_NAME").unwrap_or_else(|_| "GrowHub".to_owned());
        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_owned())
            .parse()
            .context("BIND_ADDR must be a socket address")?;

        let camera_url =
            env::var("CAMERA_URL").unwrap_or_else(|_| "http://127.0.0.1:4747/video".to_owned());
        let camera_url = camera_url.trim().to_owned();
        if !(camera_url.starts_with("http://") || camera_url.starts_with("https://")) {
            bail!("CAMERA_URL must be an http(s) url, got {camera_url:?}");
        }

        let upstream_connect_timeout =
            Duration::from_secs(parse_u64("UPSTREAM_CONNECT_TIMEOUT_SECS").unwrap_or(10));
        let upstream_idle_timeout = match parse_u64("UPSTREAM_IDLE_TIMEOUT_SECS").unwrap_or(30) {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        let static_dir = non_empty("STATIC_DIR").map(PathBuf::from);
        let cors_origins = non_empty("CORS_ORIGINS")
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default();

        let log_dir = PathBuf::from(env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_owned()));
        let log_stdout = env::var("LOG_STDOUT")
            .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Self {
            app_name,
            bind_addr,
            camera_url,
            upstream_connect_timeout,
            upstream_idle_timeout,
            static_dir,
            cors_origins,
            log_dir,
            log_stdout,
        })
    }
}

fn parse_u64(key: &str) -> Option<u64> {
    env::var(key).ok().and_then(|v| v.trim().parse::<u64>().ok())
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}
