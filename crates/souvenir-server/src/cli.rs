use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use souvenir_core::Device;

#[derive(Parser, Debug)]
#[command(name = "souvenird", version, about = "Souvenir image classification daemon")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP inference server
    Serve(ServeArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Token clients must send in the `token` form field
    #[arg(long, env = "SECRET_TOKEN", hide_env_values = true)]
    pub secret_token: String,

    /// Bind host
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Bind port
    #[arg(long, env = "PORT", default_value_t = 5000)]
    pub port: u16,

    /// Path to the ONNX classifier
    #[arg(long, env = "MODEL_PATH", default_value = "model/model-souvenir-bali.onnx")]
    pub model_path: PathBuf,

    /// Device for inference (cpu or cuda:N)
    #[arg(long, env = "DEVICE", default_value = "cpu")]
    pub device: String,

    /// Model instances to load; each gets its own worker thread
    #[arg(long, env = "WORKERS", default_value_t = 1, value_parser = clap::value_parser!(u16).range(1..))]
    pub workers: u16,

    /// Largest accepted request body in bytes
    #[arg(long, env = "MAX_UPLOAD_BYTES", default_value_t = 10 * 1024 * 1024)]
    pub max_upload_bytes: usize,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    pub log: String,
}

/// Loads `path` (or `.env` from the working directory or its parents) into
/// the process environment. Variables that are already set keep their value.
pub fn load_env_file(path: Option<&Path>) -> Result<Option<PathBuf>> {
    let loaded = match path {
        Some(path) => dotenvy::from_path(path).map(|()| path.to_path_buf()),
        None => dotenvy::dotenv(),
    };
    match loaded {
        Ok(found) => Ok(Some(found)),
        Err(err) if err.not_found() => Ok(None),
        Err(err) => Err(err).context("failed to read .env file"),
    }
}

pub fn parse_device(raw: &str) -> Result<Device> {
    if raw.eq_ignore_ascii_case("cpu") {
        return Ok(Device::Cpu);
    }

    if let Some(rest) = raw.strip_prefix("cuda:") {
        let device_id: u32 = rest.parse().context("invalid cuda device id")?;
        return Ok(Device::Cuda { device_id });
    }

    anyhow::bail!("unsupported device: {raw} (expected cpu or cuda:N)");
}
