use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use lumen_engine::device::GpuInit;
use lumen_engine::logging::{LoggingConfig, init_logging};
use lumen_engine::window::{Runtime, RuntimeConfig};
use lumen_shadertoy::{ShaderToy, ToySource};

/// Runs a full-screen pixel shader fed with resolution and time.
#[derive(Debug, Parser)]
#[command(name = "lumen-shadertoy", version, about)]
struct Cli {
    /// WGSL fragment source to run instead of the built-in container.
    #[arg(long, value_name = "PATH")]
    shader: Option<PathBuf>,

    /// Present without waiting for vertical sync.
    #[arg(long)]
    no_vsync: bool,

    /// Window width in logical pixels.
    #[arg(long, default_value_t = 1280)]
    width: u32,

    /// Window height in logical pixels.
    #[arg(long, default_value_t = 720)]
    height: u32,
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let args: Vec<String> = std::env::args().collect();
    let cli = Cli::parse_from(&args);

    let config = RuntimeConfig {
        title: "Lumen Shader Toy".to_string(),
        width: cli.width,
        height: cli.height,
        resizable: true,
        gpu: GpuInit {
            vsync: !cli.no_vsync,
            ..GpuInit::default()
        },
        args,
    };

    let source = cli.shader.map_or(ToySource::Embedded, ToySource::File);
    Runtime::run(config, ShaderToy::new(source))
}
