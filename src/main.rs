//! ROS Composer CLI
//!
//! Usage:
//!   ros-composer [OPTIONS] <CONFIG> [OUTPUT]
//!
//! Options:
//!   -s, --settings <FILE>  Generator settings (TOML format)
//!   --emit-model           Print the intermediate model as JSON instead of writing files
//!   -v, --verbose          Log pipeline details to stderr
//!   -h, --help             Print help

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use ros_composer::{
    compile_model, renderer, write_artifacts, GenerateConfig, GenerateError, Settings,
};

#[derive(Parser)]
#[command(name = "ros-composer")]
#[command(about = "Generate docker-compose files for multi-robot ROS deployments")]
struct Cli {
    /// Infrastructure configuration (YAML)
    config: PathBuf,

    /// Manifest to write; Dockerfiles go next to it
    #[arg(default_value = "docker-compose.yml")]
    output: PathBuf,

    /// Generator settings (TOML format)
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Print the intermediate model as JSON instead of writing files
    #[arg(long)]
    emit_model: bool,

    /// Log pipeline details to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings = match &cli.settings {
        Some(path) => match Settings::from_file(path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("Error loading settings '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => Settings::default(),
    };

    let source = match fs::read_to_string(&cli.config) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Error reading file '{}': {}", cli.config.display(), e);
            std::process::exit(1);
        }
    };

    let config = GenerateConfig::new().with_settings(settings);
    let filename = cli.config.display().to_string();

    let model = match compile_model(&source, &config) {
        Ok(model) => model,
        Err(GenerateError::Parse(e)) => {
            eprint!("{}", e.format(&source, &filename));
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if cli.emit_model {
        match serde_json::to_string_pretty(&model) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    let artifacts = match renderer::render(&model) {
        Ok(artifacts) => artifacts,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let source_dir = cli.config.parent().unwrap_or(Path::new("."));
    if let Err(e) = write_artifacts(&artifacts, &cli.output, source_dir) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
