pub mod analysis;
pub mod clean;
pub mod cli;
pub mod columns;
pub mod config;
pub mod data;
pub mod error;
pub mod frame;
pub mod impute;
pub mod io_utils;
pub mod loader;
pub mod pipeline;
pub mod render;
pub mod report;
pub mod results;
pub mod stats;

use std::{env, sync::OnceLock};

use anyhow::Result;
use clap::Parser;
use log::LevelFilter;

use crate::cli::{Cli, Commands};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("digital_divide", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Clean(args) => pipeline::execute_clean(&args),
        Commands::Analyze(args) => pipeline::execute_analyze(&args),
        Commands::Top(args) => pipeline::execute_top(&args),
    }
}
