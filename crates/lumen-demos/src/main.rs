//! Runs one of the lumen GPU demos.

mod blinn_phong;
mod compute_boids;
mod config;
mod fluid_simulation;
mod mesh;
mod pbr_ibl;
mod registry;
mod rng;

use anyhow::{Context, Result};
use lumen_engine::logging::{init_logging, LoggingConfig};

use crate::config::{Command, USAGE};

fn main() {
    if let Err(e) = run() {
        eprintln!("lumen-demos: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let command = match config::parse_args(std::env::args().skip(1)) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{USAGE}\n");
            return Err(e);
        }
    };

    match command {
        Command::Help => {
            println!("{USAGE}");
            print_examples();
            Ok(())
        }
        Command::List => {
            print_examples();
            Ok(())
        }
        Command::Run(cfg) => {
            init_logging(LoggingConfig {
                env_filter: cfg.log_filter.clone(),
                ..LoggingConfig::default()
            });

            let entry = registry::find(&cfg.example)
                .with_context(|| format!("unknown example {:?}; try `lumen-demos list`", cfg.example))?;
            (entry.run)(&cfg)
        }
    }
}

fn print_examples() {
    println!("examples:");
    for e in registry::EXAMPLES {
        println!("  {:<18} {}", e.name, e.title);
    }
}
