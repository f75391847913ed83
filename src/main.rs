//! FATHOM - CLI Entry Point
//!
//! Headless runner for the ocean ecosystem engine.

use clap::{Parser, Subcommand};
use fathom::{benchmark, Config, Engine, ForagingController, SimEvent};
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "fathom")]
#[command(version)]
#[command(about = "Deterministic grid-based ocean ecosystem simulator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulation with built-in foraging agents
    Run {
        /// Configuration file (YAML)
        #[arg(short, long, default_value = "config.yaml")]
        config: PathBuf,

        /// Number of ticks to simulate
        #[arg(short, long, default_value = "10000")]
        ticks: u64,

        /// Random seed for reproducibility
        #[arg(long)]
        seed: Option<u64>,

        /// Quiet mode (minimal output)
        #[arg(short, long)]
        quiet: bool,

        /// Write every event to stdout as one JSON object per line
        #[arg(long)]
        json: bool,
    },

    /// Run performance benchmark
    Benchmark {
        /// Number of ticks
        #[arg(short, long, default_value = "1000")]
        ticks: u64,

        /// Population size
        #[arg(short, long, default_value = "500")]
        population: usize,
    },

    /// Generate default configuration file
    Init {
        /// Output path
        #[arg(short, long, default_value = "config.yaml")]
        output: PathBuf,
    },
}

fn init_logging(level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            ticks,
            seed,
            quiet,
            json,
        } => run_simulation(config, ticks, seed, quiet, json),

        Commands::Benchmark { ticks, population } => {
            init_logging("warn");
            run_benchmark(ticks, population)
        }

        Commands::Init { output } => {
            init_logging("info");
            generate_config(output)
        }
    }
}

fn run_simulation(
    config_path: PathBuf,
    ticks: u64,
    seed: Option<u64>,
    quiet: bool,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let (config, source) = if config_path.exists() {
        (Config::from_file(&config_path)?, format!("{:?}", config_path))
    } else {
        (Config::default(), "defaults".to_string())
    };
    init_logging(&config.logging.log_level);
    log::info!("configuration loaded from {}", source);

    let mut engine = match seed.or(config.world.seed) {
        Some(seed) => Engine::new_with_seed(config.clone(), seed)?,
        None => Engine::new(config.clone())?,
    };
    engine.start()?;

    if !quiet {
        eprintln!("Starting simulation");
        eprintln!("  Seed: {}", engine.world().seed());
        eprintln!("  Grid size: {}x{}", config.world.width, config.world.height);
        eprintln!("  Initial population: {}", engine.world().population());
        eprintln!("  Ticks: {}", ticks);
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if json {
        for event in engine.drain_events() {
            writeln!(out, "{}", serde_json::to_string(&event)?)?;
        }
    } else {
        engine.drain_events();
    }

    let mut controller = ForagingController::new(engine.world().seed());
    let mut write_error = None;
    let start = Instant::now();

    engine.run_with_callback(&mut controller, ticks, |engine, events| {
        if json && write_error.is_none() {
            for event in &events {
                let line = serde_json::to_string(event).map_err(std::io::Error::from);
                if let Err(err) = line.and_then(|line| writeln!(out, "{}", line)) {
                    write_error = Some(err);
                    break;
                }
            }
        }
        if events.iter().any(|e| matches!(e, SimEvent::AgentDied { .. })) && engine.world().is_extinct() {
            if !quiet {
                eprintln!("\nPopulation extinct at tick {}", engine.current_tick());
            }
            // Ignore the error: the receiver lives as long as the engine
            let _ = engine.command_sender().send(fathom::Command::Stop);
        }
    });
    if let Some(err) = write_error {
        return Err(err.into());
    }

    let elapsed = start.elapsed();
    let ticks_per_sec = engine.current_tick() as f64 / elapsed.as_secs_f64().max(f64::EPSILON);

    if !quiet {
        eprintln!();
        eprintln!("=== Simulation Complete ===");
        eprintln!("Time: {:.2}s", elapsed.as_secs_f64());
        eprintln!("Ticks: {}", engine.current_tick());
        eprintln!("Speed: {:.1} ticks/s", ticks_per_sec);
        eprintln!("{}", engine.stats());
    }

    Ok(())
}

fn run_benchmark(ticks: u64, population: usize) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== FATHOM Benchmark ===");
    println!("Ticks: {}", ticks);
    println!("Population: {}", population);
    println!();

    let result = benchmark(ticks, population)?;
    println!("{}", result);

    Ok(())
}

fn generate_config(output: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default();
    config.save(&output)?;
    println!("Configuration saved to: {:?}", output);
    Ok(())
}
