//! # stagectl
//!
//! Command-line front end for the stage mover.
//!
//! # Usage
//!
//! ```bash
//! # Aggregate and per-positioner positions
//! stagectl --config stage.toml positions
//!
//! # Absolute move, blocking until every positioner stops
//! stagectl --config stage.toml goto 100 200 1500
//!
//! # Visit every site in a file in nearest-neighbour order (Ctrl-C stops)
//! stagectl --config stage.toml sites tour sites.txt --visit
//!
//! # Verbose, JSON logs
//! stagectl --config stage.toml -v --json positions
//! ```

#![deny(warnings)]

use clap::{Parser, Subcommand};
use stage_common::config::LogLevel;
use stage_common::consts::DEFAULT_CONFIG_PATH;
use stage_common::events::EventBus;
use stage_hal::DriverRegistry;
use stage_mover::{StageError, StageMover, load_config};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Stage mover control tool
#[derive(Parser, Debug)]
#[command(name = "stagectl")]
#[command(version)]
#[command(about = "Drive a multi-positioner microscope stage and its saved sites")]
#[command(long_about = None)]
struct Args {
    /// Path to the stage configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Enable verbose logging (overrides `shared.log_level`)
    #[arg(short, long)]
    verbose: bool,

    /// Output logs (and `positions`) in JSON format
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print positions, limits and step sizes
    Positions,
    /// Move to an absolute X Y Z position
    Goto {
        /// X in microns
        #[arg(allow_hyphen_values = true)]
        x: f64,
        /// Y in microns
        #[arg(allow_hyphen_values = true)]
        y: f64,
        /// Z in microns
        #[arg(allow_hyphen_values = true)]
        z: f64,
    },
    /// Work with a sites file
    Sites {
        #[command(subcommand)]
        command: SitesCommand,
    },
    /// Centre the fine positioners, compensating with the coarse ones
    Recenter,
}

#[derive(Subcommand, Debug)]
enum SitesCommand {
    /// List the sites in a file
    List {
        /// Sites file
        file: PathBuf,
    },
    /// Report which sites lie inside the soft limits
    Reach {
        /// Sites file
        file: PathBuf,
    },
    /// Print the visit order, optionally visiting each site
    Tour {
        /// Sites file
        file: PathBuf,
        /// Move to every site in turn
        #[arg(long)]
        visit: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = run() {
        error!("stagectl failed: {}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let loaded = load_config(&args.config);
    let configured = loaded
        .as_ref()
        .map_or(LogLevel::default(), |config| config.shared.log_level);
    setup_tracing(&args, configured);

    info!("stagectl v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = loaded?;
    info!(
        "Loaded {} positioners for {} from {}",
        config.positioners.len(),
        config.shared.service_name,
        args.config.display()
    );

    let mover = Arc::new(StageMover::from_config(
        &config,
        &DriverRegistry::with_builtin_drivers(),
        EventBus::new(),
    )?);
    mover.initialize();

    match args.command {
        Command::Positions => print_positions(&mover, args.json)?,
        Command::Goto { x, y, z } => {
            mover.go_to(&[x, y, z], true)?;
            let [x, y, z] = mover.position()?;
            println!("{x:.3} {y:.3} {z:.3}");
        }
        Command::Sites { command } => run_sites(&mover, command)?,
        Command::Recenter => {
            mover.recenter_fine_motion()?;
            mover.wait_for_stop(None)?;
            print_positions(&mover, args.json)?;
        }
    }

    mover.shutdown();
    info!("stagectl done");
    Ok(())
}

fn run_sites(mover: &Arc<StageMover>, command: SitesCommand) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        SitesCommand::List { file } => {
            load(mover, &file)?;
            for site in mover.all_sites() {
                println!("{site}");
            }
        }
        SitesCommand::Reach { file } => {
            load(mover, &file)?;
            for site in mover.all_sites() {
                let reachable = mover.can_reach_site(site.id)?;
                println!("{:>5} {}", site.id, if reachable { "ok" } else { "OUT OF RANGE" });
            }
        }
        SitesCommand::Tour { file, visit } => {
            // File order is the given tour; equal-cost routes keep it.
            let ids = mover.load_sites_in_order(&file)?;
            let order = mover.optimized_site_order(&ids)?;
            println!(
                "{}",
                order.iter().map(u32::to_string).collect::<Vec<_>>().join(" ")
            );
            if visit {
                let visited = visit_sites(mover, order)?;
                info!("Visited {} sites", visited);
            }
        }
    }
    Ok(())
}

fn load(mover: &StageMover, file: &Path) -> Result<usize, StageError> {
    mover.load_sites(file)
}

/// Visit each site on a worker thread, blocking on every move. Ctrl-C stops
/// the tour before the next site.
fn visit_sites(mover: &Arc<StageMover>, order: Vec<u32>) -> Result<usize, Box<dyn std::error::Error>> {
    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        flag.store(false, Ordering::SeqCst);
    })?;

    let worker_mover = Arc::clone(mover);
    let worker = thread::Builder::new()
        .name("site-tour".to_string())
        .spawn(move || -> Result<usize, StageError> {
            let mut visited = 0;
            for id in order {
                if !running.load(Ordering::SeqCst) {
                    warn!("Tour interrupted after {} sites", visited);
                    break;
                }
                if !worker_mover.can_reach_site(id)? {
                    warn!("Skipping unreachable site {}", id);
                    continue;
                }
                worker_mover.go_to_site(id, true)?;
                visited += 1;
            }
            Ok(visited)
        })?;

    let visited = worker
        .join()
        .map_err(|_| "site tour thread panicked")??;
    Ok(visited)
}

fn print_positions(mover: &StageMover, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let snapshot = mover.snapshot()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    let [x, y, z] = snapshot.position;
    println!("position      {x:>12.3} {y:>12.3} {z:>12.3}");
    for (depth, row) in snapshot.all_positions.iter().enumerate() {
        let cells: Vec<String> = row
            .iter()
            .map(|p| p.map_or_else(|| format!("{:>12}", "-"), |v| format!("{v:>12.3}")))
            .collect();
        let marker = if depth == snapshot.control_depth { '*' } else { ' ' };
        println!("depth {depth}{marker}     {}", cells.join(" "));
    }
    for (name, limits) in [("hard", snapshot.hard_limits), ("soft", snapshot.soft_limits)] {
        let cells: Vec<String> = limits
            .iter()
            .map(|l| format!("[{:.1}, {:.1}]", l.min, l.max))
            .collect();
        println!("{name} limits   {}", cells.join(" "));
    }
    println!("sites         {}", snapshot.site_count);
    Ok(())
}

/// Filter directive used when `RUST_LOG` is unset: `-v` raises the
/// configured level to at least debug.
fn default_directive(verbose: bool, configured: LogLevel) -> &'static str {
    match (verbose, configured) {
        (true, LogLevel::Trace) => LogLevel::Trace.as_directive(),
        (true, _) => LogLevel::Debug.as_directive(),
        (false, level) => level.as_directive(),
    }
}

/// Setup tracing subscriber from CLI arguments and the configured level.
/// `RUST_LOG` takes precedence over both.
fn setup_tracing(args: &Args, configured: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(args.verbose, configured)));

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}
