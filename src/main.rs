use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};

use nutrilens::{
    CameraSource, JsonFileStore, MotionSource, NutrilensConfig, NutrilensOrchestrator,
    ScanHandoff, SimulatedMotionSource, TestPatternCamera, UnsupportedMotionSource,
};

#[derive(Parser, Debug)]
#[command(name = "nutrilens")]
#[command(about = "Client-side health tracking core with step detection and meal scanning")]
#[command(version)]
#[command(long_about = "The NutriLens client core tracks steps from the motion sensor, \
scans meals through the camera for nutrition analysis, and reconciles the daily energy \
ledger against the configured diet goal. Runs headless against the NutriLens service.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "nutrilens.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit without starting the system")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Dry run mode - initialize but don't start components
    #[arg(long, help = "Perform dry run - initialize components but don't start them")]
    dry_run: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,

    /// Feed the step tracker from a simulated accelerometer
    #[arg(long, help = "Use a simulated motion sensor instead of reporting none")]
    simulate_motion: bool,

    /// Open the meal scanner as soon as the system is up
    #[arg(long, help = "Start with the camera open, as after a scan handoff")]
    auto_scan: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Handle special modes that don't require full initialization
    if args.print_config {
        print_default_config();
        return Ok(());
    }

    // Initialize logging
    init_logging(&args)?;

    info!("Starting NutriLens client v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    // Load and validate configuration
    let config = match NutrilensConfig::load_from_file(&args.config) {
        Ok(config) => {
            info!("Configuration loaded successfully from: {}", args.config);
            config
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // Validate configuration if requested
    if args.validate_config {
        match config.validate() {
            Ok(()) => {
                info!("Configuration validation successful");
                println!("✓ Configuration is valid");
                return Ok(());
            }
            Err(e) => {
                error!("Configuration validation failed: {}", e);
                eprintln!("✗ Configuration validation failed: {}", e);
                std::process::exit(1);
            }
        }
    }

    info!("NutriLens configuration loaded and validated");

    // Wire up the platform capabilities this host provides
    let motion: Arc<dyn MotionSource> = if args.simulate_motion {
        Arc::new(SimulatedMotionSource::new(config.motion.sample_rate_hz))
    } else {
        Arc::new(UnsupportedMotionSource)
    };

    let camera: Box<dyn CameraSource> = Box::new(TestPatternCamera::new(
        config.scanner.frame_width,
        config.scanner.frame_height,
    ));

    let store = Arc::new(JsonFileStore::new(config.storage.path.as_str()));

    let handoff = if args.auto_scan {
        ScanHandoff::requested()
    } else {
        ScanHandoff::none()
    };

    // Create and initialize the orchestrator
    let mut orchestrator = NutrilensOrchestrator::new(config, motion, camera, store, handoff)
        .await
        .map_err(|e| {
            error!("Failed to create orchestrator: {}", e);
            e
        })?;

    // Initialize all components
    orchestrator.initialize().await
        .map_err(|e| {
            error!("Failed to initialize system: {}", e);
            e
        })?;

    // Handle dry run mode
    if args.dry_run {
        info!("Dry run mode - components initialized but not started");
        println!("✓ Dry run completed successfully - all components initialized");
        return Ok(());
    }

    // Start all components
    orchestrator.start().await
        .map_err(|e| {
            error!("Failed to start system: {}", e);
            e
        })?;

    // Run the main application loop with signal handling
    let exit_code = orchestrator.run().await
        .map_err(|e| {
            error!("System error during execution: {}", e);
            e
        })?;

    info!("NutriLens client exited with code: {}", exit_code);

    std::process::exit(exit_code);
}

fn init_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, fmt, Layer};

    // Determine log level based on flags
    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };

    // Create environment filter
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("nutrilens={}", log_level)));

    // Configure format based on options
    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => {
            fmt::layer()
                .json()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .boxed()
        }
        Some("compact") => {
            fmt::layer()
                .compact()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .boxed()
        }
        Some("pretty") | None => {
            fmt::layer()
                .pretty()
                .with_target(true)
                .with_thread_ids(args.debug)
                .with_file(args.debug)
                .with_line_number(args.debug)
                .boxed()
        }
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer()
                .with_target(true)
                .with_thread_ids(args.debug)
                .with_file(args.debug)
                .with_line_number(args.debug)
                .boxed()
        }
    };

    // Initialize subscriber
    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .init();

    Ok(())
}

/// Print default configuration in TOML format
fn print_default_config() {
    println!("# NutriLens Configuration File");
    println!("# This is the default configuration with all available options");
    println!();

    let default_config = r#"[api]
# Base URL of the nutrition service
base_url = "http://localhost:8000"

[motion]
# Accelerometer sampling rate in Hz
sample_rate_hz = 20
# Steps injected per tick by the demo driver (min..=max)
demo_step_min = 1
demo_step_max = 5

[scanner]
# JPEG quality for captured stills (1-100)
jpeg_quality = 90
# Live frame size in pixels
frame_width = 640
frame_height = 480

[ledger]
# Diet preset used for the daily calorie goal when no profile is stored:
# "weight_loss", "maintenance", "weight_gain", "diabetic", "high_protein"
preset = "maintenance"
# Daily water target in milliliters
water_target_ml = 2450.0

[storage]
# Base path for the local key/value store
path = "./nutrilens-data"

[system]
# Event bus capacity
event_bus_capacity = 100
"#;

    println!("{}", default_config);
}
