use anyhow::Result;
use calibdb_query::{
    describe_request, report_failure, resolver_from_config, CalibDbClient, CalibDbConfig,
    CaptureConstraints, ConsolePresenter, QueryOrchestrator,
};
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "calibdb-query")]
#[command(about = "Query calibdb.net for the calibration of a connected camera")]
#[command(version)]
#[command(long_about = "Opens the connected camera at the resolution nearest to the configured \
preference, sends its label and negotiated resolution to calibdb.net and prints the intrinsic \
calibration stored for it.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "calibdb.toml", help = "Path to TOML configuration file")]
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
    #[arg(long, help = "Validate configuration file and exit")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Dry run mode - resolve the camera but don't query calibdb
    #[arg(long, help = "Resolve the camera and print the request without sending it")]
    dry_run: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,

    /// API key issued by the calibdb operator
    #[arg(long, value_name = "KEY")]
    api_key: Option<u64>,

    /// Calibration service endpoint
    #[arg(long, value_name = "URL")]
    endpoint: Option<String>,

    /// Query for this camera label instead of opening a device
    #[arg(long, value_name = "LABEL")]
    camera_label: Option<String>,

    /// Preferred (or, with --camera-label, reported) resolution
    #[arg(long, value_name = "WxH", value_parser = parse_resolution)]
    resolution: Option<(u32, u32)>,

    /// Write the calibration to this file instead of stdout
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,
}

fn parse_resolution(value: &str) -> std::result::Result<(u32, u32), String> {
    let (width, height) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{}'", value))?;
    let width = width
        .trim()
        .parse()
        .map_err(|e| format!("invalid width '{}': {}", width, e))?;
    let height = height
        .trim()
        .parse()
        .map_err(|e| format!("invalid height '{}': {}", height, e))?;
    Ok((width, height))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        print_default_config()?;
        return Ok(());
    }

    init_logging(&args)?;

    info!("Starting calibdb-query v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    let mut config = match CalibDbConfig::load_from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };
    apply_overrides(&mut config, &args);

    match config.validate() {
        Ok(()) if args.validate_config => {
            info!("Configuration validation successful");
            println!("✓ Configuration is valid");
            return Ok(());
        }
        Ok(()) => {}
        Err(e) => {
            error!("Configuration validation failed: {}", e);
            eprintln!("✗ Configuration validation failed: {}", e);
            std::process::exit(1);
        }
    }

    let presenter = ConsolePresenter::new(config.display.output.clone());
    let client = match CalibDbClient::new(&config.client) {
        Ok(client) => client,
        Err(e) => std::process::exit(report_failure(&presenter, &e).exit_code()),
    };
    let constraints = CaptureConstraints::with_resolution(
        config.camera.resolution.0,
        config.camera.resolution.1,
    )
    .facing_mode(config.camera.facing_mode);

    let resolver = match resolver_from_config(&config.camera) {
        Ok(resolver) => resolver,
        Err(e) => std::process::exit(report_failure(&presenter, &e).exit_code()),
    };

    let orchestrator = QueryOrchestrator::new(resolver.as_ref(), &client, &presenter)
        .with_constraints(constraints)
        .with_indent(config.display.indent);

    if args.dry_run {
        let (camera, request) = match orchestrator.prepare().await {
            Ok(prepared) => prepared,
            Err(e) => std::process::exit(report_failure(&presenter, &e).exit_code()),
        };
        info!("Dry run - resolved {}, not contacting {}", camera, client.endpoint());
        println!("{}", describe_request(&request)?);
        return Ok(());
    }

    let outcome = orchestrator.run().await;
    let exit_code = outcome.exit_code();

    info!("calibdb-query exited with code: {}", exit_code);
    std::process::exit(exit_code);
}

fn apply_overrides(config: &mut CalibDbConfig, args: &Args) {
    if let Some(api_key) = args.api_key {
        config.client.api_key = api_key;
    }
    if let Some(endpoint) = &args.endpoint {
        config.client.endpoint = endpoint.clone();
    }
    if let Some(label) = &args.camera_label {
        config.camera.label = Some(label.clone());
    }
    if let Some(resolution) = args.resolution {
        config.camera.resolution = resolution;
    }
    if let Some(output) = &args.output {
        config.display.output = Some(output.clone());
    }
}

fn init_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

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

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("calibdb_query={}", log_level)));

    // stdout is reserved for the calibration itself
    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        Some("compact") => fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
        Some("pretty") | None => fmt::layer()
            .pretty()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_file(args.debug)
                .with_line_number(args.debug)
                .boxed()
        }
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .init();

    Ok(())
}

/// Print default configuration in TOML format
fn print_default_config() -> Result<()> {
    println!("# calibdb-query configuration file");
    println!("# Every key may also be set as CALIBDB__<SECTION>__<KEY>, e.g. CALIBDB__CLIENT__API_KEY");
    println!();
    println!("{}", toml::to_string_pretty(&CalibDbConfig::default())?);
    Ok(())
}
