//! ua-core - Device capability engine CLI
//!
//! The main entry point for ua-core, handling:
//! - Building and persisting the device repository from definitions
//! - User-agent lookups with capability output
//! - Repository inspection (devices, groups, fallback chains)
//! - Regression verification against UA case files

use clap::{Args, Parser, Subcommand};
use serde_json::json;
use std::collections::BTreeMap;
use std::io::IsTerminal;
use std::path::PathBuf;
use tracing::{error, info, info_span};
use ua_common::{format_error_human, Error, OutputFormat, StructuredError};
use ua_config::{load_config, validate_config, EngineConfig, MatchMode, ValidationError};
use ua_core::builder::from_store_error;
use ua_core::exit_codes::ExitCode;
use ua_core::logging::{
    event_names, generate_run_id, init_logging, LogConfig, LogFormat, LogLevel, Stage,
};
use ua_core::manager::{configured_builder, open_persistence, Manager};
use ua_core::Device;

/// Device capability engine - identify devices from user agents
#[derive(Parser)]
#[command(name = "ua-core")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Path to the engine configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "json")]
    format: OutputFormat,

    /// Override the configured match mode
    #[arg(long, global = true)]
    mode: Option<MatchMode>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log format on stderr (human, jsonl)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the repository from definitions and persist it
    Build(BuildArgs),

    /// Identify the device behind a user agent
    Lookup(LookupArgs),

    /// Show a device by id
    Device(DeviceArgs),

    /// Show database and repository information
    Info,

    /// Show the fallback chain of a device
    Fallbacks(FallbacksArgs),

    /// List capability groups, or the capabilities of one group
    Groups(GroupsArgs),

    /// Check a file of expected user-agent matches
    Verify(VerifyArgs),

    /// Lookup cache maintenance
    Cache(CacheArgs),

    /// Print version information
    Version,
}

// ============================================================================
// Command arguments
// ============================================================================

#[derive(Args, Debug)]
struct BuildArgs {
    /// Base definition document (.xml or .zip)
    #[arg(long)]
    main: Option<PathBuf>,

    /// Patch document, applied in the order given (repeatable)
    #[arg(long = "patch")]
    patches: Vec<PathBuf>,

    /// Keep only this capability group (repeatable)
    #[arg(long = "group")]
    groups: Vec<String>,

    /// Keep only this capability (repeatable)
    #[arg(long = "capability")]
    capabilities: Vec<String>,
}

#[derive(Args, Debug)]
struct LookupArgs {
    /// User agent to identify
    user_agent: Option<String>,

    /// Extra request header as NAME=VALUE (repeatable)
    #[arg(long = "header", short = 'H')]
    headers: Vec<String>,

    /// Capability to report for the matched device (repeatable)
    #[arg(long = "capability", short = 'c')]
    capabilities: Vec<String>,
}

#[derive(Args, Debug)]
struct DeviceArgs {
    /// Device id
    id: String,

    /// Capability to report (repeatable)
    #[arg(long = "capability", short = 'c')]
    capabilities: Vec<String>,

    /// Report every capability with inheritance applied
    #[arg(long)]
    all: bool,
}

#[derive(Args, Debug)]
struct FallbacksArgs {
    /// Device id
    id: String,
}

#[derive(Args, Debug)]
struct GroupsArgs {
    /// Group whose capability names to list
    group: Option<String>,
}

#[derive(Args, Debug)]
struct VerifyArgs {
    /// Case file: one `device_id<TAB>user agent` per line
    cases: PathBuf,
}

#[derive(Args, Debug)]
struct CacheArgs {
    #[command(subcommand)]
    command: CacheCommands,
}

#[derive(Subcommand, Debug)]
enum CacheCommands {
    /// Drop memoized lookups
    Clear {
        /// Also drop the persisted repository
        #[arg(long)]
        persistence: bool,
    },
}

// ============================================================================
// Main entry point
// ============================================================================

fn main() {
    let cli = Cli::parse();

    let cli_level = if cli.global.quiet {
        Some(LogLevel::Error)
    } else {
        match cli.global.verbose {
            0 => None,
            1 => Some(LogLevel::Debug),
            _ => Some(LogLevel::Trace),
        }
    };
    let log_config = LogConfig::from_env(cli_level, cli.global.log_format)
        .with_color(!cli.global.no_color);
    init_logging(&log_config);

    let run_id = generate_run_id();
    let span = info_span!("run", run_id = %run_id);
    let _guard = span.enter();
    info!(target: event_names::RUN_STARTED, "ua-core started");

    let exit_code = match &cli.command {
        Commands::Build(args) => run_build(&cli.global, args),
        Commands::Lookup(args) => run_lookup(&cli.global, args),
        Commands::Device(args) => run_device(&cli.global, args),
        Commands::Info => run_info(&cli.global),
        Commands::Fallbacks(args) => run_fallbacks(&cli.global, args),
        Commands::Groups(args) => run_groups(&cli.global, args),
        Commands::Verify(args) => run_verify(&cli.global, args),
        Commands::Cache(args) => run_cache(&cli.global, args),
        Commands::Version => {
            print_version(&cli.global);
            ExitCode::Ok
        }
    };

    info!(
        target: event_names::RUN_FINISHED,
        exit_code = exit_code.as_i32(),
        "ua-core finished"
    );
    drop(_guard);
    std::process::exit(exit_code.as_i32());
}

// ============================================================================
// Shared setup
// ============================================================================

/// Loads the configuration and applies global overrides.
fn engine_config(global: &GlobalOpts) -> Result<EngineConfig, ExitCode> {
    let _stage = info_span!("stage", stage = %Stage::Init).entered();
    let (mut config, paths) = load_config(global.config.as_deref())
        .map_err(|e| output_config_error(global, &e))?;
    if let Some(mode) = global.mode {
        config.matching.mode = mode;
    }
    info!(
        target: event_names::CONFIG_LOADED,
        source = ?paths.source,
        path = ?paths.config,
        "configuration loaded"
    );
    Ok(config)
}

fn open_manager(global: &GlobalOpts) -> Result<Manager, ExitCode> {
    let config = engine_config(global)?;
    validate_config(&config).map_err(|e| output_config_error(global, &e))?;
    let _stage = info_span!("stage", stage = %Stage::Load).entered();
    Manager::new(&config).map_err(|e| output_error(global, &e))
}

/// Writes an engine error to stderr and maps it to an exit code.
fn output_error(global: &GlobalOpts, err: &Error) -> ExitCode {
    error!(code = err.code(), "{}", err);
    match global.format {
        OutputFormat::Json => eprintln!("{}", StructuredError::from(err).to_json_pretty()),
        OutputFormat::Exitcode => {}
        _ => eprintln!("{}", format_error_human(err, use_color(global))),
    }
    ExitCode::from(err)
}

/// Output a config error in the appropriate format.
fn output_config_error(global: &GlobalOpts, error: &ValidationError) -> ExitCode {
    let response = json!({
        "status": "error",
        "error": {
            "code": error.code(),
            "category": "config",
            "message": error.to_string(),
        }
    });

    match global.format {
        OutputFormat::Json => eprintln!("{}", pretty(&response)),
        OutputFormat::Summary => eprintln!("config error: {}", error),
        OutputFormat::Exitcode => {}
        OutputFormat::Md => {
            eprintln!("# Configuration Error");
            eprintln!();
            eprintln!("Error: {}", error);
        }
    }

    ExitCode::ConfigError
}

fn use_color(global: &GlobalOpts) -> bool {
    !global.no_color && std::io::stderr().is_terminal()
}

fn pretty(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

fn device_json(device: &Device) -> serde_json::Value {
    json!({
        "id": device.id,
        "user_agent": device.user_agent,
        "fall_back": device.fall_back,
        "actual_device_root": device.actual_device_root,
        "specific": device.specific,
    })
}

/// Typed values of the requested capabilities of `id`.
fn capability_map(
    manager: &Manager,
    id: &str,
    names: &[String],
) -> Result<BTreeMap<String, serde_json::Value>, Error> {
    let mut out = BTreeMap::new();
    for name in names {
        let value = manager.get_typed_capability(id, name)?;
        out.insert(name.clone(), serde_json::to_value(value)?);
    }
    Ok(out)
}

// ============================================================================
// Command implementations
// ============================================================================

fn run_build(global: &GlobalOpts, args: &BuildArgs) -> ExitCode {
    let mut config = match engine_config(global) {
        Ok(config) => config,
        Err(code) => return code,
    };
    if let Some(main) = &args.main {
        config.database.main = Some(main.clone());
    }
    if !args.patches.is_empty() {
        config.database.patches = args.patches.clone();
    }
    let filter: Vec<String> = args
        .groups
        .iter()
        .chain(&args.capabilities)
        .cloned()
        .collect();
    if !filter.is_empty() {
        config.database.capability_filter = filter;
    }
    if let Err(e) = validate_config(&config) {
        return output_config_error(global, &e);
    }

    let _stage = info_span!("stage", stage = %Stage::Build).entered();
    let Some(builder) = configured_builder(&config) else {
        return output_error(
            global,
            &Error::Config("no base definition given (--main or database.main)".to_string()),
        );
    };
    let built = match builder.build() {
        Ok(built) => built,
        Err(e) => {
            error!(target: event_names::BUILD_FAILED, error = %e, "build failed");
            return output_error(global, &e);
        }
    };

    let persisted = open_persistence(&config).and_then(|store| built.persist(store.as_ref()));
    if let Err(e) = persisted {
        return output_error(global, &e);
    }

    let repo = &built.repository;
    match global.format {
        OutputFormat::Json => {
            let response = json!({
                "status": "built",
                "fingerprint": built.fingerprint,
                "built_at": built.built_at.to_rfc3339(),
                "version": repo.info().version,
                "last_updated": repo.info().last_updated,
                "devices": repo.len(),
                "indexed": repo.index().len(),
                "patches": config.database.patches,
                "persistence": config.persistence.provider.as_str(),
            });
            println!("{}", pretty(&response));
        }
        OutputFormat::Summary => {
            println!(
                "built {} devices ({} indexed) fingerprint {}",
                repo.len(),
                repo.index().len(),
                &built.fingerprint[..12.min(built.fingerprint.len())]
            );
        }
        OutputFormat::Exitcode => {}
        OutputFormat::Md => {
            println!("# Repository Build");
            println!();
            println!("- Version: {}", repo.info().version);
            println!("- Devices: {}", repo.len());
            println!("- Indexed user agents: {}", repo.index().len());
            println!("- Fingerprint: `{}`", built.fingerprint);
        }
    }
    ExitCode::Ok
}

fn run_lookup(global: &GlobalOpts, args: &LookupArgs) -> ExitCode {
    let manager = match open_manager(global) {
        Ok(m) => m,
        Err(code) => return code,
    };

    let mut headers = Vec::new();
    for raw in &args.headers {
        let Some((name, value)) = raw.split_once('=') else {
            eprintln!("invalid header '{}': expected NAME=VALUE", raw);
            return ExitCode::ArgsError;
        };
        headers.push((name.to_string(), value.to_string()));
    }
    if let Some(ua) = &args.user_agent {
        headers.push(("user-agent".to_string(), ua.clone()));
    }

    let _stage = info_span!("stage", stage = %Stage::Match).entered();
    let request = manager.request_factory().from_headers(headers);
    let lookup = manager.lookup(&request);
    let capabilities = match capability_map(&manager, &lookup.device.id, &args.capabilities) {
        Ok(caps) => caps,
        Err(e) => return output_error(global, &e),
    };

    match global.format {
        OutputFormat::Json => {
            let response = json!({
                "user_agent": request.user_agent,
                "header": request.source,
                "device": device_json(lookup.device),
                "handler": lookup.matched.as_ref().map(|m| m.handler),
                "step": lookup.matched.as_ref().map(|m| m.step.as_str()),
                "normalized": lookup.matched.as_ref().map(|m| m.normalized.clone()),
                "cached": lookup.cached,
                "mode": manager.mode().as_str(),
                "capabilities": capabilities,
            });
            println!("{}", pretty(&response));
        }
        OutputFormat::Summary => {
            let via = lookup
                .matched
                .as_ref()
                .map(|m| format!("{}/{}", m.handler, m.step))
                .unwrap_or_else(|| "cache".to_string());
            println!("{} ({})", lookup.device.id, via);
        }
        OutputFormat::Exitcode => {}
        OutputFormat::Md => {
            println!("# Lookup");
            println!();
            println!("- User agent: `{}`", request.user_agent);
            println!("- Device: `{}`", lookup.device.id);
            if let Some(m) = &lookup.matched {
                println!("- Handler: {} ({})", m.handler, m.step);
            }
            for (name, value) in &capabilities {
                println!("- {}: {}", name, value);
            }
        }
    }
    ExitCode::Ok
}

fn run_device(global: &GlobalOpts, args: &DeviceArgs) -> ExitCode {
    let manager = match open_manager(global) {
        Ok(m) => m,
        Err(code) => return code,
    };
    let device = match manager.get_device(&args.id) {
        Ok(d) => d,
        Err(e) => return output_error(global, &e),
    };

    let capabilities: BTreeMap<String, serde_json::Value> = if args.all {
        match manager.repository().all_capabilities(&device.id) {
            Ok(all) => all
                .into_iter()
                .map(|(k, v)| (k.to_string(), json!(v)))
                .collect(),
            Err(e) => return output_error(global, &e),
        }
    } else {
        match capability_map(&manager, &device.id, &args.capabilities) {
            Ok(caps) => caps,
            Err(e) => return output_error(global, &e),
        }
    };

    match global.format {
        OutputFormat::Json => {
            let mut value = device_json(device);
            value["own_capabilities"] = json!(device.own_capability_count());
            value["capabilities"] = json!(capabilities);
            println!("{}", pretty(&value));
        }
        OutputFormat::Summary => println!(
            "{} -> {}",
            device.id,
            device.fall_back.as_deref().unwrap_or("(root)")
        ),
        OutputFormat::Exitcode => {}
        OutputFormat::Md => {
            println!("# Device `{}`", device.id);
            println!();
            println!("- User agent: `{}`", device.user_agent);
            println!(
                "- Falls back to: {}",
                device.fall_back.as_deref().unwrap_or("(root)")
            );
            for (name, value) in &capabilities {
                println!("- {}: {}", name, value);
            }
        }
    }
    ExitCode::Ok
}

fn run_info(global: &GlobalOpts) -> ExitCode {
    let manager = match open_manager(global) {
        Ok(m) => m,
        Err(code) => return code,
    };
    let info = manager.get_database_info();
    let repo = manager.repository();

    match global.format {
        OutputFormat::Json => {
            let response = json!({
                "version": info.version,
                "last_updated": info.last_updated,
                "fingerprint": manager.fingerprint(),
                "origin": manager.origin(),
                "devices": repo.len(),
                "indexed": repo.index().len(),
                "groups": repo.groups().count(),
                "root": repo.root().id,
                "mode": manager.mode().as_str(),
                "handlers": manager.chain().len(),
            });
            println!("{}", pretty(&response));
        }
        OutputFormat::Summary => {
            println!("{} ({} devices)", info.version, repo.len());
        }
        OutputFormat::Exitcode => {}
        OutputFormat::Md => {
            println!("# Device Database");
            println!();
            println!("- Version: {}", info.version);
            println!("- Last updated: {}", info.last_updated);
            println!("- Devices: {}", repo.len());
            println!("- Fingerprint: `{}`", manager.fingerprint());
        }
    }
    ExitCode::Ok
}

fn run_fallbacks(global: &GlobalOpts, args: &FallbacksArgs) -> ExitCode {
    let manager = match open_manager(global) {
        Ok(m) => m,
        Err(code) => return code,
    };
    let chain = match manager.get_fall_back_devices(&args.id) {
        Ok(chain) => chain,
        Err(e) => return output_error(global, &e),
    };
    let ids: Vec<&str> = chain.iter().map(|d| d.id.as_str()).collect();

    match global.format {
        OutputFormat::Json => println!("{}", pretty(&json!({ "id": args.id, "fallbacks": ids }))),
        OutputFormat::Exitcode => {}
        _ => println!("{}", ids.join(" -> ")),
    }
    ExitCode::Ok
}

fn run_groups(global: &GlobalOpts, args: &GroupsArgs) -> ExitCode {
    let manager = match open_manager(global) {
        Ok(m) => m,
        Err(code) => return code,
    };

    let (key, names): (&str, Vec<&str>) = match &args.group {
        Some(group) => match manager.get_capabilities_name_for_group(group) {
            Ok(names) => ("capabilities", names.iter().map(String::as_str).collect()),
            Err(e) => return output_error(global, &e),
        },
        None => ("groups", manager.get_list_of_groups()),
    };

    match global.format {
        OutputFormat::Json => {
            let mut response = json!({ "group": args.group });
            response[key] = json!(names);
            println!("{}", pretty(&response));
        }
        OutputFormat::Exitcode => {}
        _ => {
            for name in names {
                println!("{}", name);
            }
        }
    }
    ExitCode::Ok
}

fn run_verify(global: &GlobalOpts, args: &VerifyArgs) -> ExitCode {
    let manager = match open_manager(global) {
        Ok(m) => m,
        Err(code) => return code,
    };
    let content = match std::fs::read_to_string(&args.cases) {
        Ok(c) => c,
        Err(e) => return output_error(global, &Error::Io(e)),
    };

    let _stage = info_span!("stage", stage = %Stage::Match).entered();
    let mut total = 0usize;
    let mut mismatches = Vec::new();
    for (lineno, line) in content.lines().enumerate() {
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((expected, ua)) = line.split_once('\t') else {
            eprintln!(
                "{}:{}: expected `device_id<TAB>user agent`",
                args.cases.display(),
                lineno + 1
            );
            return ExitCode::ArgsError;
        };
        total += 1;
        let actual = &manager.get_device_for_user_agent(ua).id;
        if actual != expected.trim() {
            mismatches.push(json!({
                "line": lineno + 1,
                "user_agent": ua,
                "expected": expected.trim(),
                "actual": actual,
            }));
        }
    }

    match global.format {
        OutputFormat::Json => {
            let response = json!({
                "cases": total,
                "passed": total - mismatches.len(),
                "mismatches": mismatches,
            });
            println!("{}", pretty(&response));
        }
        OutputFormat::Summary => {
            println!("{}/{} cases matched", total - mismatches.len(), total);
        }
        OutputFormat::Exitcode => {}
        OutputFormat::Md => {
            println!("# Verification");
            println!();
            println!("{}/{} cases matched", total - mismatches.len(), total);
            for m in &mismatches {
                println!(
                    "- line {}: expected `{}`, got `{}`",
                    m["line"], m["expected"], m["actual"]
                );
            }
        }
    }

    if mismatches.is_empty() {
        ExitCode::Ok
    } else {
        ExitCode::Mismatch
    }
}

fn run_cache(global: &GlobalOpts, args: &CacheArgs) -> ExitCode {
    let config = match engine_config(global) {
        Ok(config) => config,
        Err(code) => return code,
    };
    let _stage = info_span!("stage", stage = %Stage::Store).entered();

    match args.command {
        CacheCommands::Clear { persistence } => {
            let dir = config.cache.effective_dir();
            let cleared = ua_store::open(config.cache.provider, dir.as_deref())
                .and_then(|store| store.clear());
            if let Err(e) = cleared {
                return output_error(global, &from_store_error(e));
            }
            info!(target: event_names::CACHE_CLEARED, backend = config.cache.provider.as_str(), "lookup cache cleared");

            if persistence {
                let cleared = open_persistence(&config).and_then(|store| {
                    store
                        .clear()
                        .map_err(from_store_error)
                });
                if let Err(e) = cleared {
                    return output_error(global, &e);
                }
            }

            match global.format {
                OutputFormat::Json => println!(
                    "{}",
                    pretty(&json!({ "status": "cleared", "persistence": persistence }))
                ),
                OutputFormat::Exitcode => {}
                _ => println!("cache cleared"),
            }
            ExitCode::Ok
        }
    }
}

fn print_version(global: &GlobalOpts) {
    let version_info = json!({
        "ua_core_version": env!("CARGO_PKG_VERSION"),
        "rust_version": env!("CARGO_PKG_RUST_VERSION"),
    });

    match global.format {
        OutputFormat::Json => println!("{}", pretty(&version_info)),
        OutputFormat::Exitcode => {}
        _ => println!("ua-core {}", env!("CARGO_PKG_VERSION")),
    }
}
