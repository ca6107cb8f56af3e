//! godot-host - run an embedded engine instance from the command line
//!
//! Loads the engine library, publishes the assembly directory, creates and
//! starts one engine instance and pumps frames until the engine quits, a
//! budget runs out, or Ctrl-C is pressed.

use anyhow::{bail, Context, Result};
use godot_host::{
    bootstrap, project, run_frames, Engine, EngineLibrary, EngineRegistry, HostConfig, RunLimits,
    RunSummary,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

fn print_help() {
    println!("godot-host - Embedded engine host v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("USAGE:");
    println!("  godot-host [OPTIONS] [-- ENGINE_ARGS...]");
    println!();
    println!("OPTIONS:");
    println!("  -h, --help              Print this help message");
    println!("  -v, --version           Print version information");
    println!("  --config <FILE>         Load settings from a JSON file");
    println!("  --library <PATH>        Engine shared library to load");
    println!("  --project <DIR>         Project directory (must contain project.godot)");
    println!("  --assembly-dir <DIR>    Directory holding the managed assemblies");
    println!("  --headless              Run the engine without a window");
    println!("  --frames <N>            Stop after N frames");
    println!("  --seconds <S>           Stop after S seconds");
    println!();
    println!("Arguments after `--` are passed to the engine unchanged.");
}

enum Command {
    Help,
    Version,
    Run(HostConfig),
}

fn value<'a>(flag: &str, iter: &mut impl Iterator<Item = &'a String>) -> Result<&'a String> {
    iter.next()
        .with_context(|| format!("missing value for '{}'", flag))
}

fn parse_args(args: &[String]) -> Result<Command> {
    // --config is applied first so flags can override it. Engine arguments
    // after `--` are never inspected.
    let host_args = match args.iter().position(|a| a == "--") {
        Some(end) => &args[..end],
        None => args,
    };
    let mut config = match host_args.iter().position(|a| a == "--config") {
        Some(i) => {
            let path = host_args.get(i + 1).context("missing value for '--config'")?;
            HostConfig::from_file(path)?
        }
        None => HostConfig::default(),
    };

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(Command::Help),
            "-v" | "--version" => return Ok(Command::Version),
            "--config" => {
                value(arg, &mut iter)?;
            }
            "--library" => config.library_path = Some(PathBuf::from(value(arg, &mut iter)?)),
            "--project" => config.project = Some(PathBuf::from(value(arg, &mut iter)?)),
            "--assembly-dir" => config.assembly_dir = Some(PathBuf::from(value(arg, &mut iter)?)),
            "--headless" => config.headless = true,
            "--frames" => {
                let raw = value(arg, &mut iter)?;
                let frames = raw
                    .parse()
                    .with_context(|| format!("invalid frame count '{}'", raw))?;
                config.max_frames = Some(frames);
            }
            "--seconds" => {
                let raw = value(arg, &mut iter)?;
                let seconds = raw
                    .parse()
                    .with_context(|| format!("invalid duration '{}'", raw))?;
                config.max_seconds = Some(seconds);
            }
            "--" => {
                config.extra_args.extend(iter.by_ref().cloned());
            }
            other => bail!("unrecognized argument '{}'", other),
        }
    }

    if let Some(dir) = &config.project {
        config.project = Some(project::validate_project_dir(dir)?);
    }

    Ok(Command::Run(config))
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();

    let config = match parse_args(&args[1..]) {
        Ok(Command::Help) => {
            print_help();
            return Ok(());
        }
        Ok(Command::Version) => {
            println!("godot-host {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Ok(Command::Run(config)) => config,
        Err(e) => {
            eprintln!("error: {:#}", e);
            eprintln!("Run 'godot-host --help' for usage information.");
            std::process::exit(1);
        }
    };

    godot_host::init_tracing();

    // Before the runtime spawns threads and before the engine is loaded.
    let assembly_dir = bootstrap(&config).context("Environment bootstrap failed")?;
    info!("Assembly directory: {:?}", assembly_dir);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build async runtime")?;

    runtime.block_on(run(config))
}

async fn run(config: HostConfig) -> Result<()> {
    let cancel = CancellationToken::new();

    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping frame loop");
            on_interrupt.cancel();
        }
    });

    let loop_cancel = cancel.clone();
    let summary = tokio::task::spawn_blocking(move || run_engine(&config, &loop_cancel))
        .await
        .context("Frame loop task failed")??;

    cancel.cancel();
    info!(
        "Ran {} frames in {:?} ({:?})",
        summary.frames, summary.elapsed, summary.reason
    );
    Ok(())
}

/// Create, start, pump and dispose the engine on the current thread.
fn run_engine(config: &HostConfig, cancel: &CancellationToken) -> Result<RunSummary> {
    let library_path = match &config.library_path {
        Some(path) => path.clone(),
        None => {
            let name = project::default_library_name();
            project::locate_library(&project::library_search_paths(), &name)
                .with_context(|| format!("{} not found; pass --library", name))?
        }
    };

    let library = Arc::new(EngineLibrary::load(&library_path)?);
    let registry = EngineRegistry::global();

    let mut engine = Engine::create(&registry, library, config.engine_args())?;
    engine.start()?;
    match engine.instance_id() {
        Ok(id) => info!("Engine instance {} running", id),
        Err(e) => warn!("Could not query instance id: {}", e),
    }

    let pump = engine.pump();
    let summary = run_frames(&pump, &RunLimits::from_config(config), cancel);
    engine.dispose();

    Ok(summary?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    fn run_config(args: &[&str]) -> HostConfig {
        match parse_args(&strings(args)) {
            Ok(Command::Run(config)) => config,
            Ok(_) => panic!("expected a run command"),
            Err(e) => panic!("parse failed: {:#}", e),
        }
    }

    #[test]
    fn test_engine_args_after_separator_are_opaque() {
        let config = run_config(&["--headless", "--", "--config", "/not/a/host/config.json"]);
        assert!(config.headless);
        assert_eq!(config.extra_args, vec!["--config", "/not/a/host/config.json"]);
    }

    #[test]
    fn test_config_file_then_flag_override() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let json = br#"{ "max_frames": 10, "app_name": "demo" }"#;
        std::io::Write::write_all(&mut file, json).unwrap();
        let path = file.path().to_string_lossy().into_owned();

        let config = run_config(&["--config", &path, "--frames", "3"]);
        assert_eq!(config.app_name, "demo");
        assert_eq!(config.max_frames, Some(3));
    }

    #[test]
    fn test_help_and_unknown_flags() {
        assert!(matches!(parse_args(&strings(&["--help"])), Ok(Command::Help)));
        assert!(parse_args(&strings(&["--bogus"])).is_err());
        assert!(parse_args(&strings(&["--frames"])).is_err());
    }
}
