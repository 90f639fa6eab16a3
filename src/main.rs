use clap::{Arg, ArgAction, ArgMatches, Command};
use std::error::Error;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use treemirror::logging::{self, *};
use treemirror::validation::parse_interval;
use treemirror::{utils, walk, CancellationSignal, MirrorConfig, MirrorError, Scheduler, SyncCycle};

/// Exit status of `--once` when the cycle did not fully succeed
const EXIT_CYCLE_FAILED: i32 = 3;

fn build_cli() -> Command {
	Command::new("treemirror")
		.version(env!("CARGO_PKG_VERSION"))
		.about("One-way periodic directory mirroring")
		.arg(Arg::new("source").value_name("SOURCE").required(true).help("Directory to mirror from"))
		.arg(Arg::new("replica").value_name("REPLICA").required(true).help("Directory kept identical to SOURCE"))
		.arg(
			Arg::new("interval")
				.value_name("INTERVAL")
				.required(true)
				.allow_negative_numbers(true)
				.help("Seconds between synchronization cycles"),
		)
		.arg(Arg::new("config").short('c').long("config").value_name("PATH").help("Config file (.toml or .json)"))
		.arg(
			Arg::new("log-file")
				.long("log-file")
				.value_name("PATH")
				.conflicts_with("no-log-file")
				.help("Append log records to PATH (default: sync_logs.log)"),
		)
		.arg(
			Arg::new("no-log-file")
				.long("no-log-file")
				.action(ArgAction::SetTrue)
				.help("Log to stderr only"),
		)
		.arg(Arg::new("log-level").long("log-level").value_name("LEVEL").help("Log level (RUST_LOG overrides)"))
		.arg(
			Arg::new("exclude")
				.short('x')
				.long("exclude")
				.value_name("GLOB")
				.action(ArgAction::Append)
				.help("Exclude paths matching GLOB (repeatable)"),
		)
		.arg(
			Arg::new("once")
				.long("once")
				.action(ArgAction::SetTrue)
				.conflicts_with("dry-run")
				.help("Run a single cycle and exit"),
		)
		.arg(
			Arg::new("dry-run")
				.short('n')
				.long("dry-run")
				.action(ArgAction::SetTrue)
				.help("Print the actions a cycle would apply and exit"),
		)
}

/// Build the effective configuration: defaults, file, environment, CLI
fn load_config(matches: &ArgMatches) -> Result<MirrorConfig, MirrorError> {
	let mut config = match matches.get_one::<String>("config") {
		Some(path) => MirrorConfig::load_file(&PathBuf::from(path))?,
		None => MirrorConfig::default(),
	};
	config.apply_env();

	if let Some(source) = matches.get_one::<String>("source") {
		config.source = PathBuf::from(source);
	}
	if let Some(replica) = matches.get_one::<String>("replica") {
		config.replica = PathBuf::from(replica);
	}
	if let Some(interval) = matches.get_one::<String>("interval") {
		config.interval_secs = parse_interval(interval)?.as_secs();
	}
	if let Some(file) = matches.get_one::<String>("log-file") {
		config.log_file = Some(PathBuf::from(file));
	}
	if matches.get_flag("no-log-file") {
		config.log_file = None;
	}
	if let Some(level) = matches.get_one::<String>("log-level") {
		config.log_level = level.clone();
	}
	if let Some(patterns) = matches.get_many::<String>("exclude") {
		config.exclude_patterns.extend(patterns.cloned());
	}

	config.validate()?;
	Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
	let matches = build_cli().get_matches();

	let config = match load_config(&matches) {
		Ok(config) => config,
		Err(e) => {
			eprintln!("{}", e);
			process::exit(1);
		}
	};

	if let Err(e) = logging::init_tracing(&config.log_level, config.log_file.as_deref()) {
		eprintln!("{}", e);
		process::exit(1);
	}

	info!(
		"Run synchronization algorithm with parameters '{}, {}, {}'",
		config.source.display(),
		config.replica.display(),
		config.interval_secs
	);

	let cycle = SyncCycle::from_config(&config)?;

	if matches.get_flag("dry-run") {
		let plan = cycle.plan().await?;
		for warning in &plan.warnings {
			warn!("{}", warning);
		}
		for action in &plan.actions {
			println!("{}", action);
		}
		return Ok(());
	}

	if matches.get_flag("once") {
		if config.cleanup_temp_files {
			walk::cleanup_temp_files(&config.replica).await;
		}
		let report = cycle.run(1).await;
		if !report.is_success() {
			process::exit(EXIT_CYCLE_FAILED);
		}
		return Ok(());
	}

	let mut shutdown = utils::ShutdownSignals::install();
	let signal = Arc::new(CancellationSignal::new());
	let handle = Scheduler::new(cycle, config.interval(), signal)?
		.with_temp_cleanup(config.cleanup_temp_files)
		.spawn();

	let unexpected = tokio::select! {
		received = shutdown.recv() => {
			info!("Received {}, waiting for the running cycle to finish...", received);
			false
		}
		_ = handle.stopped() => {
			error!("Scheduler stopped without a stop request");
			true
		}
	};

	let summary = handle.shutdown().await?;
	debug!(
		cycles = summary.cycles_run,
		partial = summary.cycles_partial,
		failed = summary.cycles_failed,
		skipped_ticks = summary.ticks_skipped,
		"Scheduler summary"
	);

	if unexpected {
		process::exit(1);
	}
	Ok(())
}

// vim: ts=4
