use std::error;
use std::fs::OpenOptions;
use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;

use git_version::git_version;

use simplelog::ColorChoice;
use simplelog::CombinedLogger;
use simplelog::ConfigBuilder;
use simplelog::LevelFilter;
use simplelog::SharedLogger;
use simplelog::TermLogger;
use simplelog::TerminalMode;
use simplelog::WriteLogger;

use log::info;

use sprinkler::config::OPENSPRINKLER;
use sprinkler::Config;

const VERSION: &str = git_version!(
    args = ["--always", "--dirty=-modified", "--tags"],
    fallback = "unknown"
);

/// Checks and inspects the configuration of the irrigation integration.
#[derive(Debug, Parser)]
#[clap(name = "sprinkler", version = VERSION)]
struct Args {
    /// Where to read the configuration from.
    #[clap(short, long, default_value = "config.ini")]
    config_file: PathBuf,
    /// More log output, may be repeated.
    #[clap(short, long, parse(from_occurrences))]
    verbose: usize,
    /// Also append the log to this file.
    #[clap(long)]
    log_file: Option<PathBuf>,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Load and validate the configuration.
    Check,
    /// Show the configuration with decoded start times, password hidden.
    Show {
        /// Also list the program names of a plan spanning this many days.
        #[clap(long, value_name = "DAYS")]
        programs: Option<usize>,
    },
    /// Print the configuration in canonical form.
    Dump {
        /// Print TOML instead of INI.
        #[clap(long)]
        toml: bool,
    },
}

fn init_logging(args: &Args) -> Result<(), Box<dyn error::Error>> {
    let level = match args.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let log_config = ConfigBuilder::new()
        .set_time_format_str("%F %T%.3f")
        .build();
    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();
    if let Some(path) = &args.log_file {
        let log_file = OpenOptions::new().append(true).create(true).open(path)?;
        loggers.push(WriteLogger::new(level, log_config.clone(), log_file));
    }
    if cfg!(feature = "term_logger") {
        loggers.push(TermLogger::new(
            level,
            log_config,
            TerminalMode::Stderr,
            ColorChoice::Auto,
        ));
    }
    CombinedLogger::init(loggers)?;
    Ok(())
}

fn show(config: &Config, programs: Option<usize>) {
    let Config {
        opensprinkler,
        database,
        irrigation,
    } = config;
    println!("[{OPENSPRINKLER}]");
    println!("  controller: {}", opensprinkler.controller);
    println!("  password:   {}", opensprinkler.password);
    println!("[database]");
    println!("  config:     {}", database.config);
    println!("  table:      {}", database.table);
    println!("[irrigation]");
    println!(
        "  {} daily slots of {} minutes",
        irrigation.daily_slots(),
        irrigation.slot_minutes
    );
    if !irrigation.program_name_prefix.is_empty() {
        println!("  program name prefix: {}", irrigation.program_name_prefix);
    }
    for (i, slot) in irrigation.slots.iter().enumerate() {
        println!("  slot {}: {:<12} {}", i + 1, slot.name, slot.time);
    }
    if let Some(days) = programs {
        println!("programs for a {days} day plan:");
        for name in irrigation.program_names(days) {
            println!("  {name}");
        }
    }
}

fn main() -> Result<(), Box<dyn error::Error>> {
    let args = Args::parse();
    init_logging(&args)?;
    info!("sprinkler {VERSION}");

    let config = Config::load(&args.config_file)?;
    match args.command {
        Command::Check => {
            println!(
                "{}: ok, {} daily slots",
                args.config_file.display(),
                config.irrigation.daily_slots()
            );
        }
        Command::Show { programs } => show(&config, programs),
        Command::Dump { toml: false } => print!("{}", config.to_document()?),
        Command::Dump { toml: true } => print!("{}", toml::to_string(&config)?),
    }
    Ok(())
}
