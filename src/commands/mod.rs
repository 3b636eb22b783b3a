//! CLI command implementations
//!
//! `run` processes a whole batch, `extract` measures one grid and `inspect`
//! describes a GeoTIFF. Each is a `Command` built by `ExtentCommandFactory`.

pub mod command_traits;
pub mod run_command;
pub mod extract_command;
pub mod inspect_command;

pub use command_traits::{Command, CommandFactory};
pub use run_command::RunCommand;
pub use extract_command::ExtractCommand;
pub use inspect_command::InspectCommand;

use clap::{Arg, ArgAction, ArgMatches, Command as ClapCommand};
use log::debug;

use crate::config::ExtentConfig;
use crate::error::{ExtentError, ExtentResult};

/// Options shared by the commands that run the pipeline
fn pipeline_args() -> Vec<Arg> {
    vec![
        Arg::new("target-crs")
            .long("target-crs")
            .help("Equal-area CRS the area is measured in (e.g. EPSG:6932, ESRI:102020)")
            .value_name("CRS"),
        Arg::new("threshold")
            .short('t')
            .long("threshold")
            .help("Minimum concentration counted as ice, in percent [default: 15]")
            .value_name("PERCENT"),
        Arg::new("connectivity")
            .long("connectivity")
            .help("Cell neighbourhood for regions: 4 or 8 [default: 4]")
            .value_name("N"),
        Arg::new("artifacts-dir")
            .long("artifacts-dir")
            .help("Write mask GeoTIFF, PNG and polygon GeoJSON per grid here")
            .value_name("DIR"),
        Arg::new("allow-non-equal-area")
            .long("allow-non-equal-area")
            .help("Accept a target CRS that does not preserve area")
            .action(ArgAction::SetTrue),
    ]
}

/// The command-line interface
pub fn build_cli() -> ClapCommand {
    ClapCommand::new("seaice-extent")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Sea-ice extent from concentration grids")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .help("TOML configuration file")
                .value_name("FILE")
                .global(true),
        )
        .arg(
            Arg::new("log-file")
                .long("log-file")
                .help("Also write the log to this file")
                .value_name("FILE")
                .global(true),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .help("error, warn, info, debug or trace [default: info]")
                .value_name("LEVEL")
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            ClapCommand::new("run")
                .about("Measure every grid matching the input pattern and append to the results table")
                .arg(
                    Arg::new("working-dir")
                        .short('w')
                        .long("working-dir")
                        .help("Base directory for relative paths")
                        .value_name("DIR"),
                )
                .arg(
                    Arg::new("input-pattern")
                        .short('i')
                        .long("input-pattern")
                        .help("Glob selecting the input grids [default: nt_*.tif]")
                        .value_name("GLOB"),
                )
                .arg(
                    Arg::new("output-table")
                        .short('o')
                        .long("output-table")
                        .help("Results CSV [default: extent_results.csv]")
                        .value_name("FILE"),
                )
                .arg(
                    Arg::new("workers")
                        .short('j')
                        .long("workers")
                        .help("Worker threads, 0 for one per core")
                        .value_name("N"),
                )
                .arg(
                    Arg::new("fail-fast")
                        .long("fail-fast")
                        .help("Stop at the first grid that cannot be processed")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("no-sort")
                        .long("no-sort")
                        .help("Keep directory listing order instead of sorting inputs")
                        .action(ArgAction::SetTrue),
                )
                .args(pipeline_args()),
        )
        .subcommand(
            ClapCommand::new("extract")
                .about("Print the ice area of one grid")
                .arg(Arg::new("input").help("Input GeoTIFF").required(true).index(1))
                .args(pipeline_args()),
        )
        .subcommand(
            ClapCommand::new("inspect")
                .about("Describe the structure and georeferencing of a GeoTIFF")
                .arg(Arg::new("input").help("Input GeoTIFF").required(true).index(1)),
        )
}

/// Command-line value options and the configuration key each one sets
const VALUE_OPTIONS: [(&str, &str); 10] = [
    ("working-dir", "working_dir"),
    ("input-pattern", "input_pattern"),
    ("output-table", "output_table"),
    ("target-crs", "target_crs"),
    ("threshold", "threshold"),
    ("connectivity", "connectivity"),
    ("workers", "workers"),
    ("artifacts-dir", "artifacts_dir"),
    ("log-file", "log_file"),
    ("log-level", "log_level"),
];

/// Command-line switches and the configuration key each one sets
const FLAG_OPTIONS: [(&str, &str, &str); 3] = [
    ("fail-fast", "fail_fast", "true"),
    ("no-sort", "sort_inputs", "false"),
    ("allow-non-equal-area", "allow_non_equal_area", "true"),
];

/// Builds the configuration for an invocation
///
/// Layers, lowest first: defaults, the `--config` TOML file, `SEAICE_*`
/// environment variables, then flags given on the command line (top level
/// or on the subcommand).
pub fn build_config(args: &ArgMatches) -> ExtentResult<ExtentConfig> {
    let mut config = match args.get_one::<String>("config") {
        Some(path) => ExtentConfig::from_file(path)?,
        None => ExtentConfig::default(),
    };
    config.apply_env()?;

    let mut layers = vec![args];
    if let Some((_, sub)) = args.subcommand() {
        layers.push(sub);
    }

    for matches in layers {
        for (id, key) in VALUE_OPTIONS {
            if let Some(value) = optional_value(matches, id) {
                config.set(key, &value)?;
            }
        }
        for (id, key, value) in FLAG_OPTIONS {
            if optional_flag(matches, id) {
                config.set(key, value)?;
            }
        }
        if optional_flag(matches, "verbose") {
            config.set("log_level", "debug")?;
        }
    }

    debug!("Effective configuration: {:?}", config);
    Ok(config)
}

fn optional_value(matches: &ArgMatches, id: &str) -> Option<String> {
    matches.try_get_one::<String>(id).ok().flatten().cloned()
}

fn optional_flag(matches: &ArgMatches, id: &str) -> bool {
    matches.try_get_one::<bool>(id).ok().flatten().copied().unwrap_or(false)
}

/// Factory for the `run`, `extract` and `inspect` commands
#[derive(Default)]
pub struct ExtentCommandFactory;

impl ExtentCommandFactory {
    pub fn new() -> Self {
        ExtentCommandFactory
    }
}

impl CommandFactory for ExtentCommandFactory {
    fn create_command(&self, args: &ArgMatches, config: ExtentConfig) -> ExtentResult<Box<dyn Command>> {
        match args.subcommand() {
            Some(("run", _)) => Ok(Box::new(RunCommand::new(config))),
            Some(("extract", sub)) => {
                let input = required_input(sub)?;
                Ok(Box::new(ExtractCommand::new(input, config)))
            },
            Some(("inspect", sub)) => {
                let input = required_input(sub)?;
                Ok(Box::new(InspectCommand::new(input, optional_flag(sub, "verbose") || optional_flag(args, "verbose"))))
            },
            Some((other, _)) => Err(ExtentError::Config(format!("unknown command '{}'", other))),
            None => Err(ExtentError::Config("no command given; use run, extract or inspect".to_string())),
        }
    }
}

fn required_input(matches: &ArgMatches) -> ExtentResult<String> {
    optional_value(matches, "input").ok_or_else(|| ExtentError::Config("missing input file".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vectorize::Connectivity;

    #[test]
    fn test_cli_flags_override_defaults() {
        let matches = build_cli()
            .try_get_matches_from([
                "seaice-extent", "run",
                "--threshold", "20",
                "--connectivity", "8",
                "--fail-fast",
                "--no-sort",
                "-i", "data_monthly/nt_201401*.tif",
            ])
            .unwrap();
        let config = build_config(&matches).unwrap();

        assert_eq!(config.threshold, 20.0);
        assert_eq!(config.connectivity, Connectivity::Eight);
        assert!(config.fail_fast);
        assert!(!config.sort_inputs);
        assert_eq!(config.input_pattern, "data_monthly/nt_201401*.tif");
        assert_eq!(config.target_crs, "EPSG:6932");
    }

    #[test]
    fn test_global_verbose_after_subcommand() {
        let matches = build_cli()
            .try_get_matches_from(["seaice-extent", "extract", "grid.tif", "-v"])
            .unwrap();
        assert_eq!(build_config(&matches).unwrap().log_level, "debug");
    }

    #[test]
    fn test_factory_selects_command() {
        let factory = ExtentCommandFactory::new();
        for argv in [
            vec!["seaice-extent", "run"],
            vec!["seaice-extent", "extract", "grid.tif"],
            vec!["seaice-extent", "inspect", "grid.tif"],
        ] {
            let matches = build_cli().try_get_matches_from(argv).unwrap();
            assert!(factory.create_command(&matches, ExtentConfig::default()).is_ok());
        }
        assert!(build_cli().try_get_matches_from(["seaice-extent"]).is_err());
    }

    #[test]
    fn test_invalid_flag_value() {
        let matches = build_cli()
            .try_get_matches_from(["seaice-extent", "run", "--workers", "many"])
            .unwrap();
        assert!(matches!(build_config(&matches), Err(ExtentError::Config(_))));
    }
}
