use std::process;

use log::{error, LevelFilter};

use seaice_extent::commands::{self, CommandFactory, ExtentCommandFactory};
use seaice_extent::utils::logger;

fn main() {
    let matches = commands::build_cli().get_matches();

    let config = match commands::build_config(&matches) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(2);
        }
    };

    let level = config.log_level.parse().unwrap_or(LevelFilter::Info);
    if let Err(e) = logger::init_logging(config.log_file.as_deref(), level) {
        eprintln!("Warning: logging not initialized: {}", e);
    }

    let factory = ExtentCommandFactory::new();
    let command = match factory.create_command(&matches, config) {
        Ok(command) => command,
        Err(e) => {
            error!("Failed to create command: {}", e);
            process::exit(2);
        }
    };

    match command.execute() {
        Ok(code) => process::exit(code),
        Err(e) => {
            error!("{}", e);
            process::exit(if e.is_fatal() { 2 } else { 1 });
        }
    }
}
