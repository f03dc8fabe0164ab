use clap::Parser;
use colored::Colorize;
use viewmap_cli::{load_config, logging::init_logging, run, Cli};

fn main() {
    let cli = Cli::parse();

    let result = load_config(&cli).and_then(|(manager, config)| {
        init_logging(&config.logging)?;
        manager.log_messages();
        run(&cli, &config)
    });

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    }
}
