use std::io;
use std::process;

use charcorpus::{artifacts, cli, config, config::AppCommand, prepare};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("charcorpus=info")),
        )
        .with_writer(io::stderr)
        .init();

    let command = cli::parse_command();
    match command {
        AppCommand::Prepare(config) => match prepare::prepare(&config) {
            Ok(report) => println!("{report}"),
            Err(err) => {
                tracing::error!("prepare failed: {err}");
                process::exit(1);
            }
        },
        AppCommand::Decode(config) => {
            match artifacts::decode_file(&config.meta_path, &config.ids_path, config.limit) {
                Ok(text) => println!("{text}"),
                Err(err) => {
                    tracing::error!("decode failed: {err}");
                    process::exit(1);
                }
            }
        }
        AppCommand::Config(command) => match config::run_show_config(&command) {
            Ok(output) => println!("{output}"),
            Err(err) => {
                tracing::error!("config failed: {err}");
                process::exit(1);
            }
        },
    }
}
