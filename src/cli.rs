use std::ffi::OsString;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::{
    AppCommand, DEFAULT_OUT_DIR, DecodeConfig, PrepareConfig, SOURCE_ENV, ShowConfig,
};
use crate::data::{DEFAULT_TEXT_FILE, DEFAULT_TRAIN_FRACTION};

#[derive(Debug, Parser)]
#[command(
    name = "charcorpus",
    version,
    about = "Character-level corpus preparation for small poetry language models"
)]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Debug, Subcommand)]
enum CliCommand {
    /// Collect poems, build the vocabulary and write train.bin, val.bin and meta.json
    Prepare(PrepareArgs),
    /// Print the text stored in a token id file
    Decode(DecodeArgs),
    /// Print or write the training hyperparameters
    Config(ConfigArgs),
}

#[derive(Debug, Args)]
struct PrepareArgs {
    /// Directory holding one subdirectory per poem
    #[arg(long, env = SOURCE_ENV)]
    source: PathBuf,
    #[arg(long, default_value = DEFAULT_OUT_DIR)]
    out: PathBuf,
    #[arg(long, default_value_t = DEFAULT_TRAIN_FRACTION)]
    train_fraction: f64,
    #[arg(long, default_value = DEFAULT_TEXT_FILE)]
    text_file: String,
}

#[derive(Debug, Args)]
struct DecodeArgs {
    #[arg(long)]
    meta: PathBuf,
    #[arg(long)]
    ids: PathBuf,
    #[arg(long)]
    limit: Option<usize>,
}

#[derive(Debug, Args)]
struct ConfigArgs {
    /// JSON file overriding the preset
    #[arg(long)]
    from: Option<PathBuf>,
    #[arg(long)]
    out: Option<PathBuf>,
}

pub fn parse_command() -> AppCommand {
    from_cli(Cli::parse())
}

pub fn try_command_from_iter<I, T>(iter: I) -> Result<AppCommand, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::try_parse_from(iter)?;
    Ok(from_cli(cli))
}

fn from_cli(cli: Cli) -> AppCommand {
    match cli.command {
        CliCommand::Prepare(args) => AppCommand::Prepare(PrepareConfig {
            source_dir: args.source,
            out_dir: args.out,
            train_fraction: args.train_fraction,
            text_file: args.text_file,
        }),
        CliCommand::Decode(args) => AppCommand::Decode(DecodeConfig {
            meta_path: args.meta,
            ids_path: args.ids,
            limit: args.limit,
        }),
        CliCommand::Config(args) => AppCommand::Config(ShowConfig {
            from: args.from,
            out: args.out,
        }),
    }
}
