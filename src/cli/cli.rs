use std::path::PathBuf;

use clap::Parser;

use crate::application::data::LogLevel;

#[derive(Parser, Debug, Clone)]
#[command(version, about = "Replays a script of folder and file operations")]
pub struct Cli {
    /// YAML script with the operations to run
    pub script: PathBuf,
    #[clap(long, short, default_value = "warn", value_enum)]
    pub log_level: LogLevel,

    /// Save the persistence mirror snapshot to this file
    #[clap(long, short)]
    pub mirror: Option<PathBuf>,

    /// Do not print the final tree
    #[clap(long, short)]
    pub quiet: bool,
}
