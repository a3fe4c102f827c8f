use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Translate an SRT file through the Tencent Cloud translation API
    Translate {
        /// Input subtitle file
        input: PathBuf,

        /// Output subtitle file (default: <input>_tc_translated.srt)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Entries per translation request
        #[arg(short, long)]
        batch: Option<usize>,

        /// Source language code
        #[arg(short, long)]
        source: Option<String>,

        /// Target language code
        #[arg(short, long)]
        target: Option<String>,

        /// Translation mode: batch or per-entry
        #[arg(long)]
        mode: Option<String>,

        /// Batches allowed in flight at once
        #[arg(long)]
        concurrency: Option<usize>,

        /// Key file with secret_id= and secret_key= lines, used when the
        /// TENCENTCLOUD_SECRET_ID / TENCENTCLOUD_SECRET_KEY variables are unset
        #[arg(short, long, default_value = "key.txt")]
        key_file: PathBuf,
    },

    /// Convert traditional Chinese subtitles to simplified Chinese offline
    Simplify {
        /// Input subtitle file
        input: PathBuf,

        /// Output subtitle file (default: <input>_simplified.srt)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write the default configuration to a file
    InitConfig {
        /// Destination path
        #[arg(short, long, default_value = "subtrans.toml")]
        output: PathBuf,
    },
}
