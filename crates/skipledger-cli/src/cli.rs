use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "skipledger", about = "Append-only skip-pointer hash ledger")]
pub struct Cli {
    /// Path to a skipledger.toml; `--in-memory`/`--data-file` override its
    /// backend selection for this invocation.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Use an in-memory backend regardless of config. State does not
    /// survive past this process, so this is for scripting and tests.
    #[arg(long, global = true)]
    pub in_memory: bool,

    /// Flat ledger file; overrides the config file's `path`.
    #[arg(long, global = true)]
    pub data_file: Option<PathBuf>,

    /// Flat witness file, alongside the ledger file.
    #[arg(long, global = true)]
    pub witness_file: Option<PathBuf>,

    /// Log output shape. Falls back to the loaded config's `log_format`
    /// when `--config` is given and this flag is omitted, then to
    /// `compact`.
    #[arg(long, global = true)]
    pub log_format: Option<skipledger_o11y::LogFormat>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a fresh ledger (and witness repo, if a witness file is given).
    Init,

    /// Append one block of caller-supplied input hashes (hex, 32 bytes each).
    Append {
        #[arg(long = "inputs", num_args = 1.., required = true)]
        inputs: Vec<String>,
    },

    /// Build SourceRows from a JSON cell description, hash them, and append
    /// the resulting input hashes.
    AppendRows {
        /// JSON array of rows, each a JSON array of cell values.
        #[arg(long)]
        cells: String,
        #[arg(long, default_value = "no_salt")]
        salt_scheme: String,
    },

    /// Print the current row count.
    Size,

    /// Print a row's input hash, skip count, and resolved level references.
    Row { n: u64 },

    /// Print the stitched Path over ascending targets.
    Path {
        #[arg(num_args = 1..)]
        targets: Vec<u64>,
    },

    /// Serialize a PathPack over ascending targets.
    Pack {
        #[arg(num_args = 1..)]
        targets: Vec<u64>,
        #[arg(long)]
        condensed: bool,
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Deserialize and verify a PathPack against a locally held ledger, or
    /// standalone via its own recomputation.
    VerifyPack { file: PathBuf },

    /// Truncate the ledger (and witness repo) to n rows.
    Trim { n: u64 },
}
