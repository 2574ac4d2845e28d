mod backend;
mod cli;
mod commands;

use clap::Parser;
use cli::Cli;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            eprint!("{err}");
            return ExitCode::from(64);
        }
    };

    skipledger_o11y::init(resolve_log_format(&cli));

    match commands::run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(exit_code_for(&err))
        }
    }
}

/// `--log-format` wins if given; otherwise, with `--config`, the config
/// file's `log_format`; otherwise `compact`. A config that fails to load
/// is not reported here — `commands::run` loads it again and surfaces the
/// real error there.
fn resolve_log_format(cli: &Cli) -> skipledger_o11y::LogFormat {
    if let Some(format) = cli.log_format {
        return format;
    }
    if let Some(config_path) = &cli.config {
        if let Ok(config) = skipledger_config::Config::load(config_path) {
            return match config.log_format {
                skipledger_config::LogFormat::Compact => skipledger_o11y::LogFormat::Compact,
                skipledger_config::LogFormat::Json => skipledger_o11y::LogFormat::Json,
            };
        }
    }
    skipledger_o11y::LogFormat::default()
}

/// Map the outermost `skipledger-*` error kind found in the chain to a
/// process exit code (§6.3): malformed/bad-type/oversize inputs -> 1, a
/// detected hash conflict -> 2, storage I/O -> 3, configuration -> 4, and
/// anything else (including CLI-usage errors caught above) -> 1.
fn exit_code_for(err: &anyhow::Error) -> u8 {
    if let Some(core_err) = err.downcast_ref::<skipledger_core::Error>() {
        return match core_err {
            skipledger_core::Error::HashConflict(_) => 2,
            skipledger_core::Error::StorageIo(_) => 3,
            _ => 1,
        };
    }
    if let Some(pack_err) = err.downcast_ref::<skipledger_pack::Error>() {
        return match pack_err {
            skipledger_pack::Error::HashConflict(_) => 2,
            skipledger_pack::Error::Core(core_err) => return exit_code_for_core(core_err),
            _ => 1,
        };
    }
    if let Some(row_err) = err.downcast_ref::<skipledger_row::Error>() {
        return match row_err {
            skipledger_row::Error::BadType(_) | skipledger_row::Error::Oversize { .. } => 1,
            skipledger_row::Error::SalterClosed(_) => 1,
        };
    }
    if err.downcast_ref::<skipledger_config::ConfigError>().is_some() {
        return 4;
    }
    1
}

fn exit_code_for_core(core_err: &skipledger_core::Error) -> u8 {
    match core_err {
        skipledger_core::Error::HashConflict(_) => 2,
        skipledger_core::Error::StorageIo(_) => 3,
        _ => 1,
    }
}
