use crate::backend::{AnyTable, AnyWitness};
use crate::cli::{Cli, Command};
use anyhow::{bail, Context};
use skipledger_core::{Error as CoreError, SkipLedger, WitnessRepo};
use skipledger_digest::{Digest, Hash, Salter};
use skipledger_pack::PathPack;
use skipledger_row::{Cell, SaltScheme, SourceRow};
use skipledger_storage::{FileSkipTable, FileWitnessRepo, MemSkipTable, MemWitnessRepo};
use std::path::PathBuf;

pub fn run(cli: Cli) -> anyhow::Result<()> {
    let table = open_table(&cli)?;
    let witness = open_witness(&cli)?;
    let ledger = SkipLedger::open(table)?;

    match cli.command {
        Command::Init => {
            println!("initialized ledger at size {}", ledger.size());
        }
        Command::Append { inputs } => {
            let hashes: Vec<Hash> =
                inputs.iter().map(|s| parse_hash(s)).collect::<anyhow::Result<_>>()?;
            let size = ledger.append(&hashes)?;
            println!("{size}");
        }
        Command::AppendRows { cells, salt_scheme } => {
            let size = append_rows(&ledger, &cli, &cells, &salt_scheme)?;
            println!("{size}");
        }
        Command::Size => {
            println!("{}", ledger.size());
        }
        Command::Row { n } => {
            print_row(&ledger, n)?;
        }
        Command::Path { targets } => {
            print_path(&ledger, &targets)?;
        }
        Command::Pack { targets, condensed, out } => {
            build_pack(&ledger, &targets, condensed, out)?;
        }
        Command::VerifyPack { file } => {
            verify_pack(&file)?;
        }
        Command::Trim { n } => {
            ledger.trim(n)?;
            if let Some(mut witness) = witness {
                witness.trim_by_row_number(n)?;
            }
            println!("{}", ledger.size());
        }
    }
    Ok(())
}

fn open_table(cli: &Cli) -> anyhow::Result<AnyTable> {
    if cli.in_memory {
        return Ok(AnyTable::Mem(MemSkipTable::new()));
    }
    if let Some(path) = &cli.data_file {
        return Ok(AnyTable::File(FileSkipTable::open(path)?));
    }
    if let Some(config_path) = &cli.config {
        let config = skipledger_config::Config::load(config_path)
            .with_context(|| format!("loading config {}", config_path.display()))?;
        return match config.backend {
            skipledger_config::Backend::Memory => Ok(AnyTable::Mem(MemSkipTable::new())),
            skipledger_config::Backend::File => {
                let path = config
                    .path
                    .clone()
                    .ok_or_else(|| anyhow::anyhow!("config backend = \"file\" requires a path"))?;
                Ok(AnyTable::File(FileSkipTable::open(PathBuf::from(path))?))
            }
        };
    }
    bail!("specify one of --in-memory, --data-file, or --config");
}

fn open_witness(cli: &Cli) -> anyhow::Result<Option<AnyWitness>> {
    if let Some(path) = &cli.witness_file {
        return Ok(Some(AnyWitness::File(FileWitnessRepo::open(path)?)));
    }
    if cli.in_memory {
        return Ok(Some(AnyWitness::Mem(MemWitnessRepo::new())));
    }
    Ok(None)
}

fn parse_hash(s: &str) -> anyhow::Result<Hash> {
    let bytes = hex::decode(s).with_context(|| format!("{s:?} is not valid hex"))?;
    if bytes.len() != 32 {
        bail!(CoreError::Malformed("input hash must decode to exactly 32 bytes"));
    }
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&bytes);
    Ok(hash)
}

fn append_rows<T: skipledger_core::SkipTable>(
    ledger: &SkipLedger<T>,
    cli: &Cli,
    cells_json: &str,
    salt_scheme_name: &str,
) -> anyhow::Result<u64> {
    let salter = match &cli.config {
        Some(path) => {
            let config = skipledger_config::Config::load(path)?;
            let seed = config.resolve_seed()?;
            if seed.is_empty() { Salter::null() } else { Salter::new(seed) }
        }
        None => Salter::null(),
    };

    let rows_json: serde_json::Value =
        serde_json::from_str(cells_json).context("--cells is not valid JSON")?;
    let rows_json = rows_json.as_array().context("--cells must be a JSON array of rows")?;

    let scheme = parse_salt_scheme(salt_scheme_name)?;
    let start_row = ledger.size() + 1;
    let mut digest = Digest::new();
    let mut hashes = Vec::with_capacity(rows_json.len());

    for (offset, row_value) in rows_json.iter().enumerate() {
        let cell_values = row_value.as_array().context("each row must be a JSON array of cells")?;
        let cells: Vec<Cell> =
            cell_values.iter().map(Cell::classify).collect::<Result<_, _>>()?;
        let row_number = start_row + offset as u64;
        let source_row = SourceRow::new(row_number, scheme.clone(), cells)?;
        hashes.push(source_row.input_hash(&salter, &mut digest)?);
    }

    Ok(ledger.append(&hashes)?)
}

fn parse_salt_scheme(name: &str) -> anyhow::Result<SaltScheme> {
    match name {
        "no_salt" => Ok(SaltScheme::NoSalt),
        "salt_all" => Ok(SaltScheme::SaltAll),
        other => bail!("unknown --salt-scheme {other:?}: expected no_salt or salt_all"),
    }
}

fn print_row<T: skipledger_core::SkipTable>(ledger: &SkipLedger<T>, n: u64) -> anyhow::Result<()> {
    let row = ledger.get_row(n)?;
    println!("row {}", row.number);
    println!("input_hash {}", hex::encode(row.input_hash));
    println!("row_hash {}", hex::encode(row.row_hash));
    println!("skip_count {}", row.skip_count());
    for (level, hash) in row.refs.iter().enumerate() {
        println!("ref[{level}] {}", hex::encode(hash));
    }
    Ok(())
}

fn print_path<T: skipledger_core::SkipTable>(
    ledger: &SkipLedger<T>,
    targets: &[u64],
) -> anyhow::Result<()> {
    let path = ledger.get_path(targets)?;
    for row in &path.rows {
        println!("{} {}", row.number, hex::encode(row.row_hash));
    }
    Ok(())
}

fn build_pack<T: skipledger_core::SkipTable>(
    ledger: &SkipLedger<T>,
    targets: &[u64],
    condensed: bool,
    out: Option<PathBuf>,
) -> anyhow::Result<()> {
    let path = ledger.get_path(targets)?;
    let pack = PathPack::for_path(&path, targets);
    let pack = if condensed { pack.condense() } else { pack };
    let bytes = pack.to_bytes();
    match out {
        Some(path) => std::fs::write(&path, &bytes)
            .with_context(|| format!("writing pack to {}", path.display()))?,
        None => println!("{}", hex::encode(&bytes)),
    }
    Ok(())
}

fn verify_pack(file: &PathBuf) -> anyhow::Result<()> {
    let bytes = std::fs::read(file).with_context(|| format!("reading pack {}", file.display()))?;
    let pack = PathPack::from_bytes(&bytes)?;
    if pack.verify()? {
        println!("valid");
        Ok(())
    } else {
        println!("invalid");
        bail!(skipledger_pack::Error::HashConflict(*pack.row_numbers().last().unwrap_or(&0)));
    }
}
