use clap::{ArgGroup, Parser};
use std::os::unix::ffi::OsStrExt;
use std::path::PathBuf;

use haf::{append, concatenate, create, delete, extract, list, ArchiveError, HammingOptions};

#[derive(Parser)]
#[command(name = "haf", version = "1.0.0", about = "Hamming-protected archive CLI")]
#[command(group(
    ArgGroup::new("mode")
        .required(true)
        .multiple(false)
        .args(["create", "list_mode", "extract_mode", "append_mode", "delete_mode", "concatenate"])
))]
struct Cli {
    #[arg(short, long)]
    create: bool,

    #[arg(short = 'l', long = "list")]
    list_mode: bool,

    #[arg(short = 'x', long = "extract")]
    extract_mode: bool,

    #[arg(short, long = "append")]
    append_mode: bool,

    #[arg(short, long = "delete")]
    delete_mode: bool,

    #[arg(short = 'A', long)]
    concatenate: bool,

    /// Archive path
    #[arg(short = 'f', long = "file", required = true)]
    file: PathBuf,

    /// Hamming data bits (k)
    #[arg(short = 'D', long = "hamming-data-bits", default_value_t = 8)]
    hamming_data_bits: u8,

    /// Hamming parity bits (r)
    #[arg(short = 'P', long = "hamming-parity-bits", default_value_t = 4)]
    hamming_parity_bits: u8,

    /// Meaning depends on mode: inputs for create/append, targets for
    /// extract/delete, source archives for concatenate.
    positional: Vec<PathBuf>,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("haf: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), ArchiveError> {
    let cli = Cli::parse();

    let options = HammingOptions::new(cli.hamming_data_bits, cli.hamming_parity_bits)?;

    if cli.create {
        require_min_positionals(&cli.positional, 1, "create")?;
        create(&cli.file, options, &cli.positional)?;
    } else if cli.list_mode {
        for info in list(&cli.file)? {
            println!("{} ({} bytes)", info.display_name(), info.original_size);
        }
    } else if cli.extract_mode {
        let names = paths_to_name_bytes(&cli.positional);
        extract(&cli.file, options, &names)?;
    } else if cli.append_mode {
        require_min_positionals(&cli.positional, 1, "append")?;
        append(&cli.file, options, &cli.positional)?;
    } else if cli.delete_mode {
        require_min_positionals(&cli.positional, 1, "delete")?;
        let names = paths_to_name_bytes(&cli.positional);
        delete(&cli.file, &names)?;
    } else if cli.concatenate {
        require_min_positionals(&cli.positional, 2, "concatenate")?;
        concatenate(&cli.file, &cli.positional)?;
    }

    Ok(())
}

fn require_min_positionals(positionals: &[PathBuf], min: usize, mode: &str) -> Result<(), ArchiveError> {
    if positionals.len() < min {
        return Err(ArchiveError::InvalidArguments(format!(
            "--{mode} requires at least {min} file argument(s)"
        )));
    }
    Ok(())
}

fn paths_to_name_bytes(paths: &[PathBuf]) -> Vec<Vec<u8>> {
    paths.iter().map(|p| p.as_os_str().as_bytes().to_vec()).collect()
}
