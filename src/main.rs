use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
    process::ExitCode,
};

use clap::{ArgAction, Parser};
use colored::Colorize;
use hackasm::{AssembleError, Assembler, analyze, output_path, synthesize::encode::Encoder};
use tracing::Level;

#[derive(Parser)]
#[command(version, about = "Assembles Hack assembly into Hack machine code")]
struct Cli {
    /// Assembly source, asked for interactively when omitted
    file: Option<PathBuf>,

    /// Output file [default: FILE with a .hack extension]
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Directory holding comp.table, dest.table and jump.table
    #[arg(long, value_name = "DIR")]
    codes: Option<PathBuf>,

    /// More logging, repeat for more detail
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let args = Cli::parse();

    let level = match args.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {err}", "error:".bright_red().bold());
            err.exit_code()
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum Error {
    #[error("could not load mnemonic tables: {0}")]
    Codes(analyze::Error),
    #[error("no input file given")]
    NoInput,
    #[error("could not read file name: {0}")]
    Prompt(#[from] io::Error),
    #[error("{0}")]
    Assemble(#[from] AssembleError),
}

impl Error {
    fn exit_code(&self) -> ExitCode {
        let code = match self {
            Error::Codes(_) => 1,
            Error::NoInput | Error::Prompt(_) | Error::Assemble(AssembleError::Read { .. }) => 2,
            Error::Assemble(AssembleError::Write { .. } | AssembleError::SameFile { .. }) => 3,
            Error::Assemble(AssembleError::Failed(_)) => 4,
        };

        ExitCode::from(code)
    }
}

fn run(args: Cli) -> Result<(), Error> {
    let encoder = match &args.codes {
        Some(dir) => Encoder::load(dir).map_err(Error::Codes)?,
        None => Encoder::default(),
    };

    let file = match args.file {
        Some(file) => file,
        None => prompt_file()?,
    };
    let output = args.output.unwrap_or_else(|| output_path(&file));

    let assembler = Assembler::new(encoder);
    if let Err(err) = assembler.assemble(&file, &output) {
        if let AssembleError::Read { source, .. } | AssembleError::Write { source, .. } = &err {
            eprintln!("{} {source}", "cause:".bright_red());
        }
        return Err(err.into());
    }

    println!(
        "{:>12} {} -> {}",
        "Assembled".bright_green(),
        file.display(),
        output.display()
    );

    Ok(())
}

fn prompt_file() -> Result<PathBuf, Error> {
    let mut stdout = io::stdout();
    writeln!(stdout, "Please enter the assembly file you would like to assemble.")?;
    write!(stdout, "Don't forget the .asm extension: ")?;
    stdout.flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;

    let name = line.trim();
    if name.is_empty() {
        return Err(Error::NoInput);
    }

    Ok(PathBuf::from(name))
}
