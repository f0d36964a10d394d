use std::{
    fs::{self, File},
    io::{self, BufWriter},
    path::{Path, PathBuf},
    rc::Rc,
};

use tracing::{debug, info};

use crate::{
    analyze::ErrorVec,
    synthesize::{HackAssembler, MachineCode, encode::Encoder},
};

pub mod analyze;
pub mod synthesize;

/// Extension given to assembled output files.
pub const OUTPUT_EXTENSION: &str = "hack";

#[derive(Debug, thiserror::Error)]
pub enum AssembleError {
    #[error("could not read {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not write {}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("refusing to overwrite input {} with its own output", .path.display())]
    SameFile { path: PathBuf },
    #[error("assembly failed with {0} error(s)")]
    Failed(usize),
}

/// Output path for `input`: same path with its extension replaced by `.hack`.
pub fn output_path(input: impl AsRef<Path>) -> PathBuf {
    input.as_ref().with_extension(OUTPUT_EXTENSION)
}

#[derive(Default)]
pub struct Assembler {
    encoder: Encoder,
}

impl Assembler {
    pub fn new(encoder: Encoder) -> Self {
        Self { encoder }
    }

    /// Assembles the file at `path` into `out_path`.
    ///
    /// Both files are opened before any translation happens, and `out_path` must not be the
    /// input itself. Diagnostics are printed to stderr and nothing is left at `out_path` when
    /// assembly or writing fails.
    pub fn assemble(
        &self,
        path: impl AsRef<Path>,
        out_path: impl AsRef<Path>,
    ) -> Result<MachineCode, AssembleError> {
        let path = path.as_ref();
        let out_path = out_path.as_ref();

        let read_err = |source: io::Error| AssembleError::Read {
            path: path.to_owned(),
            source,
        };
        let source = fs::read_to_string(path).map_err(read_err)?;

        let input = fs::canonicalize(path).map_err(read_err)?;
        if fs::canonicalize(out_path).is_ok_and(|output| output == input) {
            return Err(AssembleError::SameFile {
                path: path.to_owned(),
            });
        }

        let out_file = File::create(out_path).map_err(|source| AssembleError::Write {
            path: out_path.to_owned(),
            source,
        })?;

        let source_name = Rc::new(
            path.file_name()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or(String::from("unknown")),
        );

        info!(input = %path.display(), output = %out_path.display(), "assembling");

        let code = match self.assemble_source(&source) {
            Ok(code) => code,
            Err(errors) => {
                errors.dump(source_name, &source);
                drop(out_file);
                discard(out_path);
                return Err(AssembleError::Failed(errors.len()));
            }
        };

        keep_if_written(out_path, code.write_to(BufWriter::new(out_file)))?;

        Ok(code)
    }

    pub fn assemble_source(&self, source: &str) -> Result<MachineCode, ErrorVec> {
        HackAssembler::new(&self.encoder).assemble(source)
    }
}

/// Turns a failed write into [AssembleError::Write], removing what was written so far.
fn keep_if_written(out_path: &Path, written: io::Result<()>) -> Result<(), AssembleError> {
    written.map_err(|source| {
        discard(out_path);
        AssembleError::Write {
            path: out_path.to_owned(),
            source,
        }
    })
}

/// Removes an incomplete output file.
fn discard(out_path: &Path) {
    if let Err(err) = fs::remove_file(out_path) {
        debug!(%err, path = %out_path.display(), "could not remove incomplete output");
    }
}
