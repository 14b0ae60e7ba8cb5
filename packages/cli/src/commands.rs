//! The `iondg` subcommands.
//!
//! - `dump <file>` - print the user values, one per line
//! - `dump --system <file>` - print every physical value with its kind
//! - `dump --json <file>` - print the user values as JSON
//! - `stats <file>` - summarize the datagram as JSON
//! - `normalize <input> <output>` - write the synchronized encoding

use std::io::Write;
use std::path::{Path, PathBuf};

use iondg_core::{Datagram, ValueKind};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::json::element_to_json;

/// Errors surfaced to the user by the CLI.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("{path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Datagram(#[from] iondg_core::Error),

    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),

    #[error("failed to render JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CliError>;

/// Summary printed by `stats`.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct Stats {
    pub user_values: usize,
    pub system_values: usize,
    pub version_markers: usize,
    pub symbol_table_structs: usize,
    pub bytes: usize,
    pub tables: Vec<TableStats>,
}

/// One symbol table that the document needs.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct TableStats {
    pub max_id: u32,
    pub imports: Vec<String>,
    pub local_symbols: usize,
}

/// Read and materialize a datagram file.
pub fn load(path: &Path) -> Result<Datagram> {
    let bytes = std::fs::read(path).map_err(|source| CliError::File {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), bytes = bytes.len(), "loaded file");
    Ok(Datagram::from_bytes(&bytes)?)
}

pub fn dump(path: &Path, system: bool, json: bool, out: &mut dyn Write) -> Result<()> {
    let datagram = load(path)?;

    if system {
        for id in datagram.system_ids() {
            let kind = datagram.kind(id)?;
            let element = datagram.value(id)?;
            writeln!(out, "{:<16} {}", kind_label(kind), element)?;
        }
        return Ok(());
    }

    for element in datagram.iter() {
        let element = element?;
        if json {
            writeln!(out, "{}", serde_json::to_string(&element_to_json(element))?)?;
        } else {
            writeln!(out, "{}", element)?;
        }
    }
    Ok(())
}

fn kind_label(kind: ValueKind) -> &'static str {
    match kind {
        ValueKind::VersionMarker => "version-marker",
        ValueKind::SymbolTable => "symbol-table",
        ValueKind::EmbeddedValue => "embedded-value",
        ValueKind::User => "user",
    }
}

pub fn stats(path: &Path) -> Result<Stats> {
    let mut datagram = load(path)?;
    let bytes = datagram.byte_size()?;

    let mut version_markers = 0;
    let mut symbol_table_structs = 0;
    for id in datagram.system_ids() {
        match datagram.kind(id)? {
            ValueKind::VersionMarker => version_markers += 1,
            ValueKind::SymbolTable => symbol_table_structs += 1,
            _ => {}
        }
    }

    let tables = datagram
        .symbol_tables()
        .into_iter()
        .filter_map(|symtab| datagram.symbol_table(symtab))
        .filter(|table| table.is_needed())
        .map(|table| TableStats {
            max_id: table.max_id(),
            imports: table.imports().iter().map(|i| i.name.clone()).collect(),
            local_symbols: table.local_symbols().count(),
        })
        .collect();

    Ok(Stats {
        user_values: datagram.len(),
        system_values: datagram.system_len(),
        version_markers,
        symbol_table_structs,
        bytes,
        tables,
    })
}

/// Rewrite `input` in synchronized form. Returns the bytes written.
pub fn normalize(input: &Path, output: &Path) -> Result<usize> {
    let mut datagram = load(input)?;
    let mut file = std::fs::File::create(output).map_err(|source| CliError::File {
        path: output.to_path_buf(),
        source,
    })?;
    let written = datagram.write_to(&mut file)?;
    info!(
        input = %input.display(),
        output = %output.display(),
        bytes = written,
        "normalized datagram"
    );
    Ok(written)
}
