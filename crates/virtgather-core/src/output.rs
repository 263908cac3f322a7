//! Deterministic JSON output writer
//!
//! Sorted keys (BTree-backed maps) with fixed 4-space indentation, so two
//! runs over the same platform state produce byte-identical output.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use serde_json::Serializer;
use serde_json::ser::PrettyFormatter;

use crate::error::OutputError;

/// Serialize `value` as pretty JSON with a trailing newline
///
/// # Errors
/// Returns an [`OutputError`] when serialization or the underlying write
/// fails.
pub fn write_json<W: Write>(mut writer: W, value: &impl Serialize) -> Result<(), OutputError> {
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = Serializer::with_formatter(&mut writer, formatter);
    value.serialize(&mut serializer)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Write `value` to `outfile`, or to stdout when no file is given
///
/// # Errors
/// Returns an [`OutputError`] on serialization or I/O failure; this is the
/// only fatal failure mode of a run that got past input loading.
pub fn write_output(outfile: Option<&Path>, value: &impl Serialize) -> Result<(), OutputError> {
    match outfile {
        Some(path) => write_json(BufWriter::new(File::create(path)?), value),
        None => write_json(io::stdout().lock(), value),
    }
}
