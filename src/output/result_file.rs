//! JSON result file
//!
//! The file always holds exactly one [`CategoryResult`]: each category
//! overwrites the previous one. Output is pretty-printed with four-space
//! indentation and non-ASCII text is written as-is.

use crate::model::CategoryResult;
use crate::Result;
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Serializes `result` into `writer`
pub fn write_result<W: Write>(result: &CategoryResult, writer: W) -> Result<()> {
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = Serializer::with_formatter(writer, formatter);
    result.serialize(&mut serializer)?;
    Ok(())
}

/// Overwrites the result file at `path` with `result`
///
/// # Arguments
///
/// * `result` - The category result to persist
/// * `path` - Path of the result file
///
/// # Returns
///
/// * `Ok(())` - File written and flushed
/// * `Err(HarvestError)` - The file could not be created or written
pub fn persist_result(result: &CategoryResult, path: &Path) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_result(result, &mut writer)?;
    writer.flush()?;

    tracing::info!(
        path = %path.display(),
        title = %result.title,
        products = result.products.len(),
        "Category result saved"
    );
    Ok(())
}

/// Reads a result file written by [`persist_result`]
pub fn load_result(path: &Path) -> Result<CategoryResult> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}
