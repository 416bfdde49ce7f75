//! Fidelity guard.
//!
//! Every table is checked before it is encoded into a record:
//! - it must be present and structurally consistent
//! - for text records, it must survive an encode/decode round trip unchanged
//! - for binary records, its timestamps must fit the blob format being written
//!
//! All checks are pure; nothing here touches storage.

use crate::codec::text::{self, Document, Layout};
use crate::config::CodecConfig;
use crate::error::FrameError;
use crate::model::{DType, Table, TimeUnit};

/// Rejects absent input.
pub fn ensure_table(table: Option<&Table>) -> Result<&Table, FrameError> {
    table.ok_or_else(|| FrameError::TypeMismatch("expected a table, got nothing".to_string()))
}

/// Rejects tables whose columns disagree with the row index, whose
/// categorical codes fall outside their categories, or whose column keys
/// collide once flattened with `separator`.
///
/// Tables edited through [`Table::column_mut`] can reach such a state.
pub fn check_structure(table: &Table, separator: &str) -> Result<(), FrameError> {
    table
        .check_shape_with(separator)
        .map_err(|e| FrameError::TypeMismatch(format!("not a consistent table: {e}")))
}

/// Proves that `table` survives the text encoding in `layout`.
///
/// Returns the verified document. Any encode or decode failure, or a decoded
/// table that differs from the input, is reported as
/// [`FrameError::Serialization`].
pub fn check_text(
    table: &Table,
    layout: Layout,
    config: &CodecConfig,
) -> Result<Document, FrameError> {
    check_structure(table, &config.separator)?;
    let rejected = |reason: String| FrameError::Serialization {
        table: table.to_string(),
        reason,
    };

    let doc =
        text::encode(table, layout, &config.separator).map_err(|e| rejected(e.to_string()))?;
    let decoded =
        text::decode(doc.clone(), &config.separator).map_err(|e| rejected(e.to_string()))?;
    if decoded != *table {
        let reason = first_difference(table, &decoded);
        log::debug!("`{layout}` layout is lossy for this table: {reason}");
        return Err(rejected(reason));
    }
    Ok(doc)
}

/// Rejects timestamp columns the configured blob format cannot hold.
pub fn check_binary(table: &Table, config: &CodecConfig) -> Result<(), FrameError> {
    if !config.precision_enforced {
        return Ok(());
    }
    for column in table.iter_columns() {
        if let DType::Timestamp(unit) = column.dtype() {
            if unit != TimeUnit::Nanosecond {
                return Err(FrameError::Precision(format!(
                    "column `{}` holds datetime64[{}] values, but blob format version {} \
                     stores nanoseconds only; convert it to datetime64[ns] before storing",
                    column.label,
                    unit.suffix(),
                    config.format_version
                )));
            }
        }
    }
    Ok(())
}

fn first_difference(expected: &Table, actual: &Table) -> String {
    if expected.index() != actual.index() {
        return "row labels changed".to_string();
    }
    if expected.columns() != actual.columns() {
        return "column labels changed".to_string();
    }
    for (want, got) in expected.iter_columns().zip(actual.iter_columns()) {
        if want.dtype() != got.dtype() {
            return format!(
                "column `{}` came back as {} instead of {}",
                want.label,
                got.dtype(),
                want.dtype()
            );
        }
        if want.data != got.data {
            return format!("column `{}` changed values", want.label);
        }
    }
    "tables differ".to_string()
}
