//! Label flattening.
//!
//! Multi-level labels are turned into flat string keys by joining their
//! components with a separator, and split back on decode. Components are
//! assumed never to contain the separator; this is not checked.

use crate::model::{Index, Label};

/// Separator joining the components of a multi-level label.
pub const DEFAULT_SEPARATOR: &str = "___";

/// Flattens an index into string keys.
///
/// Returns the keys and whether the index was multi-level.
pub fn flatten(index: &Index, separator: &str) -> (Vec<String>, bool) {
    let keys = index.iter().map(|label| label.flat_key(separator)).collect();
    (keys, index.is_multilevel())
}

/// Restores an index from flattened keys.
///
/// With `is_multilevel` false the keys come back as string labels
/// unchanged. Otherwise each key is split on `separator` into a tuple of
/// string components; a key without the separator stays a flat label.
pub fn unflatten(keys: &[String], is_multilevel: bool, separator: &str) -> Index {
    keys.iter()
        .map(|key| {
            if is_multilevel {
                unflatten_key(key, separator)
            } else {
                Label::Str(key.clone())
            }
        })
        .collect()
}

/// Splits one flattened key into a tuple label.
pub fn unflatten_key(key: &str, separator: &str) -> Label {
    if separator.is_empty() || !key.contains(separator) {
        return Label::Str(key.to_string());
    }
    Label::tuple(key.split(separator))
}
