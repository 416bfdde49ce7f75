//! Row and column labels.

use std::fmt;

/// A single row or column label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Label {
    /// Integer label (the default for range indexes).
    Int(i64),
    /// String label.
    Str(String),
    /// Multi-level label, one component per level.
    Tuple(Vec<Label>),
}

impl Label {
    /// Builds a multi-level label from its components.
    pub fn tuple<I, L>(parts: I) -> Label
    where
        I: IntoIterator<Item = L>,
        L: Into<Label>,
    {
        Label::Tuple(parts.into_iter().map(Into::into).collect())
    }

    /// Returns true for multi-level labels.
    pub fn is_tuple(&self) -> bool {
        matches!(self, Label::Tuple(_))
    }

    /// Number of levels this label spans.
    pub fn width(&self) -> usize {
        match self {
            Label::Tuple(parts) => parts.len(),
            _ => 1,
        }
    }

    /// Returns the flat string key of this label.
    ///
    /// Tuple components are joined with `separator`; components are assumed
    /// never to contain it.
    pub fn flat_key(&self, separator: &str) -> String {
        match self {
            Label::Int(v) => v.to_string(),
            Label::Str(s) => s.clone(),
            Label::Tuple(parts) => parts
                .iter()
                .map(|p| p.flat_key(separator))
                .collect::<Vec<_>>()
                .join(separator),
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Int(v) => write!(f, "{v}"),
            Label::Str(s) => f.write_str(s),
            Label::Tuple(parts) => {
                f.write_str("(")?;
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{part}")?;
                }
                f.write_str(")")
            }
        }
    }
}

impl From<i64> for Label {
    fn from(v: i64) -> Self {
        Label::Int(v)
    }
}

impl From<&str> for Label {
    fn from(s: &str) -> Self {
        Label::Str(s.to_string())
    }
}

impl From<String> for Label {
    fn from(s: String) -> Self {
        Label::Str(s)
    }
}

impl From<(&str, &str)> for Label {
    fn from((a, b): (&str, &str)) -> Self {
        Label::tuple([a, b])
    }
}

/// An ordered sequence of row or column labels.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Index {
    labels: Vec<Label>,
}

impl Index {
    /// Creates an index from labels.
    pub fn new(labels: Vec<Label>) -> Self {
        Self { labels }
    }

    /// Creates the integer index `0..len`.
    pub fn range(len: usize) -> Self {
        Self {
            labels: (0..len as i64).map(Label::Int).collect(),
        }
    }

    /// Creates a multi-level index from tuples of components.
    pub fn from_tuples<I, T, L>(tuples: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: IntoIterator<Item = L>,
        L: Into<Label>,
    {
        Self {
            labels: tuples.into_iter().map(Label::tuple).collect(),
        }
    }

    /// Returns the labels.
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// Consumes the index and returns its labels.
    pub fn into_labels(self) -> Vec<Label> {
        self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<&Label> {
        self.labels.get(i)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Label> {
        self.labels.iter()
    }

    /// Returns the position of the first occurrence of `label`.
    pub fn position(&self, label: &Label) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    /// Returns true when any label is a tuple.
    pub fn is_multilevel(&self) -> bool {
        self.labels.iter().any(Label::is_tuple)
    }

    /// Number of levels (the widest label).
    pub fn nlevels(&self) -> usize {
        self.labels.iter().map(Label::width).max().unwrap_or(1)
    }
}

impl FromIterator<Label> for Index {
    fn from_iter<I: IntoIterator<Item = Label>>(iter: I) -> Self {
        Self {
            labels: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Index {
    type Item = &'a Label;
    type IntoIter = std::slice::Iter<'a, Label>;

    fn into_iter(self) -> Self::IntoIter {
        self.labels.iter()
    }
}
