use crate::codec::text::{self, Document, Layout, ORIENT_KEY};
use crate::codec::{Codec, TextCodec};
use crate::error::FrameError;
use crate::model::Table;
use crate::record::TEXT_KIND;
use crate::store::{AttributeStore, Node, Storable};
use crate::validate;

/// A table stored as a JSON document, one attribute per top-level key.
///
/// The table is re-decoded from the attributes on every read; nothing is
/// cached.
#[derive(Debug, Clone)]
pub struct TextFrameRecord {
    node: Node,
    codec: TextCodec,
}

impl TextFrameRecord {
    /// Creates a draft record holding `table` in `layout`.
    ///
    /// Fails with [`FrameError::TypeMismatch`] when `table` is absent and with
    /// [`FrameError::Serialization`] when the layout cannot hold it exactly.
    pub fn new<'t>(
        table: impl Into<Option<&'t Table>>,
        layout: Layout,
    ) -> Result<Self, FrameError> {
        let table = validate::ensure_table(table.into())?;
        let mut record = Self {
            node: Node::new(TEXT_KIND),
            codec: TextCodec::new(layout),
        };
        record.set_table(table)?;
        Ok(record)
    }

    /// Wraps a node written by a text frame record.
    pub fn from_node(node: Node) -> Result<Self, FrameError> {
        if node.kind() != TEXT_KIND {
            return Err(FrameError::TypeMismatch(format!(
                "node {} holds `{}`, not a text frame",
                node.uuid(),
                node.kind()
            )));
        }
        let layout = match node.get_attribute(ORIENT_KEY) {
            None => Layout::default(),
            Some(value) => value
                .as_str()
                .and_then(Layout::parse)
                .ok_or_else(|| FrameError::Deserialization(format!("unknown layout {value}")))?,
        };
        Ok(Self {
            node,
            codec: TextCodec::new(layout),
        })
    }

    /// Decodes the stored table.
    pub fn table(&self) -> Result<Table, FrameError> {
        let doc: Document = self
            .node
            .attributes()
            .into_iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect();
        text::decode(doc, &self.codec.separator)
    }

    /// Replaces the stored table. Only drafts accept this.
    pub fn set_table(&mut self, table: &Table) -> Result<(), FrameError> {
        if self.node.is_stored() {
            return Err(FrameError::ModificationNotAllowed);
        }
        let doc = self.codec.encode(table)?;
        self.node.clear_attributes()?;
        for (key, value) in doc {
            self.node.set_attribute(&key, value)?;
        }
        Ok(())
    }

    pub fn layout(&self) -> Layout {
        self.codec.layout
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn into_node(self) -> Node {
        self.node
    }
}

impl Storable for TextFrameRecord {
    fn node(&self) -> &Node {
        &self.node
    }

    fn node_mut(&mut self) -> &mut Node {
        &mut self.node
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Label, TableBuilder};
    use crate::store::Repository;
    use serde_json::json;

    fn table() -> Table {
        TableBuilder::new()
            .float64("A", [1.0, 2.0, 3.0])
            .text("F", ["foo", "bar", "baz"])
            .build()
            .unwrap()
    }

    #[test]
    fn test_attributes_mirror_document() {
        let record = TextFrameRecord::new(&table(), Layout::Table).unwrap();
        let node = record.node();
        assert_eq!(node.get_attribute("_orient"), Some(&json!("table")));
        assert_eq!(node.get_attribute("_multiindex"), Some(&json!(false)));
        assert_eq!(node.get_attribute("columns"), Some(&json!(["A", "F"])));
        assert_eq!(node.get_attribute("index"), Some(&json!([0, 1, 2])));
        assert!(node.get_attribute("schema").is_some());
        assert_eq!(record.table().unwrap(), table());
    }

    #[test]
    fn test_absent_table() {
        let result = TextFrameRecord::new(None::<&Table>, Layout::Table);
        assert!(matches!(result, Err(FrameError::TypeMismatch(_))));
    }

    #[test]
    fn test_set_table_replaces_attributes() {
        let mut record = TextFrameRecord::new(&table(), Layout::Table).unwrap();
        let other = TableBuilder::new().int64("B", [7]).build().unwrap();
        record.set_table(&other).unwrap();
        assert_eq!(record.table().unwrap(), other);
        assert_eq!(record.node().get_attribute("columns"), Some(&json!(["B"])));
    }

    #[test]
    fn test_stored_record_is_immutable() {
        let mut repository = Repository::new();
        let mut record = TextFrameRecord::new(&table(), Layout::Records).unwrap();
        let uuid = repository.store(&mut record).unwrap();

        let other = TableBuilder::new().int64("B", [7]).build().unwrap();
        assert!(matches!(record.set_table(&other), Err(FrameError::ModificationNotAllowed)));
        assert_eq!(record.table().unwrap(), table());

        let loaded = TextFrameRecord::from_node(repository.load(uuid).unwrap()).unwrap();
        assert_eq!(loaded.layout(), Layout::Records);
        assert_eq!(loaded.table().unwrap(), table());
        assert_eq!(
            loaded.table().unwrap().get(1, &Label::from("F")),
            Some(crate::model::Cell::Text("bar".into()))
        );
    }

    #[test]
    fn test_from_node_checks_kind() {
        let node = Node::new("something.else");
        assert!(matches!(
            TextFrameRecord::from_node(node),
            Err(FrameError::TypeMismatch(_))
        ));
    }
}
