// abc-core/src/infrastructure/yamlpos.rs
//
// Position index over a YAML document. The typed decode goes through
// serde_yaml; this sidecar parse (marked-yaml) keeps the source spans so
// validation errors can point into the file.

use marked_yaml::Node;

use crate::domain::api::{PosLookup, Seg};
use crate::domain::position::Position;

pub struct PosIndex {
    file: String,
    root: Option<Node>,
}

impl PosIndex {
    /// Parses `src` for spans. A document that serde_yaml already accepted
    /// is expected to parse here too; if it somehow does not, the index is
    /// empty and every lookup resolves to the unknown position.
    pub fn new(file: impl Into<String>, src: &str) -> Self {
        Self {
            file: file.into(),
            root: marked_yaml::parse_yaml(0, src).ok(),
        }
    }

    pub fn empty(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            root: None,
        }
    }

    fn node_at(&self, path: &[Seg]) -> Option<&Node> {
        let mut node = self.root.as_ref()?;
        for seg in path {
            node = match seg {
                Seg::K(key) => node.as_mapping()?.get_node(key)?,
                Seg::I(i) => node.as_sequence()?.get(*i)?,
            };
        }
        Some(node)
    }
}

impl PosLookup for PosIndex {
    fn lookup(&self, path: &[Seg]) -> Position {
        match self.node_at(path).and_then(|n| n.span().start()) {
            Some(marker) => Position::new(self.file.clone(), marker.line(), marker.column()),
            None => Position::default(),
        }
    }
}
