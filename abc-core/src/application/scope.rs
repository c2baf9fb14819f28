// abc-core/src/application/scope.rs

use std::collections::BTreeMap;

/// Layered variable bindings: the base layer holds resolved inputs plus
/// builtins; each for_each pushes a frame with its iterator key. Inner
/// frames shadow outer ones; outer bindings stay visible.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    layers: Vec<BTreeMap<String, String>>,
}

impl Scope {
    pub fn new(base: BTreeMap<String, String>) -> Self {
        Self { layers: vec![base] }
    }

    pub fn push_frame(&mut self, key: String, value: String) {
        let mut frame = BTreeMap::new();
        frame.insert(key, value);
        self.layers.push(frame);
    }

    pub fn pop_frame(&mut self) {
        if self.layers.len() > 1 {
            self.layers.pop();
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.layers
            .iter()
            .rev()
            .find_map(|layer| layer.get(name).map(String::as_str))
    }

    /// One flat map for the template engine; inner frames win.
    pub fn flatten(&self) -> BTreeMap<String, String> {
        let mut flat = BTreeMap::new();
        for layer in &self.layers {
            for (k, v) in layer {
                flat.insert(k.clone(), v.clone());
            }
        }
        flat
    }
}
