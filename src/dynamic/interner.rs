use super::change::Label;
use crate::graph::VertexId;
use hashbrown::HashMap;

/// Maps external labels to dense vertex ids in first-seen order.
///
/// Labels are never forgotten: a pruned vertex that reappears gets its old id.
#[derive(Debug, Clone, Default)]
pub struct LabelInterner {
    ids: HashMap<Label, VertexId>,
    labels: Vec<Label>,
}

impl LabelInterner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of `label`, assigning the next free id on first sight.
    pub fn intern(&mut self, label: Label) -> VertexId {
        if let Some(&id) = self.ids.get(&label) {
            return id;
        }
        let id = self.labels.len();
        self.labels.push(label);
        self.ids.insert(label, id);
        id
    }

    #[inline]
    pub fn get(&self, label: Label) -> Option<VertexId> {
        self.ids.get(&label).copied()
    }

    #[inline]
    pub fn label(&self, id: VertexId) -> Option<Label> {
        self.labels.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// `(id, label)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (VertexId, Label)> + '_ {
        self.labels.iter().copied().enumerate()
    }
}
