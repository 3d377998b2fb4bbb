/// Visited marks for graph traversal, reset in O(1) by bumping an epoch.
///
/// A node counts as visited when its slot holds the current epoch. The slots
/// are only zeroed when the `u16` epoch wraps.
#[derive(Debug, Default)]
pub(crate) struct VisitedSet {
    marks: Vec<u16>,
    epoch: u16,
}

impl VisitedSet {
    pub(crate) fn with_capacity(nodes: usize) -> Self {
        Self {
            marks: vec![0; nodes],
            epoch: 1,
        }
    }

    /// Forget every mark and make room for `nodes` ids.
    pub(crate) fn reset(&mut self, nodes: usize) {
        if self.marks.len() < nodes {
            self.marks.resize(nodes, 0);
        }
        self.epoch = self.epoch.wrapping_add(1);
        if self.epoch == 0 {
            self.marks.fill(0);
            self.epoch = 1;
        }
    }

    /// Mark `id`; returns `false` if it was already marked in this epoch.
    #[inline]
    pub(crate) fn visit(&mut self, id: u32) -> bool {
        let slot = &mut self.marks[id as usize];
        if *slot == self.epoch {
            return false;
        }
        *slot = self.epoch;
        true
    }
}
