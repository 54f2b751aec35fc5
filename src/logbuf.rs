/// Append-only sink for the log fragments of the active run.
///
/// Fragments are kept verbatim in arrival order; nothing is dropped,
/// reordered, or coalesced. Interpreting embedded control sequences is a
/// rendering concern, not this buffer's.
#[derive(Debug, Default)]
pub struct LogBuffer {
    fragments: Vec<String>,
}

impl LogBuffer {
    pub fn reset(&mut self) {
        self.fragments.clear();
    }

    pub fn append(&mut self, fragment: String) {
        self.fragments.push(fragment);
    }

    /// Read-only view for rendering; safe to call mid-run.
    pub fn snapshot(&self) -> &[String] {
        &self.fragments
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}
