use bpmn_inject_config::DEFAULT_ID_SEED;

/// Hands out `{prefix}_{n}` identifiers from one counter shared by every
/// prefix. Existing document identifiers are not consulted, so a document
/// that already contains e.g. `Flow_1000` can collide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdGenerator {
    next: u64,
}

impl IdGenerator {
    pub fn new(seed: u64) -> Self {
        Self { next: seed }
    }

    pub fn next(&mut self, prefix: &str) -> String {
        let id = format!("{prefix}_{}", self.next);
        self.next += 1;
        id
    }

    /// The number the next identifier will carry.
    pub fn peek(&self) -> u64 {
        self.next
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_ID_SEED)
    }
}
