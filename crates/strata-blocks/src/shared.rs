use std::sync::Arc;

use parking_lot::RwLock;

use crate::registry::BlockRegistry;

/// Swappable handle to the current block table. Readers take a cheap `Arc`
/// snapshot; a reload replaces the table for later readers only.
#[derive(Clone, Debug)]
pub struct SharedBlocks {
    inner: Arc<RwLock<Arc<BlockRegistry>>>,
}

impl SharedBlocks {
    pub fn new(reg: BlockRegistry) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(reg))),
        }
    }

    #[inline]
    pub fn current(&self) -> Arc<BlockRegistry> {
        Arc::clone(&self.inner.read())
    }

    pub fn replace(&self, reg: BlockRegistry) {
        *self.inner.write() = Arc::new(reg);
    }
}

impl Default for SharedBlocks {
    fn default() -> Self {
        Self::new(BlockRegistry::classic())
    }
}
