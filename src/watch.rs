use std::path::{Path, PathBuf};

use crossbeam_channel::{Receiver, unbounded};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use strata_blocks::{BlockRegistry, SharedBlocks};

/// Watches the block table file and reports changes. The watcher stops when
/// this is dropped.
pub struct BlocksWatcher {
    path: PathBuf,
    rx: Receiver<()>,
    _watcher: RecommendedWatcher,
}

impl BlocksWatcher {
    pub fn start(path: &Path) -> notify::Result<Self> {
        let (tx, rx) = unbounded::<()>();
        let mut watcher =
            notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
                if let Ok(event) = res {
                    match event.kind {
                        EventKind::Modify(_)
                        | EventKind::Create(_)
                        | EventKind::Remove(_)
                        | EventKind::Any => {
                            let _ = tx.send(());
                        }
                        _ => {}
                    }
                }
            })?;
        watcher.watch(path, RecursiveMode::NonRecursive)?;
        log::info!("watching {} for block table changes", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            rx,
            _watcher: watcher,
        })
    }

    /// Reloads the table if any change arrived since the last poll. Editors
    /// often emit several events per save; they collapse into one reload.
    pub fn poll(&self, blocks: &SharedBlocks) -> bool {
        if self.rx.try_iter().count() == 0 {
            return false;
        }
        reload_blocks(&self.path, blocks)
    }
}

/// Swaps in the table at `path`. A bad file keeps the current table.
pub fn reload_blocks(path: &Path, blocks: &SharedBlocks) -> bool {
    match BlockRegistry::load_from_path(path) {
        Ok(reg) => {
            log::info!(
                "reloaded {} block types from {}",
                reg.defined_count(),
                path.display()
            );
            blocks.replace(reg);
            true
        }
        Err(e) => {
            log::warn!("keeping current block table: {e}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn bad_table_keeps_current() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blocks.toml");
        let blocks = SharedBlocks::default();
        let before = blocks.current().defined_count();

        fs::write(&path, "[[block]]\nid = \"x\"\n").unwrap();
        assert!(!reload_blocks(&path, &blocks));
        assert_eq!(blocks.current().defined_count(), before);

        fs::write(
            &path,
            "[[block]]\nid = 0\nname = \"air\"\n\n[[block]]\nid = 1\nname = \"rock\"\n",
        )
        .unwrap();
        assert!(reload_blocks(&path, &blocks));
        assert_eq!(blocks.current().defined_count(), 2);
        assert_eq!(blocks.current().id_by_name("rock"), Some(1));
    }

    #[test]
    fn shipped_table_matches_classic() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("blocks.toml");
        let shipped = BlockRegistry::load_from_path(&path).unwrap();
        let classic = BlockRegistry::classic();
        assert_eq!(shipped.defined_count(), classic.defined_count());
        for id in 0..50u8 {
            let (a, b) = (shipped.get(id), classic.get(id));
            assert_eq!(a.name, b.name);
            assert_eq!(a.behavior(), b.behavior(), "block {id}");
            assert_eq!((a.rank_place, a.rank_delete), (b.rank_place, b.rank_delete));
        }
    }
}
