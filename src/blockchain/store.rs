//! In-memory blockchain store with multi-block-per-height forks and an
//! orphan pool (§4.1).

use super::block::{Block, BlockId};

/// `blocks[height]` holds every block seen at that height (plural when a
/// fork exists); `orphans` holds blocks whose parent hasn't arrived yet.
///
/// Invariants upheld by every public method here (§8, invariants 1-2):
/// genesis is always present at height 0; every non-orphan block's parent
/// is either height 0 or present in `blocks`; `has` and `is_orphan` are
/// mutually exclusive for the same id.
#[derive(Clone, Debug)]
pub struct BlockchainStore {
    blocks: Vec<Vec<Block>>,
    orphans: Vec<Block>,
    total_blocks: u64,
}

impl Default for BlockchainStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockchainStore {
    pub fn new() -> Self {
        BlockchainStore {
            blocks: vec![vec![Block::genesis()]],
            orphans: Vec::new(),
            total_blocks: 1,
        }
    }

    /// Appends `block` to `blocks[block.height]`, inserting empty rows for
    /// any heights skipped between the previous top and this one.
    pub fn add(&mut self, block: Block) {
        let height = block.height as usize;
        while self.blocks.len() <= height {
            self.blocks.push(Vec::new());
        }
        self.blocks[height].push(block);
        self.total_blocks += 1;
    }

    pub fn add_orphan(&mut self, block: Block) {
        if !self.orphans.iter().any(|b| b.id() == block.id()) {
            self.orphans.push(block);
        }
    }

    pub fn remove_orphan(&mut self, id: BlockId) -> Option<Block> {
        let idx = self.orphans.iter().position(|b| b.id() == id)?;
        Some(self.orphans.remove(idx))
    }

    pub fn has(&self, id: BlockId) -> bool {
        let (height, miner_id) = id;
        self.blocks
            .get(height as usize)
            .is_some_and(|row| row.iter().any(|b| b.miner_id == miner_id))
    }

    pub fn has_block(&self, block: &Block) -> bool {
        self.has(block.id())
    }

    pub fn is_orphan(&self, id: BlockId) -> bool {
        self.orphans.iter().any(|b| b.id() == id)
    }

    pub fn blocks_at(&self, height: u64) -> &[Block] {
        self.blocks
            .get(height as usize)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn orphans(&self) -> &[Block] {
        &self.orphans
    }

    pub fn parent(&self, block: &Block) -> Option<&Block> {
        let (height, miner_id) = block.parent_id()?;
        self.blocks
            .get(height as usize)?
            .iter()
            .find(|b| b.miner_id == miner_id)
    }

    pub fn children(&self, block: &Block) -> Vec<&Block> {
        self.blocks
            .get(block.height as usize + 1)
            .map(|row| {
                row.iter()
                    .filter(|c| c.parent_miner_id == block.miner_id)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn orphan_children(&self, block: &Block) -> Vec<&Block> {
        self.orphans
            .iter()
            .filter(|c| c.is_child_of(block))
            .collect()
    }

    /// `blocks[max_height][0]` — first-seen wins among ties at the
    /// greatest height, giving deterministic chain selection without
    /// recomputing fork weights.
    pub fn current_top(&self) -> &Block {
        self.blocks
            .last()
            .and_then(|row| row.first())
            .expect("genesis row is never empty")
    }

    pub fn return_block(&self, height: u64, miner_id: u64) -> Option<Block> {
        if let Some(row) = self.blocks.get(height as usize) {
            if let Some(b) = row.iter().find(|b| b.miner_id == miner_id) {
                return Some(b.clone());
            }
        }
        self.orphans
            .iter()
            .find(|b| b.height == height && b.miner_id == miner_id)
            .cloned()
    }

    pub fn total_blocks(&self) -> u64 {
        self.total_blocks
    }

    /// Number of distinct heights at which more than one block exists.
    pub fn fork_count(&self) -> usize {
        self.blocks.iter().filter(|row| row.len() > 1).count()
    }

    /// Total blocks that are *not* on the currently-selected chain at
    /// their height (i.e. every entry in a fork row past the first).
    pub fn blocks_in_forks(&self) -> usize {
        self.blocks
            .iter()
            .map(|row| row.len().saturating_sub(1))
            .sum()
    }

    /// Length, in blocks, of the longest fork row at any height.
    pub fn longest_fork(&self) -> usize {
        self.blocks.iter().map(|row| row.len()).max().unwrap_or(1)
    }
}
