//! Basic blocks and the per-method block arena

use crate::error::{CompileError, CompileResult};
use crate::lir::Op;
use std::fmt;

/// Stable block identifier; never invalidated by later insertions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u32);

impl BlockId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn as_u32(self) -> u32 {
        self.0
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bb{}", self.0)
    }
}

/// A straight-line run of ops and a jump target
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Block {
    ops: Vec<Op>,
    label: Option<String>,
}

impl Block {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block with a debug label
    pub fn with_label(label: impl Into<String>) -> Self {
        Self {
            ops: Vec::new(),
            label: Some(label.into()),
        }
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = Some(label.into());
    }

    pub fn push(&mut self, op: Op) {
        self.ops.push(op);
    }

    pub fn extend(&mut self, ops: impl IntoIterator<Item = Op>) {
        self.ops.extend(ops);
    }

    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Whether the last op never falls through
    pub fn is_terminated(&self) -> bool {
        self.ops.last().map_or(false, Op::is_terminator)
    }
}

/// Block arena plus layout order.
///
/// Blocks are addressed by [`BlockId`] (their arena index). The layout list
/// fixes emission order; a block can be reserved in the arena before it is
/// placed, so forward jump targets exist before their code does.
#[derive(Debug, Clone, Default)]
pub struct Body {
    blocks: Vec<Block>,
    placed: Vec<bool>,
    layout: Vec<BlockId>,
}

impl Body {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a block without placing it in the layout
    pub fn reserve_block(&mut self) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(Block::new());
        self.placed.push(false);
        id
    }

    /// Allocate a block at the end of the layout
    pub fn new_block(&mut self) -> BlockId {
        let id = self.reserve_block();
        self.placed[id.index()] = true;
        self.layout.push(id);
        id
    }

    /// Append a reserved block to the layout
    pub fn place_block(&mut self, id: BlockId) -> CompileResult<()> {
        match self.placed.get_mut(id.index()) {
            Some(placed) if !*placed => {
                *placed = true;
                self.layout.push(id);
                Ok(())
            }
            Some(_) => Err(CompileError::internal(format!("{} placed twice", id))),
            None => Err(CompileError::UnknownBlock { block: id }),
        }
    }

    /// Allocate a block directly after `after` in the layout
    pub fn insert_block_after(&mut self, after: BlockId) -> CompileResult<BlockId> {
        let position = self
            .position(after)
            .ok_or(CompileError::UnknownBlock { block: after })?;
        let id = self.reserve_block();
        self.placed[id.index()] = true;
        self.layout.insert(position + 1, id);
        Ok(id)
    }

    pub fn block(&self, id: BlockId) -> CompileResult<&Block> {
        self.blocks
            .get(id.index())
            .ok_or(CompileError::UnknownBlock { block: id })
    }

    pub fn block_mut(&mut self, id: BlockId) -> CompileResult<&mut Block> {
        self.blocks
            .get_mut(id.index())
            .ok_or(CompileError::UnknownBlock { block: id })
    }

    pub fn layout(&self) -> &[BlockId] {
        &self.layout
    }

    /// Position of a placed block in the layout
    pub fn position(&self, id: BlockId) -> Option<usize> {
        if !self.is_placed(id) {
            return None;
        }
        self.layout.iter().position(|&b| b == id)
    }

    pub fn is_placed(&self, id: BlockId) -> bool {
        self.placed.get(id.index()).copied().unwrap_or(false)
    }

    /// Last block in layout order
    pub fn last(&self) -> Option<BlockId> {
        self.layout.last().copied()
    }

    /// Placed blocks in layout order
    pub fn iter(&self) -> impl Iterator<Item = (BlockId, &Block)> + '_ {
        self.layout.iter().map(move |&id| (id, &self.blocks[id.index()]))
    }

    /// Number of placed blocks
    pub fn len(&self) -> usize {
        self.layout.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layout.is_empty()
    }
}
