//! Basic block representation.

use super::instruction::Inst;

/// A straight-line sequence of instructions ending in one terminator.
#[derive(Debug, Clone, PartialEq)]
pub struct BasicBlock {
    name: Option<String>,
    body: Vec<Inst>,
    terminator: Option<Inst>,
}

impl BasicBlock {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            body: Vec::new(),
            terminator: None,
        }
    }

    pub fn unnamed() -> Self {
        Self {
            name: None,
            body: Vec::new(),
            terminator: None,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn body(&self) -> &[Inst] {
        &self.body
    }

    /// `None` only while the block is still under construction.
    pub fn terminator(&self) -> Option<&Inst> {
        self.terminator.as_ref()
    }

    pub fn push(&mut self, inst: Inst) {
        debug_assert!(!inst.is_terminator(), "terminators use set_terminator");
        self.body.push(inst);
    }

    pub fn set_terminator(&mut self, inst: Inst) {
        debug_assert!(inst.is_terminator(), "non-terminator as block terminator");
        self.terminator = Some(inst);
    }
}
