// src/recording/event.rs
//! Memory-access events as handed over by instrumentation callbacks

use serde::{Deserialize, Serialize};

/// Well-known operation codes
///
/// The trace stores the raw byte, so instrumentation may use codes beyond
/// these two (e.g. prefetches); `Operation` only names the common ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Read,
    Write,
}

impl Operation {
    pub const fn code(self) -> u8 {
        match self {
            Operation::Read => b'R',
            Operation::Write => b'W',
        }
    }

    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            b'R' => Some(Operation::Read),
            b'W' => Some(Operation::Write),
            _ => None,
        }
    }
}

impl From<Operation> for u8 {
    fn from(op: Operation) -> Self {
        op.code()
    }
}

/// One recorded memory access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    /// Id of the instruction that issued the access
    pub instruction_id: u32,

    /// Address touched
    pub address: usize,

    /// Single-byte operation code (`b'R'`, `b'W'`, ...)
    pub operation: u8,
}

impl Event {
    pub fn new(instruction_id: u32, address: usize, operation: impl Into<u8>) -> Self {
        Self {
            instruction_id,
            address,
            operation: operation.into(),
        }
    }

    pub fn read(instruction_id: u32, address: usize) -> Self {
        Self::new(instruction_id, address, Operation::Read)
    }

    pub fn write(instruction_id: u32, address: usize) -> Self {
        Self::new(instruction_id, address, Operation::Write)
    }
}
