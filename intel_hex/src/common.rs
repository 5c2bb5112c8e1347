use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub addr: u16,
    pub kind: RecordKind,
    pub data: Option<Vec<u8>>,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum RecordKind {
    Data,
    EndOfFile,
    ExtendedSegmentAddress,
    StartSegmentAddress,
    ExtendedLinearAddress,
    StartLinearAddress,
}

impl RecordKind {
    pub fn from_int(kind: u8) -> Option<Self> {
        use RecordKind::*;
        match kind {
            0 => Some(Data),
            1 => Some(EndOfFile),
            2 => Some(ExtendedSegmentAddress),
            3 => Some(StartSegmentAddress),
            4 => Some(ExtendedLinearAddress),
            5 => Some(StartLinearAddress),
            _ => None,
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use RecordKind::*;
        match self {
            Data => write!(f, "Data"),
            EndOfFile => write!(f, "EndOfFile"),
            ExtendedSegmentAddress => write!(f, "ExtendedSegmentAddress"),
            StartSegmentAddress => write!(f, "StartSegmentAddress"),
            ExtendedLinearAddress => write!(f, "ExtendedLinearAddress"),
            StartLinearAddress => write!(f, "StartLinearAddress"),
        }
    }
}

/// Data record payload resolved to its absolute address.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub addr: u32,
    pub(crate) data: Vec<u8>,
}

impl Chunk {
    pub fn new(addr: u32, data: Vec<u8>) -> Self {
        Chunk { addr, data }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Address one past the last byte.
    pub fn end_addr(&self) -> u64 {
        self.addr as u64 + self.len() as u64
    }
}
