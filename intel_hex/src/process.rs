use std::fmt;

use bytes::Buf;
use tracing::debug;

use crate::common::{Chunk, Record, RecordKind};

/// Resolves extended address records into absolute data chunks.
///
/// Processing ends at the first EOF record; records after it are ignored and
/// a missing EOF record simply ends the input. Each extended address record
/// replaces the current base, whichever of the two kinds it is.
pub fn process_records(records: Vec<Record>) -> ProcessResult {
    let mut chunks = Vec::with_capacity(records.len());
    let mut base_addr: u32 = 0;
    let mut start_addr: Option<StartAddress> = None;
    let mut start_addr_records = Vec::new();

    let num_records = records.len();
    for (idx, record) in records.into_iter().enumerate() {
        let kind = record.kind;
        match kind {
            RecordKind::Data => {
                let data = record_data(idx, kind, record.data, None)?;
                chunks.push(Chunk::new(base_addr + record.addr as u32, data));
            }
            RecordKind::EndOfFile => {
                let ignored = num_records - idx - 1;
                if ignored > 0 {
                    debug!(index = idx, ignored, "records after EOF ignored");
                }
                break;
            }
            RecordKind::ExtendedSegmentAddress => {
                let data = record_data(idx, kind, record.data, Some(2))?;
                base_addr = data.as_slice().get_u16() as u32 * 16;
                debug!(index = idx, base_addr = format_args!("{base_addr:#x}"), "segment base");
            }
            RecordKind::StartSegmentAddress => {
                let data = record_data(idx, kind, record.data, Some(4))?;
                let mut cursor = data.as_slice();
                let cs = cursor.get_u16();
                let ip = cursor.get_u16();
                start_addr = Some(StartAddress::Segment(SegmentStart { cs, ip }));
                start_addr_records.push(IndexTypePair { index: idx, kind });
            }
            RecordKind::ExtendedLinearAddress => {
                let data = record_data(idx, kind, record.data, Some(2))?;
                base_addr = (data.as_slice().get_u16() as u32) << 16;
                debug!(index = idx, base_addr = format_args!("{base_addr:#x}"), "linear base");
            }
            RecordKind::StartLinearAddress => {
                let data = record_data(idx, kind, record.data, Some(4))?;
                start_addr = Some(StartAddress::Linear(data.as_slice().get_u32()));
                start_addr_records.push(IndexTypePair { index: idx, kind });
            }
        }
    }

    if start_addr_records.len() > 1 {
        return Err(ProcessError::MultipleStartAddrRecords(start_addr_records));
    }

    if let Some(start) = &start_addr {
        debug!(start = %start, "start address");
    }

    Ok(ProcessOutput { chunks, start_addr })
}

/// Takes the payload of a record, checking its length when the kind fixes one.
fn record_data(
    index: usize,
    kind: RecordKind,
    data: Option<Vec<u8>>,
    expected_len: Option<usize>,
) -> Result<Vec<u8>, ProcessError> {
    match (data, expected_len) {
        (Some(data), Some(len)) if data.len() == len => Ok(data),
        (Some(data), None) if !data.is_empty() => Ok(data),
        _ => Err(ProcessError::InvalidRecordData(IndexTypePair { index, kind })),
    }
}

pub struct ProcessOutput {
    pub chunks: Vec<Chunk>,
    pub start_addr: Option<StartAddress>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StartAddress {
    Segment(SegmentStart),
    Linear(u32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentStart {
    pub cs: u16,
    pub ip: u16,
}

impl fmt::Display for StartAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartAddress::Segment(SegmentStart { cs, ip }) => write!(f, "{cs:04x}:{ip:04x}"),
            StartAddress::Linear(addr) => write!(f, "{addr:#010x}"),
        }
    }
}

#[derive(Debug)]
pub enum ProcessError {
    InvalidRecordData(IndexTypePair),
    MultipleStartAddrRecords(Vec<IndexTypePair>),
}

#[derive(Debug, PartialEq)]
pub struct IndexTypePair {
    pub index: usize,
    pub kind: RecordKind,
}

impl fmt::Display for IndexTypePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{index={}, type={}}}", self.index, self.kind)
    }
}

impl fmt::Display for ProcessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to process records: ")?;
        use ProcessError::*;
        match self {
            InvalidRecordData(pair) => write!(f, "record has an invalid payload: {pair}"),
            MultipleStartAddrRecords(index_type_pairs) => {
                let pairs_str = index_type_pairs
                    .iter()
                    .map(IndexTypePair::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "multiple start address records: {pairs_str}")
            }
        }
    }
}

impl std::error::Error for ProcessError {}

pub type ProcessResult = std::result::Result<ProcessOutput, ProcessError>;

#[cfg(test)]
mod test {
    use super::*;
    use crate::common::test::test_file_path;
    use crate::parse::{parse_hex_bytes, parse_hex_file};

    fn parse_str(content: &str) -> Vec<Record> {
        parse_hex_bytes(content.as_bytes()).expect("parse failed")
    }

    fn process_str(content: &str) -> ProcessResult {
        process_records(parse_str(content))
    }

    fn chunk_addrs(output: &ProcessOutput) -> Vec<u32> {
        output.chunks.iter().map(|chunk| chunk.addr).collect()
    }

    #[test]
    fn start_addr_set_segmented() {
        let path = test_file_path("start_addr_set_segmented.hex");
        let records = parse_hex_file(path).expect("parse failed");
        let output = process_records(records).expect("process failed");
        assert_eq!(
            output.start_addr,
            Some(StartAddress::Segment(SegmentStart { cs: 0x1234, ip: 0x5678 }))
        );
    }

    #[test]
    fn start_addr_set_linear() {
        let path = test_file_path("start_addr_set_linear.hex");
        let records = parse_hex_file(path).expect("parse failed");
        let output = process_records(records).expect("process failed");
        assert_eq!(output.start_addr, Some(StartAddress::Linear(0x12345678)));
    }

    #[test]
    fn base_addr_set_segmented() {
        let path = test_file_path("base_addr_set_segmented.hex");
        let records = parse_hex_file(path).expect("parse failed");
        let output = process_records(records).expect("process failed");
        assert_eq!(chunk_addrs(&output), vec![0x179b8]);
    }

    #[test]
    fn base_addr_set_linear() {
        let path = test_file_path("base_addr_set_linear.hex");
        let records = parse_hex_file(path).expect("parse failed");
        let output = process_records(records).expect("process failed");
        assert_eq!(chunk_addrs(&output), vec![0x12345678]);
    }

    #[test]
    fn multiple_base_addrs() {
        let path = test_file_path("multiple_base_addrs.hex");
        let records = parse_hex_file(path).expect("parse failed");
        let output = process_records(records).expect("process failed");
        assert_eq!(chunk_addrs(&output), vec![0x12345678, 0x56785678]);
    }

    #[test]
    fn no_start_addr_by_default() {
        let output = process_str(":0100000042BD\n:00000001FF\n").expect("process failed");
        assert!(output.start_addr.is_none());
        assert_eq!(output.chunks, vec![Chunk::new(0, vec![0x42])]);
    }

    #[test]
    fn missing_eof_record_ends_input() {
        let output = process_str(":0100000042BD\n").expect("process failed");
        assert_eq!(output.chunks, vec![Chunk::new(0, vec![0x42])]);
    }

    #[test]
    fn records_after_first_eof_are_ignored() {
        // Two hex files joined back to back.
        let mut records = parse_str(":0100000042BD\n:00000001FF\n");
        records.extend(parse_str(":0100010043BB\n:00000001FF\n"));
        assert_eq!(records.len(), 4);

        let output = process_records(records).expect("process failed");
        assert_eq!(output.chunks, vec![Chunk::new(0, vec![0x42])]);
    }

    #[test]
    fn extended_addr_kinds_replace_each_other() {
        let output = process_str(
            ":020000021000EC\n:0100000042BD\n:020000040001F9\n:0100100043AC\n:00000001FF\n",
        )
        .expect("process failed");
        assert_eq!(chunk_addrs(&output), vec![0x10000, 0x10010]);
    }

    #[test]
    fn multiple_start_addr_records() {
        let output = process_str(
            ":0400000512345678E3\n:0100000042BD\n:0400000512345678E3\n:00000001FF\n",
        );
        assert!(matches!(
            output,
            Err(ProcessError::MultipleStartAddrRecords(indices))
                if indices == vec![
                    IndexTypePair { index: 0, kind: RecordKind::StartLinearAddress },
                    IndexTypePair { index: 2, kind: RecordKind::StartLinearAddress },
                ]
        ));
    }

    #[test]
    fn mixed_start_addr_records() {
        let output = process_str(":0400000312345678E5\n:0400000512345678E3\n:00000001FF\n");
        assert!(matches!(
            output,
            Err(ProcessError::MultipleStartAddrRecords(indices)) if indices.len() == 2
        ));
    }

    #[test]
    fn hand_built_record_with_bad_payload() {
        let records = vec![
            Record {
                addr: 0,
                kind: RecordKind::ExtendedLinearAddress,
                data: Some(vec![0x12]),
            },
            Record {
                addr: 0,
                kind: RecordKind::EndOfFile,
                data: None,
            },
        ];
        assert!(matches!(
            process_records(records),
            Err(ProcessError::InvalidRecordData(IndexTypePair {
                index: 0,
                kind: RecordKind::ExtendedLinearAddress
            }))
        ));
    }

    #[test]
    fn start_address_display() {
        assert_eq!(
            StartAddress::Segment(SegmentStart { cs: 0x12, ip: 0x5678 }).to_string(),
            "0012:5678"
        );
        assert_eq!(StartAddress::Linear(0x8000).to_string(), "0x00008000");
    }
}
