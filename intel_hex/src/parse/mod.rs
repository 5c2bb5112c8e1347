use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use bytes::Buf;
use tracing::debug;

use crate::common::{Record, RecordKind};

mod hex;

pub use hex::InvalidHexString;

const START_CODE: u8 = b':';

pub fn parse_hex_file<P>(path: P) -> Result<Vec<Record>>
where
    P: AsRef<Path>,
{
    let content = fs::read(path.as_ref()).map_err(Error::ReadFile)?;
    debug!(path = %path.as_ref().display(), bytes = content.len(), "read hex file");
    parse_hex_bytes(&content)
}

/// Parses one record per line, up to and including the first EOF record.
///
/// Empty lines are skipped. Every other line must hold exactly one record:
/// a `:` start code, the fields, and nothing after the checksum.
pub fn parse_hex_bytes(content: &[u8]) -> Result<Vec<Record>> {
    if !content.is_ascii() {
        return Err(Error::NotAscii);
    }

    let mut records = Vec::new();
    for (line_idx, line) in content.split(|&b| b == b'\n').enumerate() {
        let line = trim_line_end(line);
        if line.is_empty() {
            continue;
        }

        let line_no = line_idx + 1;
        let record = RecordParser::new(line_no, line).parse()?;
        let is_eof = record.kind == RecordKind::EndOfFile;
        records.push(record);
        if is_eof {
            debug!(line_no, "end of file record");
            break;
        }
    }

    debug!(records = records.len(), "parsed records");
    Ok(records)
}

fn trim_line_end(mut line: &[u8]) -> &[u8] {
    while let [rest @ .., b'\r'] = line {
        line = rest;
    }
    line
}

struct RecordParser<'a> {
    line_no: usize,
    cursor: &'a [u8],
    to_checksum: Vec<u8>,
}

impl<'a> RecordParser<'a> {
    fn new(line_no: usize, line: &'a [u8]) -> Self {
        RecordParser {
            line_no,
            cursor: line,
            to_checksum: Vec::new(),
        }
    }

    fn error(&self, kind: ParseRecordError) -> Error {
        Error::ParseRecord {
            line_no: self.line_no,
            kind,
        }
    }

    fn field_error(&self, field: Field, kind: ParseFieldError) -> Error {
        self.error(ParseRecordError::ParseField { field, kind })
    }

    fn parse(mut self) -> Result<Record> {
        self.skip_start_code()?;

        let byte_count = self.take_field(Field::ByteCount, 0)?.as_slice().get_u8();
        let addr = self.take_field(Field::Address, 0)?.as_slice().get_u16();
        let kind_val = self.take_field(Field::Type, 0)?.as_slice().get_u8();
        let kind = RecordKind::from_int(kind_val)
            .ok_or_else(|| self.error(ParseRecordError::InvalidType(kind_val)))?;

        self.check_layout(kind, byte_count, addr)?;

        let data = if byte_count > 0 {
            Some(self.take_field(Field::Data, byte_count)?)
        } else {
            None
        };

        let expected = calculate_checksum(&self.to_checksum);
        let found = self.take_field(Field::Checksum, 0)?.as_slice().get_u8();
        if found != expected {
            return Err(self.error(ParseRecordError::ChecksumMismatch { expected, found }));
        }

        if !self.cursor.is_empty() {
            return Err(self.error(ParseRecordError::TrailingCharacters(self.cursor.len())));
        }

        Ok(Record { addr, kind, data })
    }

    fn skip_start_code(&mut self) -> Result<()> {
        match self.cursor.split_first() {
            Some((&START_CODE, rest)) => {
                self.cursor = rest;
                Ok(())
            }
            _ => Err(self.error(ParseRecordError::MissingStartCode)),
        }
    }

    /// Byte count and address rules that depend on the record type.
    fn check_layout(&self, kind: RecordKind, byte_count: u8, addr: u16) -> Result<()> {
        let Ok(record_type) = FixedByteCountRecord::try_from(kind) else {
            if byte_count == 0 {
                return Err(self.error(ParseRecordError::EmptyDataRecord));
            }
            return Ok(());
        };

        let expected_byte_count = record_byte_count(record_type);
        if byte_count != expected_byte_count {
            return Err(self.error(ParseRecordError::InvalidByteCount {
                record_type,
                expected_byte_count,
            }));
        }

        if record_type != FixedByteCountRecord::EndOfFile && addr != 0 {
            return Err(self.error(ParseRecordError::NonZeroAddress { record_type, addr }));
        }

        Ok(())
    }

    /// Decodes the next field. Everything but the checksum is summed into it.
    fn take_field(&mut self, field: Field, byte_count: u8) -> Result<Vec<u8>> {
        let num_digits = field.num_digits(byte_count);
        if self.cursor.is_empty() {
            return Err(self.field_error(field, ParseFieldError::Missing));
        }
        if self.cursor.len() < num_digits {
            return Err(self.field_error(field, ParseFieldError::Incomplete));
        }

        let (digits, rest) = self.cursor.split_at(num_digits);
        self.cursor = rest;
        let bytes = hex::hex_string_to_bytes(digits)
            .map_err(|e| self.field_error(field, ParseFieldError::InvalidHex(e)))?;
        if field != Field::Checksum {
            self.to_checksum.extend_from_slice(&bytes);
        }
        Ok(bytes)
    }
}

fn calculate_checksum(to_checksum: &[u8]) -> u8 {
    let sum = to_checksum
        .iter()
        .fold(0u8, |acc, &value| acc.wrapping_add(value));
    // Two's complement of the low byte of the sum.
    (!sum).wrapping_add(1)
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum FixedByteCountRecord {
    EndOfFile,
    ExtendedSegmentAddress,
    StartSegmentAddress,
    ExtendedLinearAddress,
    StartLinearAddress,
}

impl fmt::Display for FixedByteCountRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&RecordKind::from(*self), f)
    }
}

impl TryFrom<RecordKind> for FixedByteCountRecord {
    type Error = ();

    fn try_from(kind: RecordKind) -> std::result::Result<Self, Self::Error> {
        use FixedByteCountRecord::*;
        match kind {
            RecordKind::Data => Err(()),
            RecordKind::EndOfFile => Ok(EndOfFile),
            RecordKind::ExtendedSegmentAddress => Ok(ExtendedSegmentAddress),
            RecordKind::StartSegmentAddress => Ok(StartSegmentAddress),
            RecordKind::ExtendedLinearAddress => Ok(ExtendedLinearAddress),
            RecordKind::StartLinearAddress => Ok(StartLinearAddress),
        }
    }
}

impl From<FixedByteCountRecord> for RecordKind {
    fn from(record: FixedByteCountRecord) -> Self {
        use FixedByteCountRecord::*;
        match record {
            EndOfFile => RecordKind::EndOfFile,
            ExtendedSegmentAddress => RecordKind::ExtendedSegmentAddress,
            StartSegmentAddress => RecordKind::StartSegmentAddress,
            ExtendedLinearAddress => RecordKind::ExtendedLinearAddress,
            StartLinearAddress => RecordKind::StartLinearAddress,
        }
    }
}

fn record_byte_count(record: FixedByteCountRecord) -> u8 {
    use FixedByteCountRecord::*;
    match record {
        EndOfFile => 0,
        ExtendedSegmentAddress => 2,
        StartSegmentAddress => 4,
        ExtendedLinearAddress => 2,
        StartLinearAddress => 4,
    }
}

#[derive(Debug)]
pub enum Error {
    ReadFile(io::Error),
    NotAscii,
    ParseRecord {
        line_no: usize,
        kind: ParseRecordError,
    },
}

#[derive(Debug)]
pub enum ParseRecordError {
    MissingStartCode,
    ParseField {
        field: Field,
        kind: ParseFieldError,
    },
    InvalidType(u8),
    ChecksumMismatch {
        expected: u8,
        found: u8,
    },
    InvalidByteCount {
        record_type: FixedByteCountRecord,
        expected_byte_count: u8,
    },
    NonZeroAddress {
        record_type: FixedByteCountRecord,
        addr: u16,
    },
    EmptyDataRecord,
    TrailingCharacters(usize),
}

#[derive(Debug)]
pub enum ParseFieldError {
    Missing,
    Incomplete,
    InvalidHex(InvalidHexString),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Field {
    ByteCount,
    Address,
    Type,
    Data,
    Checksum,
}

impl Field {
    fn num_digits(self, byte_count: u8) -> usize {
        use Field::*;
        match self {
            ByteCount | Type | Checksum => 2,
            Address => 4,
            Data => byte_count as usize * 2,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Field::*;
        match self {
            ByteCount => write!(f, "ByteCount"),
            Address => write!(f, "Address"),
            Type => write!(f, "Type"),
            Data => write!(f, "Data"),
            Checksum => write!(f, "Checksum"),
        }
    }
}

impl fmt::Display for ParseRecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use ParseRecordError::*;
        match self {
            MissingStartCode => write!(f, "line does not start with ':'"),
            ParseField { field, kind } => {
                write!(f, "failed to parse {field} field: ")?;
                match kind {
                    ParseFieldError::Missing => write!(f, "field missing"),
                    ParseFieldError::Incomplete => write!(f, "field incomplete"),
                    ParseFieldError::InvalidHex(error) => write!(f, "{error}"),
                }
            }
            InvalidType(kind) => write!(f, "invalid type: {kind}"),
            ChecksumMismatch { expected, found } => {
                write!(f, "checksum mismatch, expected {expected:02x}, found {found:02x}")
            }
            InvalidByteCount {
                record_type,
                expected_byte_count,
            } => write!(
                f,
                "byte count must be {expected_byte_count} for {record_type} records"
            ),
            NonZeroAddress { record_type, addr } => write!(
                f,
                "address must be 0000 for {record_type} records, found {addr:04x}"
            ),
            EmptyDataRecord => write!(f, "data record is empty"),
            TrailingCharacters(count) => {
                write!(f, "{count} unexpected characters after the checksum")
            }
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Error::*;
        match &self {
            ReadFile(io_error) => write!(f, "error reading the file: {io_error}"),
            NotAscii => write!(f, "not all characters are ASCII"),
            ParseRecord { line_no, kind } => {
                write!(f, "failed to parse record on line {line_no}: {kind}")
            }
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;
