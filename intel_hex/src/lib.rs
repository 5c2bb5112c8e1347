//! Intel HEX decoding: records, address resolution and flat memory images.

use std::fmt;
use std::path::Path;

mod common;
pub mod image;
pub mod parse;
pub mod process;

pub use common::{Chunk, Record, RecordKind};
pub use image::{Image, ImageError};
pub use parse::{parse_hex_bytes, parse_hex_file};
pub use process::{process_records, ProcessError, ProcessOutput, SegmentStart, StartAddress};

/// Decoded hex file: the flat image plus the entry point, if one was given.
pub struct LoadedImage {
    pub image: Image,
    pub start_addr: Option<StartAddress>,
}

/// Parses, resolves and flattens the hex file at `path`.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<LoadedImage, Error> {
    let records = parse_hex_file(path)?;
    decode_records(records)
}

/// Same as [`load_image`] for hex file contents already in memory.
pub fn load_image_from_bytes(content: &[u8]) -> Result<LoadedImage, Error> {
    let records = parse_hex_bytes(content)?;
    decode_records(records)
}

fn decode_records(records: Vec<Record>) -> Result<LoadedImage, Error> {
    let ProcessOutput { chunks, start_addr } = process_records(records)?;
    let image = Image::from_chunks(chunks)?;
    Ok(LoadedImage { image, start_addr })
}

#[derive(Debug)]
pub enum Error {
    Parse(parse::Error),
    Process(ProcessError),
    Image(ImageError),
}

impl From<parse::Error> for Error {
    fn from(e: parse::Error) -> Self {
        Error::Parse(e)
    }
}

impl From<ProcessError> for Error {
    fn from(e: ProcessError) -> Self {
        Error::Process(e)
    }
}

impl From<ImageError> for Error {
    fn from(e: ImageError) -> Self {
        Error::Image(e)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Parse(e) => write!(f, "{e}"),
            Error::Process(e) => write!(f, "{e}"),
            Error::Image(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for Error {}
