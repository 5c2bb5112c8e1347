use std::fmt;

use tracing::debug;

use crate::common::Chunk;

/// Value of bytes inside the image that no data record wrote.
pub const FILL_BYTE: u8 = 0xff;

/// Contiguous memory image covering every data chunk of a hex file.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    min_addr: u32,
    data: Vec<u8>,
}

impl Image {
    /// Lays the chunks out from the lowest to the highest written address,
    /// padding gaps with [`FILL_BYTE`]. Chunks may be given in any order.
    pub fn from_chunks<I>(chunks: I) -> Result<Self, ImageError>
    where
        I: IntoIterator<Item = Chunk>,
    {
        let mut chunks: Vec<Chunk> = chunks.into_iter().filter(|c| !c.is_empty()).collect();
        chunks.sort_by_key(|chunk| chunk.addr);

        let (first, last_end) = match (chunks.first(), chunks.iter().map(Chunk::end_addr).max()) {
            (Some(first), Some(last_end)) => (first.addr, last_end),
            _ => return Err(ImageError::Empty),
        };

        let span = usize::try_from(last_end - first as u64).map_err(|_| ImageError::TooLarge)?;
        let mut data = vec![FILL_BYTE; span];

        let mut written_end = first as u64;
        for chunk in &chunks {
            if (chunk.addr as u64) < written_end {
                return Err(ImageError::Overlap { addr: chunk.addr });
            }
            let offset = (chunk.addr - first) as usize;
            data[offset..offset + chunk.len()].copy_from_slice(chunk.data());
            written_end = chunk.end_addr();
        }

        debug!(
            chunks = chunks.len(),
            min_addr = format_args!("{first:#x}"),
            len = data.len(),
            "assembled image"
        );

        Ok(Image {
            min_addr: first,
            data,
        })
    }

    pub fn min_addr(&self) -> u32 {
        self.min_addr
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

#[derive(Debug, PartialEq)]
pub enum ImageError {
    Empty,
    Overlap { addr: u32 },
    TooLarge,
}

impl fmt::Display for ImageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to build image: ")?;
        use ImageError::*;
        match self {
            Empty => write!(f, "no data records"),
            Overlap { addr } => write!(f, "data overlaps at address {addr:#x}"),
            TooLarge => write!(f, "address range does not fit in memory"),
        }
    }
}

impl std::error::Error for ImageError {}
