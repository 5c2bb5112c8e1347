use std::io::{self, Write};
use std::path::Path;

use intel_hex::Image;

/// Layout knobs for the emitted C array.
#[derive(Debug, Clone)]
pub struct ArrayFormat {
    /// Byte values per output line. Values below 1 are treated as 1.
    pub values_per_line: usize,
    /// Appended to the file stem to form the array name.
    pub suffix: String,
    /// Placement attribute after the declarator; empty for none.
    pub attribute: String,
}

impl Default for ArrayFormat {
    fn default() -> Self {
        ArrayFormat {
            values_per_line: 16,
            suffix: "_hex".to_string(),
            attribute: "PROGMEM".to_string(),
        }
    }
}

/// What the header comment says about the source file.
pub struct Header<'a> {
    pub file: &'a str,
    pub md5: &'a str,
}

/// Name of the array generated for `path`: its file stem plus the format suffix,
/// with every character a C identifier cannot hold replaced by `_`.
pub fn array_name(path: &Path, format: &ArrayFormat) -> String {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy())
        .unwrap_or_default();
    let mut name: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert(0, '_');
    }
    name.push_str(&format.suffix);
    name
}

pub fn render<W: Write>(
    out: &mut W,
    header: &Header<'_>,
    name: &str,
    image: &Image,
    format: &ArrayFormat,
) -> io::Result<()> {
    writeln!(out, "// File = {}", header.file)?;
    writeln!(out, "// Loader start: {:#x} length {}", image.min_addr(), image.data().len())?;
    writeln!(out, "// MD5 sum = {}", header.md5)?;
    writeln!(out)?;

    if format.attribute.is_empty() {
        writeln!(out, "const uint8_t {name} [] = {{")?;
    } else {
        writeln!(out, "const uint8_t {name} [] {} = {{", format.attribute)?;
    }

    for line in image.data().chunks(format.values_per_line.max(1)) {
        let mut values = line.iter();
        if let Some(first) = values.next() {
            write!(out, "{first:#x},")?;
        }
        for value in values {
            write!(out, " {value:#x},")?;
        }
        writeln!(out)?;
    }

    writeln!(out, "}}; // end of {name}")
}
