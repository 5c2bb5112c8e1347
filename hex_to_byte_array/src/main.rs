use std::ffi::OsString;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::error::ErrorKind;
use clap::Parser;
use tracing::{debug, info};

mod digest;
mod render;

use render::{ArrayFormat, Header};

/*
Usage:
  hex_to_byte_array bootloader.hex > bootloader.h

  Prints a C array holding the decoded image, for embedding in firmware
  sources. Set RUST_LOG=debug for a trace of each decoding stage on stderr.

 */

/// Converts an Intel HEX file into a PROGMEM byte array.
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// Intel HEX file to convert
    #[arg(value_name = "HEXFILE")]
    hex_file: PathBuf,
}

fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(_) => {
            println!("Usage: {} bootloader.hex", program_name());
            process::exit(1);
        }
    };

    setup_tracing();

    if let Err(e) = try_main(&args) {
        eprintln!("ERROR: {e:#}");
        process::exit(1);
    }
}

fn try_main(args: &Args) -> anyhow::Result<()> {
    let path = &args.hex_file;
    let content = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    debug!(path = %path.display(), bytes = content.len(), "read input");

    let md5 = digest::md5_hex(&content);
    let loaded = intel_hex::load_image_from_bytes(&content)
        .with_context(|| format!("decoding {}", path.display()))?;
    let image = &loaded.image;
    info!(
        min_addr = format_args!("{:#x}", image.min_addr()),
        len = image.data().len(),
        md5 = %md5,
        "decoded image"
    );
    if let Some(start) = &loaded.start_addr {
        debug!(start = %start, "image has a start address");
    }

    let format = ArrayFormat::default();
    let name = render::array_name(path, &format);
    let file = path.display().to_string();
    let header = Header { file: &file, md5: &md5 };

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    render::render(&mut out, &header, &name, image, &format)
        .and_then(|()| out.flush())
        .context("writing output")?;

    Ok(())
}

fn program_name() -> String {
    std::env::args_os()
        .next()
        .map(|arg0: OsString| arg0.to_string_lossy().into_owned())
        .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string())
}

fn setup_tracing() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let stderr_layer = fmt::layer().with_writer(io::stderr).with_target(false);

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(env_filter)
        .init();
}
