//! Buffered, gz-aware line io for the TSV interchange files.

use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Open a buffered reader; `.gz` files are decompressed transparently.
pub fn open_buf_reader(input_file: &str) -> anyhow::Result<Box<dyn BufRead>> {
    let ext = Path::new(input_file).extension().and_then(|x| x.to_str());
    match ext {
        Some("gz") => {
            let file = File::open(input_file)?;
            Ok(Box::new(BufReader::new(GzDecoder::new(file))))
        }
        _ => {
            let file = File::open(input_file)?;
            Ok(Box::new(BufReader::new(file)))
        }
    }
}

/// Open a buffered writer; `.gz` compresses, `stdout` writes to stdout.
pub fn open_buf_writer(output_file: &str) -> anyhow::Result<Box<dyn Write + Send>> {
    if output_file.eq_ignore_ascii_case("stdout") {
        return Ok(Box::new(BufWriter::new(std::io::stdout())));
    }

    let ext = Path::new(output_file).extension().and_then(|x| x.to_str());
    match ext {
        Some("gz") => {
            let file = File::create(output_file)?;
            let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
            Ok(Box::new(BufWriter::new(encoder)))
        }
        _ => {
            let file = File::create(output_file)?;
            Ok(Box::new(BufWriter::new(file)))
        }
    }
}

/// Read every line of the input file into memory.
pub fn read_lines(input_file: &str) -> anyhow::Result<Vec<Box<str>>> {
    let buf = open_buf_reader(input_file)?;
    let mut lines = vec![];
    for x in buf.lines() {
        lines.push(x?.into_boxed_str());
    }
    Ok(lines)
}

/// Write every line into the output file.
pub fn write_lines<T>(lines: &[T], output_file: &str) -> anyhow::Result<()>
where
    T: std::fmt::Display,
{
    let mut buf = open_buf_writer(output_file)?;
    for line in lines {
        writeln!(buf, "{}", line)?;
    }
    buf.flush()?;
    Ok(())
}

/// Remove a file if it exists.
pub fn remove_file(file: &str) -> anyhow::Result<()> {
    if Path::new(file).exists() {
        std::fs::remove_file(file)?;
    }
    Ok(())
}
