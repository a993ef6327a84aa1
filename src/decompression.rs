use anyhow::{anyhow, Result};
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader, Chain, Cursor, Read};
use std::path::Path;

type ChainReader = Chain<Cursor<Vec<u8>>, File>;
type GzipReader = BufReader<MultiGzDecoder<ChainReader>>;
type PlainReader = BufReader<ChainReader>;

/// Streaming reader for access logs, plain or gzip-rotated.
/// Gzip is detected by its magic bytes (1F 8B 08), not by file extension.
#[derive(Debug)]
pub enum DecompressionReader {
    Gzip(GzipReader),
    Plain(PlainReader),
}

impl BufRead for DecompressionReader {
    fn fill_buf(&mut self) -> std::io::Result<&[u8]> {
        match self {
            DecompressionReader::Gzip(reader) => reader.fill_buf(),
            DecompressionReader::Plain(reader) => reader.fill_buf(),
        }
    }

    fn consume(&mut self, amt: usize) {
        match self {
            DecompressionReader::Gzip(reader) => reader.consume(amt),
            DecompressionReader::Plain(reader) => reader.consume(amt),
        }
    }
}

impl Read for DecompressionReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            DecompressionReader::Gzip(reader) => reader.read(buf),
            DecompressionReader::Plain(reader) => reader.read(buf),
        }
    }
}

fn detect_compression_file(mut file: File) -> std::io::Result<DecompressionReader> {
    let mut head = [0u8; 3];
    let n = file.read(&mut head)?;

    // Put the read bytes back in front using a cursor chain
    let prefix = Cursor::new(head[..n].to_vec());
    let chained = prefix.chain(file);

    let is_gzip = n == 3 && head == [0x1F, 0x8B, 0x08];

    if is_gzip {
        Ok(DecompressionReader::Gzip(BufReader::new(
            MultiGzDecoder::new(chained),
        )))
    } else {
        Ok(DecompressionReader::Plain(BufReader::new(chained)))
    }
}

impl DecompressionReader {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let file = File::open(path_ref)
            .map_err(|e| anyhow!("Couldn't read input file {}: {}", path_ref.display(), e))?;

        detect_compression_file(file)
            .map_err(|e| anyhow!("Failed to detect compression format: {}", e))
    }

    pub fn is_gzip(&self) -> bool {
        matches!(self, DecompressionReader::Gzip(_))
    }
}
