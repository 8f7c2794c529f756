//! Streaming zip writer.
//!
//! Entries are written one after another straight into the sink: a local
//! header with the data-descriptor flag, the deflated body, then a data
//! descriptor carrying CRC and sizes. Nothing but the central directory
//! records is kept in memory.

use crc32fast::Hasher;
use flate2::Compression;
use flate2::write::DeflateEncoder;
use std::io::{self, Write};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

const LOCAL_HEADER_SIGNATURE: u32 = 0x0403_4b50;
const DATA_DESCRIPTOR_SIGNATURE: u32 = 0x0807_4b50;
const CENTRAL_HEADER_SIGNATURE: u32 = 0x0201_4b50;
const EOCD_SIGNATURE: u32 = 0x0605_4b50;

/// 2.0: deflate and directories
const VERSION_NEEDED: u16 = 20;

/// General purpose flags
const FLAG_DATA_DESCRIPTOR: u16 = 1 << 3;
const FLAG_UTF8: u16 = 1 << 11;

/// ZIP compression methods
const COMPRESSION_STORED: u16 = 0;
const COMPRESSION_DEFLATE: u16 = 8;

/// 1980-01-01 00:00, the MS-DOS epoch
const DOS_TIME: u16 = 0;
const DOS_DATE: u16 = (1 << 5) | 1;

const ATTR_DIRECTORY: u32 = 0x10;

/// Read size when pulling entry bodies from the source
const CHUNK_SIZE: usize = 64 * 1024;

struct CentralRecord {
    name: String,
    flags: u16,
    method: u16,
    crc: u32,
    compressed_size: u32,
    size: u32,
    offset: u32,
    external_attrs: u32,
}

/// Little-endian field writer for zip records
#[derive(Default)]
struct Record(Vec<u8>);

impl Record {
    fn u16(mut self, v: u16) -> Self {
        self.0.extend_from_slice(&v.to_le_bytes());
        self
    }

    fn u32(mut self, v: u32) -> Self {
        self.0.extend_from_slice(&v.to_le_bytes());
        self
    }

    fn bytes(mut self, v: &[u8]) -> Self {
        self.0.extend_from_slice(v);
        self
    }
}

fn fit_u32(value: u64) -> io::Result<u32> {
    u32::try_from(value).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            "archive exceeds 4 GiB, zip64 is not supported",
        )
    })
}

fn fit_u16(value: usize, what: &str) -> io::Result<u16> {
    u16::try_from(value).map_err(|_| {
        io::Error::new(io::ErrorKind::InvalidData, format!("too many {what} for a zip archive"))
    })
}

/// Writes a zip archive entry by entry into any async sink
pub struct ZipStreamWriter<W> {
    inner: W,
    offset: u64,
    records: Vec<CentralRecord>,
}

impl<W: AsyncWrite + Unpin> ZipStreamWriter<W> {
    pub fn new(inner: W) -> Self {
        ZipStreamWriter {
            inner,
            offset: 0,
            records: Vec::new(),
        }
    }

    /// Number of entries written so far
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    async fn write_raw(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.inner.write_all(bytes).await?;
        self.offset += bytes.len() as u64;
        Ok(())
    }

    async fn write_local_header(&mut self, name: &str, flags: u16, method: u16) -> io::Result<u32> {
        let offset = fit_u32(self.offset)?;
        let header = Record::default()
            .u32(LOCAL_HEADER_SIGNATURE)
            .u16(VERSION_NEEDED)
            .u16(flags)
            .u16(method)
            .u16(DOS_TIME)
            .u16(DOS_DATE)
            .u32(0) // crc, in data descriptor
            .u32(0) // compressed size
            .u32(0) // uncompressed size
            .u16(fit_u16(name.len(), "name bytes")?)
            .u16(0) // extra field length
            .bytes(name.as_bytes());
        self.write_raw(&header.0).await?;
        Ok(offset)
    }

    /// Add an empty directory entry. A trailing `/` is appended when missing.
    pub async fn add_directory(&mut self, name: &str) -> io::Result<()> {
        let name = if name.ends_with('/') {
            name.to_string()
        } else {
            format!("{name}/")
        };

        let offset = self
            .write_local_header(&name, FLAG_UTF8, COMPRESSION_STORED)
            .await?;

        self.records.push(CentralRecord {
            name,
            flags: FLAG_UTF8,
            method: COMPRESSION_STORED,
            crc: 0,
            compressed_size: 0,
            size: 0,
            offset,
            external_attrs: ATTR_DIRECTORY,
        });
        Ok(())
    }

    /// Deflate everything `reader` yields into a new entry called `name`.
    /// Returns the number of uncompressed bytes consumed.
    pub async fn add_entry<R>(&mut self, name: &str, reader: &mut R) -> io::Result<u64>
    where
        R: AsyncRead + Unpin,
    {
        let flags = FLAG_UTF8 | FLAG_DATA_DESCRIPTOR;
        let offset = self
            .write_local_header(name, flags, COMPRESSION_DEFLATE)
            .await?;

        let mut hasher = Hasher::new();
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        let mut chunk = vec![0u8; CHUNK_SIZE];
        let mut size = 0u64;
        let mut compressed_size = 0u64;

        loop {
            let n = reader.read(&mut chunk).await?;
            if n == 0 {
                break;
            }
            hasher.update(&chunk[..n]);
            size += n as u64;
            encoder.write_all(&chunk[..n])?;

            let out = std::mem::take(encoder.get_mut());
            if !out.is_empty() {
                compressed_size += out.len() as u64;
                self.write_raw(&out).await?;
            }
        }

        let out = encoder.finish()?;
        compressed_size += out.len() as u64;
        self.write_raw(&out).await?;

        let crc = hasher.finalize();
        let compressed_size = fit_u32(compressed_size)?;
        let uncompressed_size = fit_u32(size)?;

        let descriptor = Record::default()
            .u32(DATA_DESCRIPTOR_SIGNATURE)
            .u32(crc)
            .u32(compressed_size)
            .u32(uncompressed_size);
        self.write_raw(&descriptor.0).await?;

        self.records.push(CentralRecord {
            name: name.to_string(),
            flags,
            method: COMPRESSION_DEFLATE,
            crc,
            compressed_size,
            size: uncompressed_size,
            offset,
            external_attrs: 0,
        });
        Ok(size)
    }

    /// Write the central directory and end record, flush, and hand back the sink
    pub async fn finish(mut self) -> io::Result<W> {
        let central_start = self.offset;
        let records = std::mem::take(&mut self.records);

        for record in &records {
            let header = Record::default()
                .u32(CENTRAL_HEADER_SIGNATURE)
                .u16(VERSION_NEEDED) // version made by
                .u16(VERSION_NEEDED)
                .u16(record.flags)
                .u16(record.method)
                .u16(DOS_TIME)
                .u16(DOS_DATE)
                .u32(record.crc)
                .u32(record.compressed_size)
                .u32(record.size)
                .u16(fit_u16(record.name.len(), "name bytes")?)
                .u16(0) // extra field length
                .u16(0) // comment length
                .u16(0) // disk number start
                .u16(0) // internal attributes
                .u32(record.external_attrs)
                .u32(record.offset)
                .bytes(record.name.as_bytes());
            self.write_raw(&header.0).await?;
        }

        let entries = fit_u16(records.len(), "entries")?;
        let central_size = fit_u32(self.offset - central_start)?;
        let central_offset = fit_u32(central_start)?;

        let end = Record::default()
            .u32(EOCD_SIGNATURE)
            .u16(0) // this disk
            .u16(0) // disk with central directory
            .u16(entries)
            .u16(entries)
            .u32(central_size)
            .u32(central_offset)
            .u16(0); // comment length
        self.write_raw(&end.0).await?;

        self.inner.flush().await?;
        Ok(self.inner)
    }
}
