use crate::artifacts::index::{HEADER_SIZE, SIGNATURE, VERSION};
use anyhow::Context;
use byteorder::{ByteOrder, NetworkEndian, WriteBytesExt};
use bytes::Bytes;
use std::io::Write;

/// Fixed-size preamble of the index file; only the entry count varies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexHeader {
    pub entries: u32,
}

impl IndexHeader {
    pub fn for_entries(entries: usize) -> anyhow::Result<Self> {
        let entries = u32::try_from(entries).context("too many index entries")?;
        Ok(IndexHeader { entries })
    }

    /// Validate signature and version, returning the entry count
    pub fn parse(bytes: &[u8]) -> anyhow::Result<Self> {
        anyhow::ensure!(bytes.len() == HEADER_SIZE, "index header is truncated");

        let (signature, rest) = bytes.split_at(SIGNATURE.len());
        anyhow::ensure!(
            signature == SIGNATURE.as_bytes(),
            "index file has signature {:?}, expected {SIGNATURE}",
            String::from_utf8_lossy(signature)
        );

        let version = NetworkEndian::read_u32(&rest[..4]);
        anyhow::ensure!(version == VERSION, "unsupported index version {version}");

        Ok(IndexHeader {
            entries: NetworkEndian::read_u32(&rest[4..8]),
        })
    }

    pub fn to_bytes(self) -> anyhow::Result<Bytes> {
        let mut bytes = Vec::with_capacity(HEADER_SIZE);
        bytes.write_all(SIGNATURE.as_bytes())?;
        bytes.write_u32::<NetworkEndian>(VERSION)?;
        bytes.write_u32::<NetworkEndian>(self.entries)?;

        Ok(Bytes::from(bytes))
    }
}
