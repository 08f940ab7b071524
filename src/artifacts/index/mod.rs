//! Index file format
//!
//! The index (staging area) records what the next commit will contain.
//!
//! ## File Format (Version 2)
//!
//! ```text
//! Header (12 bytes):
//!   - Signature: "DIRC" (4 bytes)
//!   - Version: 2 (4 bytes)
//!   - Entry count (4 bytes)
//!
//! Entries (variable length, sorted by path then stage):
//!   - Mode (4 bytes)
//!   - Stage (1 byte)
//!   - Object ID length (1 byte) + hex object ID
//!   - Path length (2 bytes) + path
//!
//! Checksum (20 bytes):
//!   - SHA-1 of all preceding bytes
//! ```

pub mod checksum;
pub mod entry_mode;
pub mod index_entry;
pub mod index_header;

pub const CHECKSUM_SIZE: usize = 20;
pub const HEADER_SIZE: usize = 12;
pub const SIGNATURE: &str = "DIRC";
pub const VERSION: u32 = 2;
