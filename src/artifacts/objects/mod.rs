//! Object model
//!
//! Every piece of history is stored as an immutable object addressed by the digest of its
//! canonical serialization. There are four kinds:
//!
//! - **Blob**: file content (raw bytes, no name or mode)
//! - **Tree**: directory listing (names, modes and object IDs)
//! - **Commit**: snapshot pointer with parents, author, committer and message
//! - **Tag**: annotated pointer to another object
//!
//! All objects serialize to `<type> <size>\0<content>`; the digest is taken over those bytes.

pub mod blob;
pub mod commit;
pub mod hasher;
pub mod object;
pub mod object_id;
pub mod object_type;
pub mod tag;
pub mod tree;

/// Number of characters used for abbreviated object IDs
pub const SHORT_OID_LENGTH: usize = 7;

/// Shortest prefix accepted when resolving abbreviated object IDs
pub const MIN_OID_PREFIX_LENGTH: usize = 4;
