//! Entry types read back from the object database
//!
//! A [`TreeListing`] is the flattened form of a tree: every blob reachable from it keyed by
//! its full path. Merges, checkouts and status comparisons all work on listings.

pub mod database_entry;

use crate::artifacts::database::database_entry::DatabaseEntry;
use std::collections::BTreeMap;
use std::path::PathBuf;

pub type TreeListing = BTreeMap<PathBuf, DatabaseEntry>;
