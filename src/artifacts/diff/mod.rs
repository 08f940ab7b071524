//! Path-level comparison of flattened trees
//!
//! Line-level comparison lives with the merge engine in `merge::diff3`.

pub mod tree_diff;
