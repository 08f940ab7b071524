use crate::areas::repository::Repository;
use crate::artifacts::objects::object_id::ObjectId;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FsckReport {
    pub checked: usize,
    /// Stored objects that fail to decompress, hash or parse
    pub corrupt: Vec<(ObjectId, String)>,
    /// Objects referenced from refs but unreadable
    pub broken_links: Vec<String>,
}

impl FsckReport {
    pub fn is_ok(&self) -> bool {
        self.corrupt.is_empty() && self.broken_links.is_empty()
    }
}

impl Repository {
    /// Verify every stored object and everything the refs reach
    pub fn fsck(&self) -> anyhow::Result<FsckReport> {
        let mut report = FsckReport::default();

        for oid in self.database().all_objects()? {
            report.checked += 1;
            if let Err(error) = self.database().parse_object(&oid) {
                tracing::warn!(%oid, %error, "corrupt object");
                report.corrupt.push((oid, error.to_string()));
            }
        }

        let mut roots = Vec::new();
        for sym_ref in self.refs().list_all_refs()? {
            roots.extend(self.refs().read_ref(&sym_ref)?);
        }
        for result in self.database().walk_reachable(roots) {
            if let Err(error) = result {
                report.broken_links.push(error.to_string());
            }
        }

        Ok(report)
    }
}
