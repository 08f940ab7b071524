use crate::areas::repository::Repository;
use crate::artifacts::log::bisect::{Bisect, BisectStep};
use crate::artifacts::log::history::History;

impl Repository {
    /// Open a bisect session between a bad revision and any number of good ones
    pub fn bisect_start(&self, bad: &str, goods: &[&str]) -> anyhow::Result<(Bisect, BisectStep)> {
        let history = History::from_database(self.database());

        let bad = self.resolve(bad)?;
        let goods = goods
            .iter()
            .map(|good| self.resolve(good))
            .collect::<anyhow::Result<Vec<_>>>()?;

        let session = Bisect::start(&history, &bad, &goods)?;
        let step = session.next(&history)?;

        Ok((session, step))
    }

    /// Record the verdict for `revision` and pick the next commit to test
    pub fn bisect_mark(
        &self,
        session: &mut Bisect,
        revision: &str,
        good: bool,
    ) -> anyhow::Result<BisectStep> {
        let history = History::from_database(self.database());

        session.mark(&history, &self.resolve(revision)?, good)?;
        session.next(&history)
    }
}
