use nspsync_library::sync::{Outcome, SyncEvent};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Counts of what a run did, for the closing report.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub transferred: usize,
    pub purged: usize,
    pub up_to_date: usize,
    pub tidied: usize,
    pub skipped: usize,
    pub unmatched: usize,
    pub repaired: usize,
    pub verified: usize,
    pub failed: usize,
    pub complete: bool,
}

impl Summary {
    pub fn record(&mut self, event: &SyncEvent) {
        match event {
            SyncEvent::FolderUnmatched { .. } => self.unmatched += 1,
            SyncEvent::Complete => self.complete = true,
            SyncEvent::Processed(outcome) => match outcome {
                Outcome::Transferred { purged, .. } => {
                    self.transferred += 1;
                    self.purged += purged.len();
                },
                Outcome::UpToDate { tidied, .. } => {
                    self.up_to_date += 1;
                    self.tidied += usize::from(*tidied);
                },
                Outcome::Skipped { .. } => self.skipped += 1,
                Outcome::Unmatched { .. } => self.unmatched += 1,
                Outcome::Repaired { .. } => self.repaired += 1,
                Outcome::Verified { .. } => self.verified += 1,
            },
            SyncEvent::Started | SyncEvent::Indexed(_) | SyncEvent::FolderMatched { .. } => {},
        }
    }

    pub fn fail(&mut self) {
        self.failed += 1;
    }
}

impl Display for Summary {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(
            f,
            "{} transferred ({} older versions purged), {} up to date ({} removed from origin), {} skipped, {} unmatched",
            self.transferred, self.purged, self.up_to_date, self.tidied, self.skipped, self.unmatched,
        )?;
        if self.repaired + self.verified > 0 {
            write!(f, ", {} verified, {} repaired", self.verified, self.repaired)?;
        }
        if self.failed > 0 {
            write!(f, ", {} failed", self.failed)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nspsync_library::decision::Reason;
    use nspsync_library::sync::SkipReason;
    use std::path::PathBuf;

    #[test]
    fn test_counts() {
        let mut summary = Summary::default();
        let events = [
            SyncEvent::Started,
            SyncEvent::Indexed(3),
            SyncEvent::FolderUnmatched { source: PathBuf::from("Mystery") },
            SyncEvent::Processed(Outcome::Transferred {
                source: PathBuf::from("a.nsp"),
                destination: PathBuf::from("GameA/a.nsp"),
                purged: vec![PathBuf::from("GameA/old.nsp")],
                reason: Reason::Upgrade { from: 1 },
            }),
            SyncEvent::Processed(Outcome::UpToDate {
                source: PathBuf::from("b.nsp"),
                reason: Reason::UpToDate,
                tidied: true,
            }),
            SyncEvent::Processed(Outcome::Skipped { source: PathBuf::from("c.txt"), reason: SkipReason::Unidentified }),
            SyncEvent::Complete,
        ];
        events.iter().for_each(|event| summary.record(event));
        summary.fail();

        assert!(summary.complete);
        assert_eq!((summary.transferred, summary.purged, summary.tidied), (1, 1, 1));
        assert_eq!(summary.unmatched, 1);
        assert_eq!(
            summary.to_string(),
            "1 transferred (1 older versions purged), 1 up to date (1 removed from origin), 1 skipped, 1 unmatched, 1 failed"
        );
    }
}
