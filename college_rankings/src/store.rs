//! The owner of the in-memory state of a browsing session.
//!
//! Collections are never mutated in place. A reload produces a complete
//! [Snapshot] which replaces the previous one. Loads are identified by
//! [LoadTicket]s: the last completion always wins, and a completion that
//! was overtaken by a newer load is reported as stale.

use std::collections::VecDeque;

use log::{debug, info, warn};

use crate::config::*;
use crate::select::{SelectOutcome, Selection};

/// Identifies one load, in the order loads were started.
#[derive(Eq, PartialEq, Debug, Clone, Copy, PartialOrd, Ord)]
pub struct LoadTicket(u64);

impl LoadTicket {
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// The data of one complete load.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct Snapshot {
    /// Empty if the entities could not be loaded.
    pub colleges: Vec<College>,
    /// None if the predictions could not be loaded.
    pub predictions: Option<Vec<Prediction>>,
}

#[derive(PartialEq, Debug, Clone)]
pub struct ReplaceOutcome {
    pub previous: Snapshot,
    /// A newer load was started before this one completed.
    pub stale: bool,
}

#[derive(Debug, Clone)]
pub struct Store {
    snapshot: Snapshot,
    generation: u64,
    last_ticket: u64,
    current_year: Year,
    selection: Selection,
    notices: VecDeque<Notice>,
}

impl Store {
    pub fn new(current_year: Year, max_selection: usize) -> Result<Store, RankingError> {
        let current_year = checked_year(current_year as i64)?;
        Ok(Store {
            snapshot: Snapshot::default(),
            generation: 0,
            last_ticket: 0,
            current_year,
            selection: Selection::new(max_selection)?,
            notices: VecDeque::new(),
        })
    }

    pub fn begin_load(&mut self) -> LoadTicket {
        self.last_ticket += 1;
        debug!("begin_load: ticket {}", self.last_ticket);
        LoadTicket(self.last_ticket)
    }

    /// Replaces the whole snapshot with the result of a load.
    ///
    /// The selection is carried over, pointing to the new copies of the
    /// selected entities.
    pub fn complete_load(&mut self, ticket: LoadTicket, snapshot: Snapshot) -> ReplaceOutcome {
        let stale = ticket.0 < self.last_ticket;
        if stale {
            warn!(
                "complete_load: ticket {} completed after ticket {} was started",
                ticket.0, self.last_ticket
            );
        }
        let previous = std::mem::replace(&mut self.snapshot, snapshot);
        self.generation += 1;
        self.selection.refresh(&self.snapshot.colleges);
        info!(
            "Loaded {} colleges and {} predictions (generation {})",
            self.snapshot.colleges.len(),
            self.snapshot.predictions.as_ref().map(|p| p.len()).unwrap_or(0),
            self.generation
        );
        ReplaceOutcome { previous, stale }
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn colleges(&self) -> &[College] {
        &self.snapshot.colleges
    }

    pub fn predictions(&self) -> Option<&[Prediction]> {
        self.snapshot.predictions.as_deref()
    }

    /// The number of snapshots installed so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn current_year(&self) -> Year {
        self.current_year
    }

    pub fn set_current_year(&mut self, year: i64) -> Result<(), RankingError> {
        self.current_year = checked_year(year)?;
        Ok(())
    }

    pub fn find(&self, id: &str) -> Option<&College> {
        self.snapshot.colleges.iter().find(|c| c.id == id)
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut Selection {
        &mut self.selection
    }

    /// Adds the entity with this id to the selection. Returns None if no
    /// entity has this id. A full selection queues a notice.
    pub fn select(&mut self, id: &str) -> Option<SelectOutcome> {
        let college = self.snapshot.colleges.iter().find(|c| c.id == id)?;
        let outcome = self.selection.select(college);
        if let SelectOutcome::Full(notice) = &outcome {
            self.push_notice(notice.clone());
        }
        Some(outcome)
    }

    pub fn push_notice(&mut self, notice: Notice) {
        match notice.level {
            NoticeLevel::Error => warn!("{}", notice.message),
            _ => info!("{}", notice.message),
        }
        self.notices.push_back(notice);
    }

    /// Takes all the pending notices, oldest first.
    pub fn drain_notices(&mut self) -> Vec<Notice> {
        self.notices.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(ids: &[&str]) -> Snapshot {
        Snapshot {
            colleges: ids.iter().map(|id| College::new(*id, *id)).collect(),
            predictions: None,
        }
    }

    #[test]
    fn replace_returns_previous() {
        let _ = env_logger::try_init();
        let mut store = Store::new(2025, 6).unwrap();
        let t = store.begin_load();
        let outcome = store.complete_load(t, snapshot(&["a"]));
        assert!(!outcome.stale);
        assert!(outcome.previous.colleges.is_empty());
        assert_eq!(store.generation(), 1);

        let t = store.begin_load();
        let outcome = store.complete_load(t, snapshot(&["b", "c"]));
        assert_eq!(outcome.previous, snapshot(&["a"]));
        assert_eq!(store.colleges().len(), 2);
        assert_eq!(store.predictions(), None);
    }

    #[test]
    fn last_write_wins() {
        let mut store = Store::new(2025, 6).unwrap();
        let first = store.begin_load();
        let second = store.begin_load();
        assert!(first < second);

        let outcome = store.complete_load(second, snapshot(&["new"]));
        assert!(!outcome.stale);
        let outcome = store.complete_load(first, snapshot(&["old"]));
        assert!(outcome.stale);
        assert_eq!(store.colleges()[0].id, "old");
        assert_eq!(store.generation(), 2);
    }

    #[test]
    fn full_selection_queues_notice() {
        let mut store = Store::new(2025, 1).unwrap();
        let t = store.begin_load();
        store.complete_load(t, snapshot(&["a", "b"]));
        assert_eq!(store.select("a"), Some(SelectOutcome::Added));
        assert_eq!(store.select("zz"), None);
        assert!(matches!(store.select("b"), Some(SelectOutcome::Full(_))));
        let notices = store.drain_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].message, "Maximum 1 colleges can be selected");
        assert!(store.drain_notices().is_empty());
        assert_eq!(store.selection().ids(), vec!["a"]);
    }

    #[test]
    fn selection_survives_reload() {
        let mut store = Store::new(2025, 6).unwrap();
        let t = store.begin_load();
        store.complete_load(t, snapshot(&["a", "b"]));
        store.select("a");
        store.select("b");
        let t = store.begin_load();
        store.complete_load(t, snapshot(&["b"]));
        assert_eq!(store.selection().ids(), vec!["b"]);
    }

    #[test]
    fn year_must_be_covered() {
        assert!(Store::new(2030, 6).is_err());
        assert!(Store::new(2025, 0).is_err());
        let mut store = Store::new(2025, 6).unwrap();
        assert_eq!(store.set_current_year(2019), Ok(()));
        assert_eq!(store.current_year(), 2019);
        assert!(store.set_current_year(2016).is_err());
        assert_eq!(store.current_year(), 2019);
    }
}
