use tracing::trace;

use super::{Change, Persistence, PersistenceError};

/// Records every change in the order the tree emitted it.
#[derive(Debug, Clone, Default)]
pub struct ChangeLog {
    changes: Vec<Change>,
    opened: bool,
    closed: bool,
}

impl ChangeLog {
    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    pub fn events(&self) -> Vec<&'static str> {
        self.changes.iter().map(Change::event).collect()
    }

    pub fn clear(&mut self) {
        self.changes.clear();
    }

    pub fn is_open(&self) -> bool {
        self.opened && !self.closed
    }
}

impl Persistence for ChangeLog {
    fn open(&mut self) -> Result<(), PersistenceError> {
        self.opened = true;
        Ok(())
    }

    fn apply(&mut self, change: &Change) -> Result<(), PersistenceError> {
        trace!("Recording {}", change.event());
        self.changes.push(change.clone());
        Ok(())
    }

    fn close(&mut self) -> Result<(), PersistenceError> {
        self.closed = true;
        Ok(())
    }
}
