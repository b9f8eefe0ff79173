//! Two-phase tentative state for callers that show a change before the server
//! confirms it: apply locally, call the ledger, then commit or roll back.

/// Holds the value a tentative change replaced.
#[must_use = "a tentative change must be committed or rolled back"]
#[derive(Debug)]
pub struct Tentative<T> {
    previous: T,
}

impl<T> Tentative<T> {
    /// Installs `next` in `state` and keeps the old value for undo.
    pub fn apply(state: &mut T, next: T) -> Self {
        let previous = std::mem::replace(state, next);
        Tentative { previous }
    }

    /// Keeps the tentative state and drops the undo value.
    pub fn commit(self) {}

    /// Puts the replaced value back.
    pub fn rollback(self, state: &mut T) {
        *state = self.previous;
    }

    /// Commits on `Ok`, rolls back on `Err`.
    pub fn settle<R, E>(self, state: &mut T, outcome: &Result<R, E>) {
        match outcome {
            Ok(_) => self.commit(),
            Err(_) => self.rollback(state),
        }
    }
}
