//! Observable phase cell shared by hosts and module gates.

use super::Phase;
use tokio::sync::watch;

/// Single-writer phase holder backed by a watch channel.
///
/// Whoever owns the cell is the only party able to move the phase. Readers get
/// `watch::Receiver`s that always see a complete value.
pub(crate) struct PhaseCell<P: Phase> {
    tx: watch::Sender<P>,
}

impl<P: Phase> PhaseCell<P> {
    /// Create a cell at [`Phase::INITIAL`] together with a plain reader.
    pub(crate) fn new() -> (Self, watch::Receiver<P>) {
        let (tx, rx) = watch::channel(P::INITIAL);
        (Self { tx }, rx)
    }

    pub(crate) fn current(&self) -> P {
        *self.tx.borrow()
    }

    /// A reader whose first `changed()` resolves immediately with the current
    /// value, followed by every later commit.
    pub(crate) fn subscribe(&self) -> watch::Receiver<P> {
        replaying(self.tx.subscribe())
    }

    /// Move one step forward to `target`.
    ///
    /// The check against `target.previous()` and the write happen under the
    /// channel lock. Returns the phase left behind, or the current phase when
    /// `target` is not its direct successor.
    pub(crate) fn step_to(&self, target: P) -> Result<P, P> {
        let mut outcome = Err(target);
        self.tx.send_if_modified(|current| {
            if target.previous() == Some(*current) {
                outcome = Ok(std::mem::replace(current, target));
                true
            } else {
                outcome = Err(*current);
                false
            }
        });
        outcome
    }
}

/// Turn a receiver into one that replays the value it currently holds.
pub(crate) fn replaying<P: Phase>(mut rx: watch::Receiver<P>) -> watch::Receiver<P> {
    rx.mark_changed();
    rx
}
