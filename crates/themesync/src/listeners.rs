//! Presentation-layer change listeners.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::Theme;

/// Callback invoked with the new effective theme.
pub type Listener = Rc<dyn Fn(Theme)>;

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
pub(crate) struct ListenerSet {
    entries: RefCell<Vec<(ListenerId, Listener)>>,
    next_id: Cell<u64>,
}

impl ListenerSet {
    pub(crate) fn add(&self, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(self.next_id.get() + 1);
        self.entries.borrow_mut().push((id, listener));
        id
    }

    pub(crate) fn remove(&self, id: ListenerId) -> bool {
        let mut entries = self.entries.borrow_mut();
        let before = entries.len();
        entries.retain(|(existing, _)| *existing != id);
        entries.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Calls every listener with `theme` while `still_current` holds.
    ///
    /// The list is copied first so listeners may subscribe, unsubscribe or
    /// re-enter their owner. A nested change notifies everyone itself, so
    /// the outer round stops as soon as `still_current` fails, even if the
    /// nested changes ended on the same theme.
    pub(crate) fn notify(&self, theme: Theme, still_current: impl Fn() -> bool) {
        let listeners: Vec<Listener> = self
            .entries
            .borrow()
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        for listener in listeners {
            if !still_current() {
                break;
            }
            listener(theme);
        }
    }
}
