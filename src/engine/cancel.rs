use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Single-threaded cancellation token. A registry entry created with a token
/// subscribes once via [`CancelToken::on_fire`] and removes itself when the
/// token fires; firing is idempotent and runs each watcher exactly once.
#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Rc<RefCell<Inner>>,
}

#[derive(Default)]
struct Inner {
    fired: bool,
    watchers: Vec<Box<dyn FnOnce()>>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fire(&self) {
        let watchers = {
            let mut inner = self.inner.borrow_mut();
            if inner.fired {
                return;
            }
            inner.fired = true;
            std::mem::take(&mut inner.watchers)
        };
        // Watchers run after the borrow is released so they may touch
        // structures that also hold this token.
        for watcher in watchers {
            watcher();
        }
    }

    pub fn is_fired(&self) -> bool {
        self.inner.borrow().fired
    }

    /// Register a watcher. A watcher added after the token fired runs
    /// immediately.
    pub fn on_fire(&self, watcher: impl FnOnce() + 'static) {
        {
            let mut inner = self.inner.borrow_mut();
            if !inner.fired {
                inner.watchers.push(Box::new(watcher));
                return;
            }
        }
        watcher();
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("fired", &self.is_fired())
            .finish()
    }
}
