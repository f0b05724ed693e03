use std::cell::RefCell;
use std::rc::Rc;

use gloo_timers::callback::Timeout;
use tramos::FilterEngine;

/// Delays the recompute that follows search typing. Each schedule replaces
/// the pending timeout; dropping a `Timeout` clears it.
pub struct SearchDebounce {
    delay_ms: u32,
    pending: RefCell<Option<Timeout>>,
}

impl SearchDebounce {
    pub fn new(delay_ms: u32) -> Self {
        SearchDebounce {
            delay_ms,
            pending: RefCell::new(None),
        }
    }

    pub fn delay_ms(&self) -> u32 {
        self.delay_ms
    }

    pub fn schedule(&self, engine: &Rc<FilterEngine>) {
        if self.delay_ms == 0 {
            self.cancel();
            engine.recompute();
            return;
        }
        let engine = Rc::downgrade(engine);
        let timeout = Timeout::new(self.delay_ms, move || {
            if let Some(engine) = engine.upgrade() {
                engine.recompute();
            }
        });
        // A fired timeout left in the slot is dropped on the next schedule.
        *self.pending.borrow_mut() = Some(timeout);
    }

    pub fn cancel(&self) {
        self.pending.borrow_mut().take();
    }

    /// Runs the pending recompute now.
    pub fn flush(&self, engine: &FilterEngine) {
        if self.pending.borrow_mut().take().is_some() {
            engine.recompute();
        }
    }
}
