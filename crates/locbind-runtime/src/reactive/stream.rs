#![forbid(unsafe_code)]

//! Buffered change streams on top of [`Observable`].
//!
//! A [`ChangeStream`] is a pull-style view of an observable: every change
//! after the stream was opened is queued, in order, until the owner drains
//! it. Any number of streams may be open on one observable; each gets its
//! own copy of every change. Dropping a stream unsubscribes it.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use super::observable::{Observable, Subscription};

/// Queue of values observed since the stream was opened.
pub struct ChangeStream<T> {
    queue: Rc<RefCell<VecDeque<T>>>,
    _subscription: Subscription,
}

impl<T: std::fmt::Debug> std::fmt::Debug for ChangeStream<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeStream")
            .field("pending", &self.queue.borrow())
            .finish_non_exhaustive()
    }
}

impl<T: Clone + PartialEq + 'static> ChangeStream<T> {
    /// Open a stream on `source`.
    #[must_use]
    pub fn open(source: &Observable<T>) -> Self {
        let queue = Rc::new(RefCell::new(VecDeque::new()));
        let sink = Rc::clone(&queue);
        let subscription = source.subscribe(move |value: &T| {
            sink.borrow_mut().push_back(value.clone());
        });
        Self {
            queue,
            _subscription: subscription,
        }
    }
}

impl<T> ChangeStream<T> {
    /// Pop the oldest pending change.
    pub fn try_next(&self) -> Option<T> {
        self.queue.borrow_mut().pop_front()
    }

    /// Take every pending change, oldest first.
    pub fn drain(&self) -> Vec<T> {
        self.queue.borrow_mut().drain(..).collect()
    }

    /// Number of changes waiting.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }
}

impl<T> Iterator for ChangeStream<T> {
    type Item = T;

    /// Yields pending changes; `None` means "nothing queued right now", not
    /// end of stream.
    fn next(&mut self) -> Option<T> {
        self.try_next()
    }
}
