/*
Copyright (c) 2020 Todd Stellanova
LICENSE: BSD3 (see LICENSE file)
*/

//! Serializes bus transactions for one device.
//!
//! Exactly one task runs at a time, in strict enqueue order. A running
//! task owns the bus only for the duration of its call; once its bus
//! operation completes it must hand its [`Advance`] token back, which
//! starts the next waiting task.
//!
//! There is no timeout and no cancellation: a task that never advances
//! stalls every transaction queued behind it.

use alloc::boxed::Box;
use alloc::collections::VecDeque;
use alloc::rc::{Rc, Weak};
use core::cell::RefCell;

type Task<R> = Box<dyn FnOnce(&mut R, Advance<R>)>;

struct State<R> {
    waiting: VecDeque<Task<R>>,
    /// A task has started its bus operation and has not advanced yet
    in_flight: bool,
    /// The dispatch loop is on the stack; nested dispatch calls defer to it
    dispatching: bool,
}

struct Shared<R> {
    bus: RefCell<R>,
    state: RefCell<State<R>>,
}

/// Run waiting tasks until one is left in flight or none remain.
///
/// A task that completes synchronously advances from inside this loop;
/// the nested call returns at once and the loop picks up the next task,
/// so the bus is never borrowed twice and the stack does not grow.
fn dispatch<R>(shared: &Rc<Shared<R>>) {
    {
        let mut state = shared.state.borrow_mut();
        if state.dispatching {
            return;
        }
        state.dispatching = true;
    }

    loop {
        let next = {
            let mut state = shared.state.borrow_mut();
            if state.in_flight {
                None
            } else {
                let task = state.waiting.pop_front();
                state.in_flight = task.is_some();
                task
            }
        };

        let task = match next {
            Some(task) => task,
            None => break,
        };

        let token = Advance {
            shared: Rc::downgrade(shared),
        };
        let mut bus = shared.bus.borrow_mut();
        task(&mut *bus, token);
    }

    shared.state.borrow_mut().dispatching = false;
}

/// Completion token handed to each running task.
///
/// Consuming it with [`Advance::advance`] frees the bus for the next
/// queued task. Holds only a weak reference to the queue, so a completion
/// arriving after the queue is gone is a no-op.
pub struct Advance<R> {
    shared: Weak<Shared<R>>,
}

impl<R> Advance<R> {
    /// Signal that this task's bus operation has completed.
    pub fn advance(self) {
        if let Some(shared) = self.shared.upgrade() {
            shared.state.borrow_mut().in_flight = false;
            dispatch(&shared);
        }
    }
}

/// FIFO of bus tasks, owning the bus resource `R`.
pub struct TransactionQueue<R> {
    shared: Rc<Shared<R>>,
}

impl<R> TransactionQueue<R> {
    pub fn new(bus: R) -> Self {
        Self {
            shared: Rc::new(Shared {
                bus: RefCell::new(bus),
                state: RefCell::new(State {
                    waiting: VecDeque::new(),
                    in_flight: false,
                    dispatching: false,
                }),
            }),
        }
    }

    /// Append a task. It runs immediately if the bus is idle, otherwise
    /// after every task enqueued before it has advanced.
    pub fn enqueue<F>(&self, task: F)
    where
        F: FnOnce(&mut R, Advance<R>) + 'static,
    {
        self.shared
            .state
            .borrow_mut()
            .waiting
            .push_back(Box::new(task));
        dispatch(&self.shared);
    }

    /// True when nothing is in flight and nothing is waiting
    pub fn is_idle(&self) -> bool {
        let state = self.shared.state.borrow();
        !state.in_flight && state.waiting.is_empty()
    }

    /// Number of tasks not yet advanced, including the one in flight
    pub fn pending(&self) -> usize {
        let state = self.shared.state.borrow();
        state.waiting.len() + usize::from(state.in_flight)
    }

    /// Give back the bus. Fails, returning the queue, while work is pending.
    pub fn into_inner(self) -> Result<R, Self> {
        if !self.is_idle() {
            return Err(self);
        }
        match Rc::try_unwrap(self.shared) {
            Ok(shared) => Ok(shared.bus.into_inner()),
            Err(shared) => Err(Self { shared }),
        }
    }
}
