//! Cooperative timer primitives for the script runtime.
//!
//! # Design
//! Deadlines live on the host in a `TimerQueue`; callbacks live in script
//! land (`js/timers.js`) keyed by timer id. The runtime's event loop pops the
//! earliest due timer, sleeps until its deadline and asks the script side to
//! run it. Timers with equal deadlines fire in scheduling order. Nothing runs
//! concurrently: a timer only fires when the host loop is driven.

use std::cell::RefCell;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};
use std::rc::Rc;
use std::time::{Duration, Instant};

use rquickjs::function::Opt;
use rquickjs::{Ctx, Function, Object};

const TIMERS_JS: &str = include_str!("../js/timers.js");

/// Host-side queue shared between the timer functions and the event loop.
pub type SharedTimers = Rc<RefCell<TimerQueue>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timer {
    pub deadline: Instant,
    pub seq: u64,
    pub id: u32,
}

#[derive(Debug, Default)]
pub struct TimerQueue {
    next_id: u32,
    seq: u64,
    pending: BinaryHeap<Reverse<Timer>>,
    cancelled: HashSet<u32>,
}

impl TimerQueue {
    pub fn schedule(&mut self, delay: Duration) -> u32 {
        self.next_id = self.next_id.wrapping_add(1);
        self.seq = self.seq.wrapping_add(1);
        let timer = Timer {
            deadline: Instant::now() + delay,
            seq: self.seq,
            id: self.next_id,
        };
        self.pending.push(Reverse(timer));
        timer.id
    }

    pub fn cancel(&mut self, id: u32) {
        if self.pending.iter().any(|Reverse(t)| t.id == id) {
            self.cancelled.insert(id);
        }
    }

    /// Remove and return the earliest live timer.
    pub fn pop_next(&mut self) -> Option<Timer> {
        while let Some(Reverse(timer)) = self.pending.pop() {
            if !self.cancelled.remove(&timer.id) {
                return Some(timer);
            }
        }
        None
    }

    pub fn len(&self) -> usize {
        self.pending.len() - self.cancelled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Install `setTimeout`/`clearTimeout` backed by `timers`.
pub fn install<'js>(ctx: &Ctx<'js>, timers: SharedTimers) -> rquickjs::Result<()> {
    let host = Object::new(ctx.clone())?;

    let queue = timers.clone();
    host.set(
        "schedule",
        Function::new(ctx.clone(), move |delay_ms: Opt<f64>| -> u32 {
            queue.borrow_mut().schedule(delay_from_ms(delay_ms.0.unwrap_or(0.0)))
        })?,
    )?;
    host.set(
        "cancel",
        Function::new(ctx.clone(), move |id: u32| {
            timers.borrow_mut().cancel(id);
        })?,
    )?;

    ctx.globals().set("__timerHost", host)?;
    ctx.eval::<(), _>(TIMERS_JS)
}

/// Run the script callback registered for timer `id`.
pub fn fire(ctx: &Ctx<'_>, id: u32) -> rquickjs::Result<()> {
    let fire: Function = ctx.globals().get("__fireTimer")?;
    fire.call((id,))
}

fn delay_from_ms(ms: f64) -> Duration {
    if ms.is_finite() && ms > 0.0 {
        Duration::from_secs_f64(ms / 1000.0)
    } else {
        Duration::ZERO
    }
}
