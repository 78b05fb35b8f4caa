//! Cooperative per-button animation loop.
//!
//! Each animated representation owns one [`AnimationLoop`]: a background
//! thread that advances a frame, asks the owner to re-render, then waits
//! on the stop condvar for one period — the wait doubles as the
//! inter-frame delay, so a stop request is observed promptly rather than
//! only after a full period.
//!
//! Stopping is cooperative with a bounded wait (2× period). A loop that
//! misses the deadline is logged and marked **abandoned** — queryable via
//! [`AnimationLoop::is_abandoned`] — and is expected to terminate itself
//! on its next stop-flag check; it is never force-killed.

use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, warn};

/// Frame hooks supplied by the owning representation. The loop has no
/// opinion on *why* it runs, only *that* it runs until told to stop.
pub trait Animator: Send + Sync {
    /// Name used in logs and the thread name.
    fn name(&self) -> &str;

    /// Advance animation state by one frame.
    fn animate(&self);

    /// Ask the owner to re-render with the new frame state.
    fn render(&self);

    /// Owner-supplied predicate, re-evaluated by the owner on every
    /// external render request (e.g. "value is on"). Default: do not run.
    fn should_run(&self) -> bool {
        false
    }
}

/// Loop lifecycle: `Unstarted → Running → Stopped`, re-entrant back to
/// `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    Unstarted,
    Running,
    Stopped,
}

struct StopSignal {
    stop: Mutex<bool>,
    stop_cv: Condvar,
    done: Mutex<bool>,
    done_cv: Condvar,
}

impl StopSignal {
    fn new() -> Self {
        Self {
            stop: Mutex::new(false),
            stop_cv: Condvar::new(),
            done: Mutex::new(false),
            done_cv: Condvar::new(),
        }
    }
}

pub struct AnimationLoop {
    period: Duration,
    state: RunState,
    signal: Option<Arc<StopSignal>>,
    handle: Option<JoinHandle<()>>,
    abandoned: bool,
}

impl AnimationLoop {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            state: RunState::Unstarted,
            signal: None,
            handle: None,
            abandoned: false,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == RunState::Running
    }

    /// True when a previous stop timed out and the thread was left to
    /// terminate on its own.
    pub fn is_abandoned(&self) -> bool {
        self.abandoned
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Spawn the loop. A no-op with a warning when already running.
    pub fn start(&mut self, animator: Arc<dyn Animator>) {
        if self.state == RunState::Running {
            warn!("{}: already started", animator.name());
            return;
        }

        let signal = Arc::new(StopSignal::new());
        let period = self.period;
        let thread_signal = Arc::clone(&signal);
        let name = format!("anim::{}", animator.name());

        let handle = thread::Builder::new().name(name).spawn(move || {
            loop {
                animator.animate();
                animator.render();

                let guard = match thread_signal.stop.lock() {
                    Ok(g) => g,
                    Err(poisoned) => poisoned.into_inner(),
                };
                // The timed wait is the inter-frame delay.
                let (guard, _timeout) = match thread_signal
                    .stop_cv
                    .wait_timeout_while(guard, period, |stop| !*stop)
                {
                    Ok(r) => r,
                    Err(poisoned) => poisoned.into_inner(),
                };
                if *guard {
                    break;
                }
            }
            match thread_signal.done.lock() {
                Ok(mut done) => *done = true,
                Err(poisoned) => *poisoned.into_inner() = true,
            }
            thread_signal.done_cv.notify_all();
            debug!("animation loop exited");
        });

        match handle {
            Ok(h) => {
                self.signal = Some(signal);
                self.handle = Some(h);
                self.state = RunState::Running;
                self.abandoned = false;
                debug!("animation loop started");
            }
            Err(e) => {
                warn!("animation loop failed to spawn: {e}");
                self.state = RunState::Stopped;
            }
        }
    }

    /// Signal the loop to stop and wait up to 2× period for it to
    /// acknowledge; never blocks indefinitely.
    pub fn stop(&mut self) {
        if self.state != RunState::Running {
            debug!("animation loop already stopped");
            return;
        }
        self.state = RunState::Stopped;

        let Some(signal) = self.signal.take() else {
            return;
        };
        match signal.stop.lock() {
            Ok(mut stop) => *stop = true,
            Err(poisoned) => *poisoned.into_inner() = true,
        }
        signal.stop_cv.notify_all();

        let deadline = self.period * 2;
        let done = match signal.done.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        let (done, _timeout) = match signal
            .done_cv
            .wait_timeout_while(done, deadline, |done| !*done)
        {
            Ok(r) => r,
            Err(poisoned) => poisoned.into_inner(),
        };

        if *done {
            if let Some(handle) = self.handle.take() {
                let _ = handle.join();
            }
            debug!("animation loop stopped");
        } else {
            warn!("animation loop did not terminate within {deadline:?}, abandoning");
            self.abandoned = true;
            // Drop the handle: the thread runs detached until it sees
            // the stop flag on its next check.
            self.handle = None;
        }
    }
}

impl Drop for AnimationLoop {
    fn drop(&mut self) {
        if self.state == RunState::Running {
            self.stop();
        }
    }
}
