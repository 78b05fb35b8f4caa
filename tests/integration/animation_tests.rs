//! Animation loop lifecycle under real threads.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use simdeck::animation::{AnimationLoop, Animator, RunState};

struct Blinker {
    frames: AtomicUsize,
    renders: AtomicUsize,
}

impl Blinker {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            frames: AtomicUsize::new(0),
            renders: AtomicUsize::new(0),
        })
    }
}

impl Animator for Blinker {
    fn name(&self) -> &str {
        "blinker"
    }

    fn animate(&self) {
        self.frames.fetch_add(1, Ordering::SeqCst);
    }

    fn render(&self) {
        self.renders.fetch_add(1, Ordering::SeqCst);
    }

    fn should_run(&self) -> bool {
        true
    }
}

#[test]
fn runs_frames_until_stopped() {
    let blinker = Blinker::new();
    let mut anim = AnimationLoop::new(Duration::from_millis(5));
    anim.start(Arc::clone(&blinker) as Arc<dyn Animator>);
    assert!(anim.is_running());

    std::thread::sleep(Duration::from_millis(60));
    anim.stop();
    assert_eq!(anim.state(), RunState::Stopped);
    assert!(!anim.is_abandoned());

    let frames = blinker.frames.load(Ordering::SeqCst);
    assert!(frames >= 2, "expected several frames, got {frames}");
    // Every frame advance was followed by a render.
    assert_eq!(frames, blinker.renders.load(Ordering::SeqCst));

    // No frames after stop.
    std::thread::sleep(Duration::from_millis(30));
    assert_eq!(blinker.frames.load(Ordering::SeqCst), frames);
}

#[test]
fn double_start_is_a_noop() {
    let blinker = Blinker::new();
    let mut anim = AnimationLoop::new(Duration::from_millis(5));
    anim.start(Arc::clone(&blinker) as Arc<dyn Animator>);
    anim.start(Arc::clone(&blinker) as Arc<dyn Animator>);
    assert!(anim.is_running());
    anim.stop();
}

#[test]
fn stop_before_start_is_safe() {
    let mut anim = AnimationLoop::new(Duration::from_millis(5));
    anim.stop();
    assert_ne!(anim.state(), RunState::Running);
}

#[test]
fn restart_after_stop() {
    let blinker = Blinker::new();
    let mut anim = AnimationLoop::new(Duration::from_millis(5));

    anim.start(Arc::clone(&blinker) as Arc<dyn Animator>);
    std::thread::sleep(Duration::from_millis(20));
    anim.stop();
    let after_first = blinker.frames.load(Ordering::SeqCst);

    anim.start(Arc::clone(&blinker) as Arc<dyn Animator>);
    assert!(anim.is_running());
    std::thread::sleep(Duration::from_millis(20));
    anim.stop();
    assert!(blinker.frames.load(Ordering::SeqCst) > after_first);
}

#[test]
fn drop_while_running_stops_the_thread() {
    let blinker = Blinker::new();
    {
        let mut anim = AnimationLoop::new(Duration::from_millis(5));
        anim.start(Arc::clone(&blinker) as Arc<dyn Animator>);
        std::thread::sleep(Duration::from_millis(20));
    }
    let at_drop = blinker.frames.load(Ordering::SeqCst);
    std::thread::sleep(Duration::from_millis(30));
    assert_eq!(blinker.frames.load(Ordering::SeqCst), at_drop);
}
