// Random selection with a staged reveal animation
//
// The result is drawn first; the animation only decides which random
// candidates are shown on the way there. Its last frame is always the result.

use chrono::{Datelike, NaiveDate, Weekday};
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::debug;

use crate::model::Student;
use crate::placement::fisher_yates;

pub const TICK_MS: u64 = 50;
pub const DURATION_MS: u64 = 5000;

/// Slow phase shows every n-th tick
const SLOW_EVERY: u32 = 3;

// ============================================================================
// Selections
// ============================================================================

pub fn pick_one<R: Rng>(students: &[Student], rng: &mut R) -> Option<Student> {
    if students.is_empty() {
        return None;
    }
    Some(students[rng.random_range(0..students.len())].clone())
}

/// `count` distinct students (fewer if the list is shorter).
pub fn pick_many<R: Rng>(students: &[Student], count: usize, rng: &mut R) -> Vec<Student> {
    let mut pool = students.to_vec();
    fisher_yates(&mut pool, rng);
    pool.truncate(count);
    pool
}

/// Splits students into `group_count` groups whose sizes differ by at most one.
pub fn assign_groups<R: Rng>(
    students: &[Student],
    group_count: usize,
    rng: &mut R,
) -> Vec<Vec<Student>> {
    let group_count = group_count.max(1);
    let mut pool = students.to_vec();
    fisher_yates(&mut pool, rng);

    let mut groups = vec![Vec::new(); group_count];
    for (i, student) in pool.into_iter().enumerate() {
        groups[i % group_count].push(student);
    }
    groups
}

/// Random presentation order: `per_day` students per school day (Mon-Fri)
/// starting at `start`.
pub fn submission_schedule<R: Rng>(
    students: &[Student],
    start: NaiveDate,
    per_day: usize,
    rng: &mut R,
) -> Vec<(NaiveDate, Student)> {
    let per_day = per_day.max(1);
    let mut pool = students.to_vec();
    fisher_yates(&mut pool, rng);

    let mut day = next_school_day(start);
    let mut schedule = Vec::with_capacity(pool.len());
    for (i, student) in pool.into_iter().enumerate() {
        if i > 0 && i % per_day == 0 {
            day = next_school_day(day.succ_opt().unwrap_or(day));
        }
        schedule.push((day, student));
    }
    schedule
}

fn next_school_day(mut date: NaiveDate) -> NaiveDate {
    while matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
        match date.succ_opt() {
            Some(next) => date = next,
            None => break,
        }
    }
    date
}

// ============================================================================
// Animation Frames
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Fast,
    Slow,
    Reveal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub tick_ms: u64,
    pub duration_ms: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            tick_ms: TICK_MS,
            duration_ms: DURATION_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Frame<T> {
    pub elapsed_ms: u64,
    pub phase: Phase,
    pub value: T,
    pub is_final: bool,
}

/// Precomputes the frames shown before `target`.
///
/// Fast phase (first 60%): a random candidate every tick. Slow phase (next
/// 30%): every third tick. Reveal (last 10%): the target, then a final
/// frame at the full duration.
pub fn plan<T, R, F>(target: T, timing: Timing, rng: &mut R, mut candidate: F) -> Vec<Frame<T>>
where
    T: Clone,
    R: Rng,
    F: FnMut(&mut R) -> T,
{
    let tick_ms = timing.tick_ms.max(1);
    let ticks = (timing.duration_ms / tick_ms).max(1) as u32;
    let mut frames = Vec::new();

    for tick in 0..ticks {
        let elapsed_ms = tick as u64 * tick_ms;
        let phase = phase_at(tick, ticks);
        match phase {
            Phase::Fast => frames.push(Frame {
                elapsed_ms,
                phase,
                value: candidate(rng),
                is_final: false,
            }),
            Phase::Slow if tick % SLOW_EVERY == 0 => frames.push(Frame {
                elapsed_ms,
                phase,
                value: candidate(rng),
                is_final: false,
            }),
            Phase::Slow => {}
            Phase::Reveal => {
                frames.push(Frame {
                    elapsed_ms,
                    phase,
                    value: target.clone(),
                    is_final: false,
                });
                break;
            }
        }
    }

    frames.push(Frame {
        elapsed_ms: ticks as u64 * tick_ms,
        phase: Phase::Reveal,
        value: target,
        is_final: true,
    });
    frames
}

fn phase_at(tick: u32, ticks: u32) -> Phase {
    let scaled = tick as u64 * 10;
    if scaled < ticks as u64 * 6 {
        Phase::Fast
    } else if scaled < ticks as u64 * 9 {
        Phase::Slow
    } else {
        Phase::Reveal
    }
}

// ============================================================================
// Background Runner
// ============================================================================

/// Running animation. Dropping the handle cancels it.
pub struct AnimationHandle<T> {
    receiver: Receiver<Frame<T>>,
    cancelled: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

/// Plays `frames` on a background thread, sending each one when its time
/// has come. The calling thread is never blocked.
pub fn spawn<T: Send + 'static>(frames: Vec<Frame<T>>, tick: Duration) -> AnimationHandle<T> {
    let (sender, receiver) = mpsc::channel();
    let cancelled = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancelled);
    let tick = tick.max(Duration::from_millis(1));

    let thread = thread::spawn(move || {
        let start = Instant::now();
        for frame in frames {
            let due = Duration::from_millis(frame.elapsed_ms);
            // Sleep in tick-sized steps so cancellation is noticed promptly.
            loop {
                if flag.load(Ordering::Relaxed) {
                    debug!("animation cancelled");
                    return;
                }
                let remaining = due.saturating_sub(start.elapsed());
                if remaining.is_zero() {
                    break;
                }
                thread::sleep(remaining.min(tick));
            }
            if sender.send(frame).is_err() {
                return;
            }
        }
    });

    AnimationHandle {
        receiver,
        cancelled,
        thread: Some(thread),
    }
}

impl<T> AnimationHandle<T> {
    /// Next frame, or None once the animation has finished or was cancelled.
    pub fn next_frame(&self) -> Option<Frame<T>> {
        self.receiver.recv().ok()
    }

    pub fn next_frame_timeout(&self, timeout: Duration) -> Result<Frame<T>, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Blocks until the final frame and returns its value.
    pub fn wait_final(self) -> Option<T> {
        while let Some(frame) = self.next_frame() {
            if frame.is_final {
                return Some(frame.value);
            }
        }
        None
    }
}

impl<T> Drop for AnimationHandle<T> {
    fn drop(&mut self) {
        self.cancel();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
