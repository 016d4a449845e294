use std::{
    sync::{Arc, Mutex as StdMutex},
    time::Duration,
};

use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};

pub const DEFAULT_SLIDE_INTERVAL: Duration = Duration::from_secs(5);

struct SlideState {
    current: usize,
    hovered: bool,
    hidden: bool,
    // Handshake with the tick task: a tick that acquires the lock after a
    // pause sees armed == false and does not advance.
    armed: bool,
}

/// Circular slide position with timer-driven autoplay.
///
/// The slide count is fixed at construction; with zero or one slide the
/// controller is inert. Autoplay pauses while the pointer is over the
/// carousel or the host view is hidden, and resumes only once neither
/// condition holds. The timer is owned as a [`JoinHandle`] and is aborted on
/// every pause path and on drop.
pub struct SlideshowController {
    total: usize,
    interval: Duration,
    state: Arc<Mutex<SlideState>>,
    timer: StdMutex<Option<JoinHandle<()>>>,
}

impl SlideshowController {
    /// With more than one slide this arms the autoplay timer immediately,
    /// so it must be called from within a Tokio runtime.
    pub fn new(total: usize, interval: Duration) -> Self {
        let controller = Self {
            total,
            interval,
            state: Arc::new(Mutex::new(SlideState {
                current: 0,
                hovered: false,
                hidden: false,
                armed: total > 1,
            })),
            timer: StdMutex::new(None),
        };
        if total > 1 {
            controller.spawn_timer();
        }
        controller
    }

    pub fn total_slides(&self) -> usize {
        self.total
    }

    pub async fn current_index(&self) -> usize {
        self.state.lock().await.current
    }

    pub async fn autoplay_running(&self) -> bool {
        self.state.lock().await.armed
    }

    /// Manual step forward, wrapping past the last slide. Works regardless
    /// of whether autoplay is running.
    pub async fn next_slide(&self) -> usize {
        let mut state = self.state.lock().await;
        if self.total > 0 {
            state.current = (state.current + 1) % self.total;
        }
        state.current
    }

    /// Manual step backward, wrapping before the first slide.
    pub async fn prev_slide(&self) -> usize {
        let mut state = self.state.lock().await;
        if self.total > 0 {
            state.current = (state.current + self.total - 1) % self.total;
        }
        state.current
    }

    /// Jumps to `index`; out-of-range requests are ignored.
    pub async fn go_to_slide(&self, index: usize) {
        let mut state = self.state.lock().await;
        if index < self.total {
            state.current = index;
        }
    }

    pub async fn pointer_entered(&self) {
        {
            let mut state = self.state.lock().await;
            state.hovered = true;
            state.armed = false;
        }
        self.abort_timer();
    }

    pub async fn pointer_left(&self) {
        {
            let mut state = self.state.lock().await;
            state.hovered = false;
        }
        self.resume_if_idle().await;
    }

    /// Host visibility signal; `true` pauses autoplay, `false` resumes it
    /// unless the pointer still hovers the carousel.
    pub async fn set_hidden(&self, hidden: bool) {
        {
            let mut state = self.state.lock().await;
            state.hidden = hidden;
            if hidden {
                state.armed = false;
            }
        }
        if hidden {
            self.abort_timer();
        } else {
            self.resume_if_idle().await;
        }
    }

    pub async fn pause_autoplay(&self) {
        {
            let mut state = self.state.lock().await;
            state.armed = false;
        }
        self.abort_timer();
    }

    /// Re-arms the timer when no pause condition is active.
    pub async fn resume_autoplay(&self) {
        self.resume_if_idle().await;
    }

    async fn resume_if_idle(&self) {
        if self.total <= 1 {
            return;
        }
        {
            let mut state = self.state.lock().await;
            if state.hovered || state.hidden || state.armed {
                return;
            }
            state.armed = true;
        }
        self.spawn_timer();
    }

    fn spawn_timer(&self) {
        let state = Arc::clone(&self.state);
        let total = self.total;
        let period = self.interval;
        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // An interval's first tick resolves immediately; consume it so
            // the first advance happens one full period after arming.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let mut slides = state.lock().await;
                if !slides.armed {
                    break;
                }
                slides.current = (slides.current + 1) % total;
            }
        });
        if let Ok(mut timer) = self.timer.lock() {
            if let Some(previous) = timer.replace(handle) {
                previous.abort();
            }
        }
    }

    fn abort_timer(&self) {
        if let Ok(mut timer) = self.timer.lock() {
            if let Some(handle) = timer.take() {
                handle.abort();
            }
        }
    }
}

impl Drop for SlideshowController {
    fn drop(&mut self) {
        self.abort_timer();
    }
}

#[cfg(test)]
#[path = "tests/slideshow_tests.rs"]
mod tests;
