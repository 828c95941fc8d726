//! The slideshow controller.
//!
//! Owns the displayed index, the paused flag and both timer kinds. Every
//! change to the index or the paused flag re-arms the advance timer, so each
//! newly shown image always gets a full dwell period. Time is passed in by
//! the caller; the controller never reads the clock itself.

use std::mem;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::{debug, trace, warn};

use crate::error::Error;
use crate::events::{NavKey, SlideshowEvent};
use crate::timers::{TimerHandle, TimerQueue};

pub const DEFAULT_DWELL: Duration = Duration::from_millis(3000);
pub const DEFAULT_IDLE_WINDOW: Duration = Duration::from_millis(5000);

/// Bounds applied to dwell and idle window. A zero interval would re-arm at
/// the instant it fires; the upper bound keeps deadlines representable.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);
pub const MAX_INTERVAL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Policy for pointer activity that arrives while a resume is already pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IdleResume {
    /// Cancel the pending resume and start a fresh idle window.
    #[default]
    Restart,
    /// Keep every pending resume; the earliest one to fire unpauses.
    Overlap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlideshowSettings {
    pub dwell: Duration,
    pub idle_window: Duration,
    pub idle_resume: IdleResume,
}

impl SlideshowSettings {
    /// Clamp both intervals into `MIN_INTERVAL..=MAX_INTERVAL`.
    pub fn clamped(self) -> Self {
        Self {
            dwell: self.dwell.clamp(MIN_INTERVAL, MAX_INTERVAL),
            idle_window: self.idle_window.clamp(MIN_INTERVAL, MAX_INTERVAL),
            ..self
        }
    }
}

impl Default for SlideshowSettings {
    fn default() -> Self {
        Self {
            dwell: DEFAULT_DWELL,
            idle_window: DEFAULT_IDLE_WINDOW,
            idle_resume: IdleResume::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Timer {
    Advance,
    Resume,
}

#[derive(Debug)]
pub struct Slideshow {
    len: NonZeroUsize,
    index: usize,
    paused: bool,
    settings: SlideshowSettings,
    timers: TimerQueue<Timer>,
    advance_timer: Option<TimerHandle>,
}

impl Slideshow {
    /// Start at the first entry, unpaused, with the advance timer armed.
    /// Out-of-range intervals are clamped (see [`SlideshowSettings::clamped`]).
    pub fn new(len: NonZeroUsize, settings: SlideshowSettings, now: Instant) -> Self {
        let clamped = settings.clamped();
        if clamped != settings {
            warn!(
                dwell = ?clamped.dwell,
                idle_window = ?clamped.idle_window,
                "slideshow intervals out of range; clamped"
            );
        }
        let mut show = Self {
            len,
            index: 0,
            paused: false,
            settings: clamped,
            timers: TimerQueue::new(),
            advance_timer: None,
        };
        show.rearm(now);
        show
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn len(&self) -> NonZeroUsize {
        self.len
    }

    pub fn advance(&mut self, now: Instant) -> Option<SlideshowEvent> {
        let next = (self.index + 1) % self.len.get();
        self.show(next, now)
    }

    pub fn retreat(&mut self, now: Instant) -> Option<SlideshowEvent> {
        let n = self.len.get();
        self.show((self.index + n - 1) % n, now)
    }

    /// Manual navigation works the same whether or not the show is paused.
    pub fn on_key(&mut self, key: NavKey, now: Instant) -> Option<SlideshowEvent> {
        match key {
            NavKey::Next => self.advance(now),
            NavKey::Previous => self.retreat(now),
        }
    }

    /// Pause immediately and schedule a resume one idle window from `now`.
    pub fn on_pointer_activity(&mut self, now: Instant) -> Option<SlideshowEvent> {
        self.cancel_advance();
        if self.settings.idle_resume == IdleResume::Restart {
            self.timers.cancel_kind(Timer::Resume);
        }
        self.timers
            .schedule(Timer::Resume, now + self.settings.idle_window);
        self.set_paused(true, now)
    }

    /// Fire every timer due at `now`, oldest deadline first. Each firing is
    /// evaluated at its own deadline so a late tick yields the same timeline
    /// as a punctual one.
    pub fn on_tick(&mut self, now: Instant) -> Vec<SlideshowEvent> {
        let mut events = Vec::new();
        while let Some((_, timer, at)) = self.timers.pop_due(now) {
            match timer {
                Timer::Advance => {
                    self.advance_timer = None;
                    match self.advance(at) {
                        Some(event) => events.push(event),
                        // single entry: nothing to show, keep the cadence alive
                        None => self.rearm(at),
                    }
                }
                Timer::Resume => events.extend(self.set_paused(false, at)),
            }
        }
        events
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    /// Cancel every pending timer. Nothing fires after this.
    pub fn shutdown(&mut self) {
        self.timers.clear();
        self.advance_timer = None;
        debug!(index = self.index, "slideshow timers cancelled");
    }

    pub fn pending_advance_timers(&self) -> usize {
        self.timers.pending(Timer::Advance)
    }

    pub fn pending_resume_timers(&self) -> usize {
        self.timers.pending(Timer::Resume)
    }

    fn show(&mut self, index: usize, now: Instant) -> Option<SlideshowEvent> {
        if index == self.index {
            return None;
        }
        let previous = mem::replace(&mut self.index, index);
        debug!(index, previous, paused = self.paused, "showing artwork");
        self.rearm(now);
        Some(SlideshowEvent::Shown { index, previous })
    }

    fn set_paused(&mut self, paused: bool, now: Instant) -> Option<SlideshowEvent> {
        if self.paused == paused {
            return None;
        }
        self.paused = paused;
        self.rearm(now);
        if paused {
            debug!(index = self.index, "slideshow paused");
            Some(SlideshowEvent::Paused)
        } else {
            debug!(index = self.index, "slideshow resumed");
            Some(SlideshowEvent::Resumed)
        }
    }

    fn rearm(&mut self, now: Instant) {
        self.cancel_advance();
        if !self.paused {
            let deadline = now + self.settings.dwell;
            trace!(dwell_ms = self.settings.dwell.as_millis() as u64, "advance timer armed");
            self.advance_timer = Some(self.timers.schedule(Timer::Advance, deadline));
        }
    }

    fn cancel_advance(&mut self) {
        if let Some(handle) = self.advance_timer.take() {
            self.timers.cancel(handle);
        }
    }
}

/// One controller event on the simulated clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineEntry {
    /// Offset from the start of the simulation.
    pub at: Duration,
    pub event: SlideshowEvent,
}

/// Run a controller on a virtual clock for `horizon`, injecting pointer
/// activity at the given offsets, and collect everything it emits.
pub fn simulate(
    len: NonZeroUsize,
    settings: SlideshowSettings,
    horizon: Duration,
    activity: &[Duration],
) -> Result<Vec<TimelineEntry>, Error> {
    let start = Instant::now();
    let end = start
        .checked_add(horizon)
        .ok_or(Error::HorizonTooLong(horizon))?;
    let mut show = Slideshow::new(len, settings, start);
    let mut timeline = Vec::new();

    let mut activity: Vec<Duration> = activity
        .iter()
        .copied()
        .filter(|at| *at <= horizon)
        .collect();
    activity.sort();

    let run_until = |show: &mut Slideshow, timeline: &mut Vec<TimelineEntry>, until: Instant| {
        while let Some(deadline) = show.next_deadline().filter(|d| *d <= until) {
            for event in show.on_tick(deadline) {
                timeline.push(TimelineEntry {
                    at: deadline - start,
                    event,
                });
            }
        }
    };

    for offset in activity {
        run_until(&mut show, &mut timeline, start + offset);
        if let Some(event) = show.on_pointer_activity(start + offset) {
            timeline.push(TimelineEntry { at: offset, event });
        }
    }
    run_until(&mut show, &mut timeline, end);
    show.shutdown();
    Ok(timeline)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three() -> NonZeroUsize {
        NonZeroUsize::new(3).unwrap()
    }

    #[test]
    fn construction_arms_one_advance_timer() {
        let t0 = Instant::now();
        let show = Slideshow::new(three(), SlideshowSettings::default(), t0);
        assert_eq!(show.index(), 0);
        assert!(!show.is_paused());
        assert_eq!(show.pending_advance_timers(), 1);
        assert_eq!(show.next_deadline(), Some(t0 + DEFAULT_DWELL));
    }

    #[test]
    fn navigation_restarts_the_dwell() {
        let t0 = Instant::now();
        let mut show = Slideshow::new(three(), SlideshowSettings::default(), t0);
        let t1 = t0 + Duration::from_millis(2500);
        show.on_key(NavKey::Next, t1);
        assert_eq!(show.next_deadline(), Some(t1 + DEFAULT_DWELL));
        assert_eq!(show.pending_advance_timers(), 1);
    }

    #[test]
    fn repeated_activity_while_paused_emits_nothing() {
        let t0 = Instant::now();
        let mut show = Slideshow::new(three(), SlideshowSettings::default(), t0);
        assert_eq!(show.on_pointer_activity(t0), Some(SlideshowEvent::Paused));
        assert_eq!(show.on_pointer_activity(t0 + Duration::from_millis(10)), None);
        assert_eq!(show.pending_resume_timers(), 1);
        assert_eq!(show.pending_advance_timers(), 0);
    }

    #[test]
    fn shutdown_clears_everything() {
        let t0 = Instant::now();
        let mut show = Slideshow::new(three(), SlideshowSettings::default(), t0);
        show.on_pointer_activity(t0);
        show.shutdown();
        assert_eq!(show.next_deadline(), None);
        assert!(show.on_tick(t0 + Duration::from_secs(60)).is_empty());
        assert!(show.is_paused());
    }

    #[test]
    fn zero_dwell_is_clamped_and_ticks_terminate() {
        let t0 = Instant::now();
        let settings = SlideshowSettings {
            dwell: Duration::ZERO,
            idle_window: Duration::ZERO,
            ..SlideshowSettings::default()
        };
        let mut show = Slideshow::new(NonZeroUsize::new(2).unwrap(), settings, t0);
        assert_eq!(show.next_deadline(), Some(t0 + MIN_INTERVAL));

        let events = show.on_tick(t0 + Duration::from_millis(10));
        assert_eq!(events.len(), 10);
        assert_eq!(show.next_deadline(), Some(t0 + Duration::from_millis(11)));

        let t1 = t0 + Duration::from_millis(20);
        show.on_pointer_activity(t1);
        assert_eq!(show.on_tick(t1), vec![]);
        assert_eq!(show.on_tick(t1 + MIN_INTERVAL), vec![SlideshowEvent::Resumed]);
    }

    #[test]
    fn huge_intervals_are_clamped() {
        let settings = SlideshowSettings {
            dwell: Duration::MAX,
            ..SlideshowSettings::default()
        }
        .clamped();
        assert_eq!(settings.dwell, MAX_INTERVAL);
        assert_eq!(settings.idle_window, DEFAULT_IDLE_WINDOW);

        let t0 = Instant::now();
        let show = Slideshow::new(three(), settings, t0);
        assert_eq!(show.next_deadline(), Some(t0 + MAX_INTERVAL));
    }
}
