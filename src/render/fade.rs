//! Opacity curves for the transition between two artworks.

use std::time::{Duration, Instant};

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FadeMode {
    /// Outgoing fades out while incoming fades in.
    #[default]
    Cross,
    /// Outgoing fades out completely, then incoming fades in.
    Sequential,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FadeAlphas {
    pub outgoing: f32,
    pub incoming: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct Crossfade {
    started: Instant,
    duration: Duration,
    mode: FadeMode,
    outgoing_from: f32,
}

impl Crossfade {
    /// `outgoing_from` is the opacity the outgoing layer has right now; it is
    /// below 1.0 when a fade interrupts another one.
    pub fn start(now: Instant, duration: Duration, mode: FadeMode, outgoing_from: f32) -> Self {
        Self {
            started: now,
            duration,
            mode,
            outgoing_from: outgoing_from.clamp(0.0, 1.0),
        }
    }

    pub fn total(&self) -> Duration {
        match self.mode {
            FadeMode::Cross => self.duration,
            FadeMode::Sequential => self.duration * 2,
        }
    }

    pub fn is_finished(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.started) >= self.total()
    }

    pub fn alphas(&self, now: Instant) -> FadeAlphas {
        let elapsed = now.saturating_duration_since(self.started);
        let (fade_out, fade_in) = match self.mode {
            FadeMode::Cross => {
                let t = self.fraction(elapsed);
                (t, t)
            }
            FadeMode::Sequential => (
                self.fraction(elapsed),
                self.fraction(elapsed.saturating_sub(self.duration)),
            ),
        };
        FadeAlphas {
            outgoing: self.outgoing_from * (1.0 - fade_out),
            incoming: fade_in,
        }
    }

    fn fraction(&self, elapsed: Duration) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (elapsed.as_secs_f32() / self.duration.as_secs_f32()).clamp(0.0, 1.0)
    }
}
