//! Small DSP helpers shared by the built-in modules.
//!
//! - [`Smoothed`] ramps a control value toward its target one sample at a
//!   time so gain changes do not click.
//! - [`Phasor`] is a phase accumulator in `[0, 1)` used by the tone
//!   generator and the controller's sweep.
//! - [`db_to_linear`] / [`linear_to_db`] convert levels.

use core::f32::consts::{LN_10, TAU};

use libm::{expf, logf, sinf};

/// Lowest level any module reports, in dBFS.
pub const FLOOR_DB: f32 = -70.0;

/// Converts decibels to linear amplitude. Values at or below
/// [`FLOOR_DB`] are silence.
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    if db <= FLOOR_DB {
        return 0.0;
    }
    expf(db * LN_10 / 20.0)
}

/// Converts linear amplitude to decibels, floored at [`FLOOR_DB`].
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    let db = logf(linear.abs().max(1e-10)) * 20.0 / LN_10;
    db.max(FLOOR_DB)
}

/// One-pole smoothed value.
///
/// `y[n] = y[n-1] + coeff * (target - y[n-1])` with
/// `coeff = 1 - exp(-1 / (tau * sample_rate))`. A smoothing time of zero
/// gives `coeff = 1.0`, which jumps straight to the target.
#[derive(Debug, Clone, Copy)]
pub struct Smoothed {
    current: f32,
    target: f32,
    coeff: f32,
    sample_rate: f32,
    time_ms: f32,
}

impl Smoothed {
    /// Creates a settled value that jumps instantly until configured.
    pub fn new(initial: f32) -> Self {
        Self {
            current: initial,
            target: initial,
            coeff: 1.0,
            sample_rate: 48000.0,
            time_ms: 0.0,
        }
    }

    /// Creates a value with a smoothing time at `sample_rate`.
    pub fn with_time(initial: f32, sample_rate: f32, time_ms: f32) -> Self {
        let mut s = Self::new(initial);
        s.sample_rate = sample_rate;
        s.time_ms = time_ms;
        s.recalculate();
        s
    }

    /// Sets the value to ramp toward.
    #[inline]
    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    /// Jumps to `value` without ramping.
    pub fn set_immediate(&mut self, value: f32) {
        self.current = value;
        self.target = value;
    }

    /// Changes the sample rate, keeping the smoothing time.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.recalculate();
    }

    /// Advances one sample and returns the new value.
    #[inline]
    pub fn advance(&mut self) -> f32 {
        self.current += self.coeff * (self.target - self.current);
        self.current
    }

    /// Current value.
    #[inline]
    pub fn get(&self) -> f32 {
        self.current
    }

    /// Value being ramped toward.
    pub fn target(&self) -> f32 {
        self.target
    }

    /// Jumps to the target.
    pub fn snap_to_target(&mut self) {
        self.current = self.target;
    }

    fn recalculate(&mut self) {
        let samples = self.time_ms / 1000.0 * self.sample_rate;
        self.coeff = if samples <= 0.0 {
            1.0
        } else {
            1.0 - expf(-1.0 / samples)
        };
    }
}

/// Phase accumulator in `[0, 1)`.
#[derive(Debug, Clone, Copy)]
pub struct Phasor {
    phase: f32,
    increment: f32,
    sample_rate: f32,
}

impl Phasor {
    /// Creates a phasor running at `freq_hz`.
    pub fn new(sample_rate: f32, freq_hz: f32) -> Self {
        Self {
            phase: 0.0,
            increment: freq_hz / sample_rate,
            sample_rate,
        }
    }

    /// Changes the frequency, keeping the phase.
    pub fn set_frequency(&mut self, freq_hz: f32) {
        self.increment = freq_hz / self.sample_rate;
    }

    /// Current frequency in Hz.
    pub fn frequency(&self) -> f32 {
        self.increment * self.sample_rate
    }

    /// Changes the sample rate, keeping the frequency.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        let freq = self.frequency();
        self.sample_rate = sample_rate;
        self.set_frequency(freq);
    }

    /// Resets the phase to zero.
    pub fn reset(&mut self) {
        self.phase = 0.0;
    }

    /// Current phase.
    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// Returns the sine of the current phase, then advances.
    #[inline]
    pub fn next_sine(&mut self) -> f32 {
        let out = sinf(self.phase * TAU);
        self.advance(1);
        out
    }

    /// Advances by `samples` steps.
    #[inline]
    pub fn advance(&mut self, samples: usize) {
        self.phase += self.increment * samples as f32;
        self.phase -= libm::floorf(self.phase);
    }
}
