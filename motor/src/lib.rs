mod pwm;
mod table;

pub use pwm::{PwmError, PwmOutput};
pub use table::{ThrottleTable, TABLE_LEN};

use log::info;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid throttle bounds: min {min} must be below max {max}")]
    InvalidBounds { min: u16, max: u16 },
    #[error("throttle percent {0} is out of range (0-100)")]
    OutOfRange(u8),
    #[error("motor on channel {0} is already started")]
    AlreadyStarted(u8),
    #[error("motor on channel {0} is not started")]
    NotStarted(u8),
    #[error(transparent)]
    Pwm(#[from] PwmError),
}

/// Propeller rotation direction, as wired and mounted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Rotation {
    #[serde(rename = "cw")]
    Clockwise,
    #[serde(rename = "ccw")]
    CounterClockwise,
}

/// One ESC-driven motor on one PWM channel.
///
/// The channel and rotation direction are fixed at construction; everything
/// else only changes through `start`, `stop` and `set_throttle`. All signal
/// emissions go through the caller-supplied [`PwmOutput`].
pub struct Motor {
    channel: u8,
    rotation: Rotation,
    start_signal: u16,
    stop_signal: u16,
    throttle: u8,
    started: bool,
    table: ThrottleTable,
}

impl Motor {
    pub fn new(
        channel: u8,
        rotation: Rotation,
        start_signal: u16,
        stop_signal: u16,
        min_throttle: u16,
        max_throttle: u16,
    ) -> Result<Self, Error> {
        let table = ThrottleTable::build(min_throttle, max_throttle)?;
        Ok(Motor {
            channel,
            rotation,
            start_signal,
            stop_signal,
            throttle: 0,
            started: false,
            table,
        })
    }

    /// Arms the ESC. The start signal is emitted exactly once per
    /// stopped-to-started transition.
    pub fn start(&mut self, pwm: &mut dyn PwmOutput) -> Result<(), Error> {
        if self.started {
            return Err(Error::AlreadyStarted(self.channel));
        }

        pwm.write(self.channel, self.start_signal)?;
        self.throttle = 0;
        self.started = true;
        info!(
            "sent start signal {} on channel {}",
            self.start_signal, self.channel
        );
        Ok(())
    }

    /// Disarms the ESC so that start/stop form a toggle.
    pub fn stop(&mut self, pwm: &mut dyn PwmOutput) -> Result<(), Error> {
        if !self.started {
            return Err(Error::NotStarted(self.channel));
        }

        pwm.write(self.channel, self.stop_signal)?;
        self.throttle = 0;
        self.started = false;
        info!(
            "sent stop signal {} on channel {}",
            self.stop_signal, self.channel
        );
        Ok(())
    }

    /// Resolves the percent through the throttle table and emits the pulse.
    /// The percent is recorded only after a successful emission.
    pub fn set_throttle(&mut self, pwm: &mut dyn PwmOutput, percent: u8) -> Result<(), Error> {
        let pulse = self.table.translate(percent)?;
        pwm.write(self.channel, pulse)?;
        self.throttle = percent;
        Ok(())
    }

    pub fn throttle(&self) -> u8 {
        self.throttle
    }

    /// The pulse width currently commanded for the held throttle percent.
    pub fn throttle_pulse(&self) -> u16 {
        // the table covers every percent this motor can hold
        self.table
            .translate(self.throttle)
            .expect("throttle table covers 0-100")
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    pub fn is_started(&self) -> bool {
        self.started
    }
}
