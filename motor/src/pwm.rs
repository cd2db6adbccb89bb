use thiserror::Error;

/// A single failed pulse emission. Emissions are fire-and-forget: a failure
/// is reported once to the caller and never retried.
#[derive(Debug, Error)]
#[error("pwm write of {pulse} on channel {channel} failed: {reason}")]
pub struct PwmError {
    pub channel: u8,
    pub pulse: u16,
    pub reason: String,
}

/// One pulse-width output per channel. Channels are BCM pin numbers; the
/// pulse value is the driver-specific encoded "on" duration commanded to the
/// ESC, not a physical time.
pub trait PwmOutput {
    fn write(&mut self, channel: u8, pulse: u16) -> Result<(), PwmError>;
}
