use std::time::Duration;

use attitude::{Calibrator, ObserverError, Orientation, OrientationObserver};
use log::{error, info};
use motor::{Motor, PwmOutput};
use thiserror::Error;

use crate::config::{Config, MotorConfig};
use crate::hardware::OrientationSensor;
use crate::sampler::Sampler;

#[derive(Debug, Error)]
pub enum Error {
    #[error("the {0} motors must not rotate in the same direction")]
    RotationPattern(&'static str),
    #[error(transparent)]
    Motor(#[from] motor::Error),
}

const MOTOR_COUNT: usize = 4;

/// Logs every forwarded bias-corrected orientation update.
struct AttitudeDisplay;

impl OrientationObserver for AttitudeDisplay {
    fn on_orientation(&mut self, o: Orientation) -> Result<(), ObserverError> {
        info!("yaw: {:.2} pitch: {:.2} roll: {:.2}", o.yaw, o.pitch, o.roll);
        Ok(())
    }
}

/// The unit of control presented to the operator: four motors, their balance
/// offsets and the attitude calibrator behind one on/off/throttle surface.
///
/// Motor order is fixed everywhere: front left, front right, rear left,
/// rear right.
pub struct Quadcopter<P: PwmOutput> {
    pwm: P,
    powered: bool,
    motors: [Motor; MOTOR_COUNT],
    /// Balance offsets in signed percent, one per motor. Nothing computes
    /// them yet; they stay at 0 until offset estimation from attitude data
    /// exists.
    offsets: [i8; MOTOR_COUNT],
    sample_interval: Duration,
    idle: Option<(Box<dyn OrientationSensor>, Calibrator)>,
    sampler: Option<Sampler>,
}

impl<P: PwmOutput> Quadcopter<P> {
    pub fn new(
        config: &Config,
        pwm: P,
        sensor: Box<dyn OrientationSensor>,
    ) -> Result<Self, Error> {
        let build = |m: &MotorConfig| {
            Motor::new(
                m.pin,
                m.rotation,
                config.signals.start,
                config.signals.stop,
                config.throttle.min,
                config.throttle.max,
            )
        };
        let motors = [
            build(&config.motors.front_left)?,
            build(&config.motors.front_right)?,
            build(&config.motors.rear_left)?,
            build(&config.motors.rear_right)?,
        ];
        check_rotation_pattern(&motors)?;

        let mut calibrator = Calibrator::new();
        calibrator.subscribe(Box::new(AttitudeDisplay));

        Ok(Quadcopter {
            pwm,
            powered: false,
            motors,
            offsets: [0; MOTOR_COUNT],
            sample_interval: Duration::from_millis(config.sampling.interval_ms),
            idle: Some((sensor, calibrator)),
            sampler: None,
        })
    }

    /// Starts orientation sampling, then arms all four motors. A single
    /// motor's failure is logged and does not abort the others.
    pub fn turn_on(&mut self) -> bool {
        if let Some((sensor, calibrator)) = self.idle.take() {
            self.sampler = Some(Sampler::spawn(sensor, calibrator, self.sample_interval));
        }

        let mut success = true;
        for motor in &mut self.motors {
            if let Err(e) = motor.start(&mut self.pwm) {
                error!("unable to start motor on channel {}: {}", motor.channel(), e);
                success = false;
            }
        }
        self.powered = true;
        success
    }

    /// Stops orientation sampling, then disarms all four motors.
    pub fn turn_off(&mut self) -> bool {
        if let Some(sampler) = self.sampler.take() {
            self.idle = Some(sampler.stop());
        }

        let mut success = true;
        for motor in &mut self.motors {
            if let Err(e) = motor.stop(&mut self.pwm) {
                error!("unable to stop motor on channel {}: {}", motor.channel(), e);
                success = false;
            }
        }
        self.powered = false;
        success
    }

    /// Fans one throttle percent out to all four motors, adjusted per motor
    /// by its balance offset.
    pub fn set_overall_throttle(&mut self, percent: u8) -> bool {
        let mut success = true;
        for (motor, offset) in self.motors.iter_mut().zip(self.offsets) {
            // offsets balance unequally strong motors; the division truncates,
            // so below 100% the adjustment is a no-op today
            // TODO: compute the offsets from the forwarded attitude updates
            let adjusted =
                i16::from(percent) + i16::from(percent) / 100 * i16::from(offset);
            match u8::try_from(adjusted) {
                Ok(value) => {
                    if let Err(e) = motor.set_throttle(&mut self.pwm, value) {
                        error!(
                            "unable to set throttle {}% on channel {}: {}",
                            value,
                            motor.channel(),
                            e
                        );
                        success = false;
                    }
                }
                Err(_) => {
                    error!(
                        "adjusted throttle {}% on channel {} is out of range",
                        adjusted,
                        motor.channel()
                    );
                    success = false;
                }
            }
        }
        success
    }

    pub fn is_powered(&self) -> bool {
        self.powered
    }

    /// Per-motor throttle percents in front left, front right, rear left,
    /// rear right order.
    pub fn throttles(&self) -> [u8; MOTOR_COUNT] {
        [
            self.motors[0].throttle(),
            self.motors[1].throttle(),
            self.motors[2].throttle(),
            self.motors[3].throttle(),
        ]
    }

    pub fn total_throttle(&self) -> u16 {
        self.motors.iter().map(|m| u16::from(m.throttle())).sum()
    }
}

/// The X-configuration pattern: diagonal motors share a direction, adjacent
/// motors oppose. Anything else yaws on its own the moment it lifts.
fn check_rotation_pattern(motors: &[Motor; MOTOR_COUNT]) -> Result<(), Error> {
    let [fl, fr, rl, rr] = motors;
    if fl.rotation() == fr.rotation() {
        return Err(Error::RotationPattern("two front"));
    }
    if rl.rotation() == rr.rotation() {
        return Err(Error::RotationPattern("two rear"));
    }
    if fl.rotation() == rl.rotation() {
        return Err(Error::RotationPattern("two left"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MotorsConfig, SamplingConfig, SignalsConfig, ThrottleConfig};
    use crate::hardware::bench::{BenchPwm, LevelSensor};
    use motor::Rotation;

    fn test_config(rotations: [Rotation; 4]) -> Config {
        Config {
            motors: MotorsConfig {
                front_left: MotorConfig {
                    pin: 17,
                    rotation: rotations[0],
                },
                front_right: MotorConfig {
                    pin: 18,
                    rotation: rotations[1],
                },
                rear_left: MotorConfig {
                    pin: 22,
                    rotation: rotations[2],
                },
                rear_right: MotorConfig {
                    pin: 23,
                    rotation: rotations[3],
                },
            },
            signals: SignalsConfig {
                start: 1000,
                stop: 0,
            },
            throttle: ThrottleConfig {
                min: 1100,
                max: 1900,
            },
            sampling: SamplingConfig { interval_ms: 1 },
        }
    }

    fn x_pattern() -> [Rotation; 4] {
        [
            Rotation::Clockwise,
            Rotation::CounterClockwise,
            Rotation::CounterClockwise,
            Rotation::Clockwise,
        ]
    }

    fn level_sensor() -> Box<LevelSensor> {
        Box::new(LevelSensor::new(0.0, 0.0, 0.0))
    }

    #[test]
    fn test_rejects_uniform_rotation() {
        let config = test_config([Rotation::Clockwise; 4]);
        let result = Quadcopter::new(&config, BenchPwm::new(), level_sensor());
        assert!(matches!(result, Err(Error::RotationPattern(_))));
    }

    #[test]
    fn test_rejects_same_side_rotation() {
        // fronts differ, but both left motors turn clockwise
        let config = test_config([
            Rotation::Clockwise,
            Rotation::CounterClockwise,
            Rotation::Clockwise,
            Rotation::CounterClockwise,
        ]);
        let result = Quadcopter::new(&config, BenchPwm::new(), level_sensor());
        assert!(matches!(result, Err(Error::RotationPattern(_))));
    }

    #[test]
    fn test_accepts_x_pattern() {
        let config = test_config(x_pattern());
        assert!(Quadcopter::new(&config, BenchPwm::new(), level_sensor()).is_ok());
    }

    #[test]
    fn test_turn_on_off_cycle() {
        let config = test_config(x_pattern());
        let mut quad = Quadcopter::new(&config, BenchPwm::new(), level_sensor()).unwrap();

        assert!(quad.turn_on());
        assert!(quad.is_powered());
        // starting twice fails per motor but leaves everything armed
        assert!(!quad.turn_on());
        assert!(quad.is_powered());

        assert!(quad.turn_off());
        assert!(!quad.is_powered());
        assert!(quad.turn_on());
        assert!(quad.turn_off());
    }

    #[test]
    fn test_overall_throttle_fans_out() {
        let config = test_config(x_pattern());
        let mut quad = Quadcopter::new(&config, BenchPwm::new(), level_sensor()).unwrap();

        quad.turn_on();
        assert!(quad.set_overall_throttle(50));
        assert_eq!(quad.throttles(), [50; 4]);
        assert_eq!(quad.total_throttle(), 200);

        // round(1100 + (800 / 99) * 49) = 1496 on every channel
        for channel in [17, 18, 22, 23] {
            assert_eq!(quad.pwm.last_pulse(channel), Some(1496));
        }
        quad.turn_off();
    }

    #[test]
    fn test_overall_throttle_rejects_out_of_range() {
        let config = test_config(x_pattern());
        let mut quad = Quadcopter::new(&config, BenchPwm::new(), level_sensor()).unwrap();

        quad.turn_on();
        quad.set_overall_throttle(30);
        assert!(!quad.set_overall_throttle(150));
        assert_eq!(quad.throttles(), [30; 4]);
        quad.turn_off();
    }

    #[test]
    fn test_offset_adjustment_truncates() {
        let config = test_config(x_pattern());
        let mut quad = Quadcopter::new(&config, BenchPwm::new(), level_sensor()).unwrap();
        quad.offsets = [5, -5, 0, 0];

        quad.turn_on();
        // below 100% the integer division truncates the adjustment away
        assert!(quad.set_overall_throttle(99));
        assert_eq!(quad.throttles(), [99; 4]);

        // at 100% the offsets finally bite; +5 overshoots and is rejected
        assert!(!quad.set_overall_throttle(100));
        assert_eq!(quad.throttles(), [99, 95, 100, 100]);
        quad.turn_off();
    }
}
