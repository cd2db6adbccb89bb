use thiserror::Error;

#[derive(Debug, Error)]
pub enum HardwareError {
    #[error("pwm setup failed: {0}")]
    PwmSetup(String),
    #[error("orientation sensor failed: {0}")]
    Sensor(String),
}

/// Yaw/pitch/roll readout in degrees, refreshed by `update`. The core never
/// talks to sensor hardware directly; this is the whole surface it consumes.
pub trait OrientationSensor: Send {
    fn open(&mut self) -> Result<(), HardwareError>;
    fn update(&mut self) -> Result<(), HardwareError>;
    fn read_orientation(&self) -> (f32, f32, f32);
    fn close(&mut self) -> Result<(), HardwareError>;
}

/// Test and off-target doubles. The binary falls back to these when built
/// without the `raspberrypi` feature so the control loop can be exercised on
/// a bench machine.
pub mod bench {
    use motor::{PwmError, PwmOutput};

    use super::{HardwareError, OrientationSensor};

    /// Records every emitted pulse instead of driving a pin.
    pub struct BenchPwm {
        pub writes: Vec<(u8, u16)>,
    }

    impl BenchPwm {
        pub fn new() -> Self {
            BenchPwm { writes: Vec::new() }
        }

        /// Last pulse emitted on a channel, if any.
        pub fn last_pulse(&self, channel: u8) -> Option<u16> {
            self.writes
                .iter()
                .rev()
                .find(|(c, _)| *c == channel)
                .map(|&(_, pulse)| pulse)
        }
    }

    impl Default for BenchPwm {
        fn default() -> Self {
            Self::new()
        }
    }

    impl PwmOutput for BenchPwm {
        fn write(&mut self, channel: u8, pulse: u16) -> Result<(), PwmError> {
            self.writes.push((channel, pulse));
            Ok(())
        }
    }

    /// A craft resting perfectly still at a fixed attitude.
    pub struct LevelSensor {
        yaw: f32,
        pitch: f32,
        roll: f32,
    }

    impl LevelSensor {
        pub fn new(yaw: f32, pitch: f32, roll: f32) -> Self {
            LevelSensor { yaw, pitch, roll }
        }
    }

    impl OrientationSensor for LevelSensor {
        fn open(&mut self) -> Result<(), HardwareError> {
            Ok(())
        }

        fn update(&mut self) -> Result<(), HardwareError> {
            Ok(())
        }

        fn read_orientation(&self) -> (f32, f32, f32) {
            (self.yaw, self.pitch, self.roll)
        }

        fn close(&mut self) -> Result<(), HardwareError> {
            Ok(())
        }
    }
}

/// Raspberry Pi adapters: software PWM on GPIO output pins and a
/// register-level MPU-6050 readout over I²C.
#[cfg(feature = "raspberrypi")]
pub mod pi {
    use std::collections::HashMap;
    use std::time::{Duration, Instant};

    use log::info;
    use motor::{PwmError, PwmOutput};
    use rppal::gpio::{Gpio, OutputPin};
    use rppal::i2c::I2c;

    use super::{HardwareError, OrientationSensor};

    /// Standard 50 Hz servo frame.
    const PULSE_PERIOD: Duration = Duration::from_millis(20);

    /// Software-generated servo PWM, one output pin per channel.
    pub struct SoftPwm {
        pins: HashMap<u8, OutputPin>,
    }

    impl SoftPwm {
        pub fn new(channels: &[u8]) -> Result<Self, HardwareError> {
            let gpio = Gpio::new().map_err(|e| HardwareError::PwmSetup(e.to_string()))?;
            let mut pins = HashMap::new();
            for &channel in channels {
                let pin = gpio
                    .get(channel)
                    .map_err(|e| {
                        HardwareError::PwmSetup(format!("channel {}: {}", channel, e))
                    })?
                    .into_output();
                pins.insert(channel, pin);
            }
            info!("software pwm ready on channels {:?}", channels);
            Ok(SoftPwm { pins })
        }
    }

    impl PwmOutput for SoftPwm {
        fn write(&mut self, channel: u8, pulse: u16) -> Result<(), PwmError> {
            let pin = self.pins.get_mut(&channel).ok_or_else(|| PwmError {
                channel,
                pulse,
                reason: "channel not set up".to_string(),
            })?;
            pin.set_pwm(PULSE_PERIOD, Duration::from_micros(u64::from(pulse)))
                .map_err(|e| PwmError {
                    channel,
                    pulse,
                    reason: e.to_string(),
                })
        }
    }

    const MPU6050_ADDR: u16 = 0x68;
    const REG_PWR_MGMT_1: u8 = 0x6b;
    const REG_ACCEL_XOUT_H: u8 = 0x3b;
    const PWR_SLEEP: u8 = 0x40;
    /// LSB per g at the +-2g default range.
    const ACCEL_SCALE: f32 = 16384.0;
    /// LSB per deg/s at the +-250 deg/s default range.
    const GYRO_SCALE: f32 = 131.0;

    /// MPU-6050 over the Pi's I²C bus. Pitch and roll come from the
    /// accelerometer; yaw is integrated from the Z gyro between updates and
    /// therefore drifts, which is exactly what the calibrator's bias capture
    /// compensates at startup.
    pub struct Mpu6050 {
        i2c: I2c,
        yaw: f32,
        pitch: f32,
        roll: f32,
        last_update: Option<Instant>,
    }

    impl Mpu6050 {
        pub fn new() -> Result<Self, HardwareError> {
            let mut i2c = I2c::new().map_err(sensor_err)?;
            i2c.set_slave_address(MPU6050_ADDR).map_err(sensor_err)?;
            Ok(Mpu6050 {
                i2c,
                yaw: 0.0,
                pitch: 0.0,
                roll: 0.0,
                last_update: None,
            })
        }
    }

    fn sensor_err(e: rppal::i2c::Error) -> HardwareError {
        HardwareError::Sensor(e.to_string())
    }

    impl OrientationSensor for Mpu6050 {
        fn open(&mut self) -> Result<(), HardwareError> {
            // wake from sleep, internal oscillator
            self.i2c
                .smbus_write_byte(REG_PWR_MGMT_1, 0)
                .map_err(sensor_err)?;
            self.yaw = 0.0;
            self.last_update = None;
            Ok(())
        }

        fn update(&mut self) -> Result<(), HardwareError> {
            // accel x/y/z, temperature, gyro x/y/z as big-endian words
            let mut buf = [0u8; 14];
            self.i2c
                .block_read(REG_ACCEL_XOUT_H, &mut buf)
                .map_err(sensor_err)?;
            let word = |i: usize| i16::from_be_bytes([buf[i], buf[i + 1]]);

            let ax = f32::from(word(0)) / ACCEL_SCALE;
            let ay = f32::from(word(2)) / ACCEL_SCALE;
            let az = f32::from(word(4)) / ACCEL_SCALE;
            let gz = f32::from(word(12)) / GYRO_SCALE;

            let now = Instant::now();
            if let Some(last) = self.last_update {
                self.yaw += gz * now.duration_since(last).as_secs_f32();
            }
            self.last_update = Some(now);

            self.pitch = -ay.atan2((ax * ax + az * az).sqrt()).to_degrees();
            self.roll = (-ax).atan2((ay * ay + az * az).sqrt()).to_degrees();
            Ok(())
        }

        fn read_orientation(&self) -> (f32, f32, f32) {
            (self.yaw, self.pitch, self.roll)
        }

        fn close(&mut self) -> Result<(), HardwareError> {
            self.i2c
                .smbus_write_byte(REG_PWR_MGMT_1, PWR_SLEEP)
                .map_err(sensor_err)
        }
    }
}
