use std::path::PathBuf;

use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use log::info;
use structopt::StructOpt;

mod config;
mod hardware;
mod keyboard;
mod quad;
mod sampler;

use config::Config;
use quad::Quadcopter;

#[derive(Debug, StructOpt)]
#[structopt(name = "copter", about = "Quadcopter flight-control loop.")]
struct Opt {
    /// Path to the configuration file.
    #[structopt(short, long, default_value = "copter.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let opt = Opt::from_args();

    info!("Powering up ...");
    let config = Config::load(&opt.config)?;
    let (pwm, sensor) = setup_hardware(&config)?;
    let mut quad = Quadcopter::new(&config, pwm, sensor)?;

    enable_raw_mode()?;
    keyboard::run(&mut quad).await;
    disable_raw_mode()?;

    info!("Shut down");
    Ok(())
}

#[cfg(feature = "raspberrypi")]
fn setup_hardware(
    config: &Config,
) -> Result<(hardware::pi::SoftPwm, Box<dyn hardware::OrientationSensor>), hardware::HardwareError>
{
    let channels = [
        config.motors.front_left.pin,
        config.motors.front_right.pin,
        config.motors.rear_left.pin,
        config.motors.rear_right.pin,
    ];
    let pwm = hardware::pi::SoftPwm::new(&channels)?;
    let sensor = hardware::pi::Mpu6050::new()?;
    Ok((pwm, Box::new(sensor)))
}

#[cfg(not(feature = "raspberrypi"))]
fn setup_hardware(
    _config: &Config,
) -> Result<(hardware::bench::BenchPwm, Box<dyn hardware::OrientationSensor>), hardware::HardwareError>
{
    log::warn!("built without the raspberrypi feature, driving bench doubles");
    let sensor = hardware::bench::LevelSensor::new(0.0, 0.0, 0.0);
    Ok((hardware::bench::BenchPwm::new(), Box::new(sensor)))
}
