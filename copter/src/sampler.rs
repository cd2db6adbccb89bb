use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use attitude::Calibrator;
use log::warn;

use crate::hardware::OrientationSensor;

type Idle = (Box<dyn OrientationSensor>, Calibrator);

/// Background orientation sampling.
///
/// One thread owns the sensor and the calibrator for as long as it runs; the
/// foreground keeps only the stop flag and the join handle. Cancellation is
/// cooperative: the flag is checked at the top of every iteration, so
/// termination can lag by up to one sample interval. `stop` joins the thread
/// and hands sensor and calibrator back for the next run.
pub struct Sampler {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<Idle>,
}

impl Sampler {
    pub fn spawn(
        mut sensor: Box<dyn OrientationSensor>,
        mut calibrator: Calibrator,
        interval: Duration,
    ) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let handle = thread::spawn(move || {
            if let Err(e) = sensor.open() {
                warn!("could not open the orientation sensor: {}", e);
                return (sensor, calibrator);
            }
            calibrator.start();

            while !stop_flag.load(Ordering::Relaxed) {
                match sensor.update() {
                    Ok(()) => {
                        let (yaw, pitch, roll) = sensor.read_orientation();
                        calibrator.feed(yaw, pitch, roll);
                    }
                    Err(e) => warn!("orientation update failed: {}", e),
                }
                thread::sleep(interval);
            }

            calibrator.stop();
            if let Err(e) = sensor.close() {
                warn!("could not close the orientation sensor: {}", e);
            }
            (sensor, calibrator)
        });

        Sampler { stop, handle }
    }

    pub fn stop(self) -> Idle {
        self.stop.store(true, Ordering::Relaxed);
        self.handle.join().expect("sampler thread panicked")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::bench::LevelSensor;
    use attitude::State;
    use std::time::Instant;

    #[test]
    fn test_calibrates_against_still_sensor() {
        let calibrator = Calibrator::with_turns(10);
        let sensor = Box::new(LevelSensor::new(4.0, 0.0, 0.0));

        let sampler = Sampler::spawn(sensor, calibrator, Duration::from_millis(1));
        // 10 settle samples at 1ms each, with plenty of slack
        thread::sleep(Duration::from_millis(500));

        let (_sensor, calibrator) = sampler.stop();
        // stop halts sampling; the captured bias survives until the next start
        assert_eq!(calibrator.state(), State::Stopped);
        assert_eq!(calibrator.yaw_offset(), 4.0);
    }

    #[test]
    fn test_stop_joins_quickly() {
        let calibrator = Calibrator::new();
        let sensor = Box::new(LevelSensor::new(0.0, 0.0, 0.0));
        let sampler = Sampler::spawn(sensor, calibrator, Duration::from_millis(1));

        let before = Instant::now();
        let _ = sampler.stop();
        // cooperative stop may lag one interval, not more
        assert!(before.elapsed() < Duration::from_secs(1));
    }
}
