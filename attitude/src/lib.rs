use log::{info, warn};

/// Samples per settle window.
pub const CALIBRATION_TURNS: usize = 100;

/// One orientation reading, in degrees. After calibration the yaw is
/// bias-corrected so that "straight ahead at startup" reads as zero; pitch
/// and roll pass through unmodified.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Orientation {
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
}

pub type ObserverError = Box<dyn std::error::Error + Send + Sync>;

/// Consumer of bias-corrected orientation updates. Observers are registered
/// before sampling starts and invoked synchronously, in registration order,
/// on every forwarded sample. A failing observer is logged and does not block
/// delivery to the observers after it.
pub trait OrientationObserver: Send {
    fn on_orientation(&mut self, orientation: Orientation) -> Result<(), ObserverError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Stopped,
    Calibrating,
    Calibrated,
}

/// Fixed-size record of recent rounded absolute readings for one axis.
struct SettleWindow {
    samples: Vec<i32>,
}

impl SettleWindow {
    fn new(turns: usize) -> Self {
        SettleWindow {
            samples: vec![0; turns],
        }
    }

    fn record(&mut self, pos: usize, value: f32) {
        self.samples[pos] = value.abs().round() as i32;
    }

    /// The window is calm when it holds a single constant value. The craft
    /// has to hold a steady attitude, not necessarily a level one; an
    /// all-zero window is the constant-zero case of the same check.
    fn calmed(&self) -> bool {
        let first = self.samples[0];
        self.samples.iter().all(|&sample| sample == first)
    }

    fn clear(&mut self) {
        self.samples.fill(0);
    }
}

/// Online yaw-bias calibration over a streaming orientation source.
///
/// Lifecycle: `start` resets everything and enters `Calibrating`; once both
/// the pitch and the roll window have calmed down at the same window
/// boundary, the current yaw is fixed as the bias and the state becomes
/// `Calibrated` (terminal until the next `start`). While calibrating no
/// samples reach the observers; afterwards every sample is forwarded with
/// the yaw bias subtracted.
pub struct Calibrator {
    state: State,
    turns: usize,
    pos: usize,
    yaw_offset: f32,
    pitch_window: SettleWindow,
    roll_window: SettleWindow,
    observers: Vec<Box<dyn OrientationObserver>>,
}

impl Calibrator {
    pub fn new() -> Self {
        Self::with_turns(CALIBRATION_TURNS)
    }

    pub fn with_turns(turns: usize) -> Self {
        assert!(turns > 0, "settle window needs at least one sample");
        Calibrator {
            state: State::Stopped,
            turns,
            pos: 0,
            yaw_offset: 0.0,
            pitch_window: SettleWindow::new(turns),
            roll_window: SettleWindow::new(turns),
            observers: Vec::new(),
        }
    }

    /// Registers an observer. Registration is only possible while the
    /// calibrator is still owned by the foreground; once it moves into the
    /// sampling thread the list is fixed.
    pub fn subscribe(&mut self, observer: Box<dyn OrientationObserver>) {
        self.observers.push(observer);
    }

    /// (Re)starts calibration from a clean slate.
    pub fn start(&mut self) {
        self.state = State::Calibrating;
        self.pos = 0;
        self.yaw_offset = 0.0;
        self.pitch_window.clear();
        self.roll_window.clear();
    }

    pub fn stop(&mut self) {
        self.state = State::Stopped;
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn is_calibrated(&self) -> bool {
        self.state == State::Calibrated
    }

    pub fn yaw_offset(&self) -> f32 {
        self.yaw_offset
    }

    /// Feeds one raw sample through the state machine.
    pub fn feed(&mut self, yaw: f32, pitch: f32, roll: f32) {
        match self.state {
            State::Stopped => {}
            State::Calibrating => {
                self.pitch_window.record(self.pos, pitch);
                self.roll_window.record(self.pos, roll);
                self.pos += 1;
                if self.pos == self.turns {
                    if self.pitch_window.calmed() && self.roll_window.calmed() {
                        self.yaw_offset = yaw;
                        self.state = State::Calibrated;
                        info!("attitude settled, yaw offset fixed at {}", yaw);
                    }
                    self.pos = 0;
                }
            }
            State::Calibrated => {
                let orientation = Orientation {
                    yaw: yaw - self.yaw_offset,
                    pitch,
                    roll,
                };
                for observer in &mut self.observers {
                    if let Err(e) = observer.on_orientation(orientation) {
                        warn!("orientation observer failed: {}", e);
                    }
                }
            }
        }
    }
}

impl Default for Calibrator {
    fn default() -> Self {
        Self::new()
    }
}
