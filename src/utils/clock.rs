use chrono::{DateTime, Local};

/// Source of "now" for the session tracker, so tests can pin timestamps.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> DateTime<Local>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Clock whose reading is set by hand.
#[cfg(test)]
pub struct ManualClock(std::sync::Mutex<f64>);

#[cfg(test)]
impl ManualClock {
    pub fn at(secs: f64) -> Self {
        Self(std::sync::Mutex::new(secs))
    }

    pub fn set(&self, secs: f64) {
        *self.0.lock().unwrap() = secs;
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Local> {
        let secs = *self.0.lock().unwrap();
        crate::utils::time::from_epoch_seconds(secs).unwrap()
    }
}
