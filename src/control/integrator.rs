use nalgebra::Vector3;

use crate::config::constants::{DEFAULT_AUTO_RESET_INTERVAL_US, US_IN_SECOND};

/// Outcome of one ingestion step. `integral` and `integral_dt` carry zeros
/// and must not be read unless `reset_triggered` is true.
#[derive(Debug, Clone, Copy)]
pub struct IntegrationUpdate {
    pub reset_triggered: bool,
    pub integral: Vector3<f32>,
    pub integral_dt: u64,
}

impl Default for IntegrationUpdate {
    fn default() -> Self {
        IntegrationUpdate {
            reset_triggered: false,
            integral: Vector3::zeros(),
            integral_dt: 0,
        }
    }
}

/// Integral accumulated since the last reset and the microseconds it spans.
#[derive(Debug, Clone, Copy)]
pub struct IntegralReading {
    pub integral: Vector3<f32>,
    pub integral_dt: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct MeanFilteredReading {
    pub integral: Vector3<f32>,
    pub integral_dt: u64,
    /// The integral divided by the time it spans, a mean rate per second.
    pub filtered_val: Vector3<f32>,
}

/// A resettable trapezoidal integrator for 3-axis inertial samples, with
/// optional coning compensation for rotating inputs.
///
/// One instance accumulates exactly one logical signal and is neither `Clone`
/// nor `Copy`, so integration state cannot be duplicated by accident. All
/// operations are O(1), never block and never allocate.
pub struct Integrator {
    auto_reset_interval: u64,
    last_integration_time: Option<u64>,
    last_reset_time: u64,
    alpha: Vector3<f32>,
    last_alpha: Vector3<f32>,
    beta: Vector3<f32>,
    last_val: Vector3<f32>,
    last_delta_alpha: Vector3<f32>,
    coning_comp_on: bool,
}

impl Integrator {
    /// `auto_reset_interval_us` of 0 disables the auto-reset signal. The
    /// coning compensation mode is fixed for the lifetime of the instance.
    pub fn new(auto_reset_interval_us: u64, coning_compensation: bool) -> Self {
        Integrator {
            auto_reset_interval: auto_reset_interval_us,
            last_integration_time: None,
            last_reset_time: 0,
            alpha: Vector3::zeros(),
            last_alpha: Vector3::zeros(),
            beta: Vector3::zeros(),
            last_val: Vector3::zeros(),
            last_delta_alpha: Vector3::zeros(),
            coning_comp_on: coning_compensation,
        }
    }

    /// Put one sample into the integral.
    ///
    /// Timestamps must be monotonically non-decreasing across calls. A
    /// backwards timestamp is dropped without touching the accumulator, a
    /// repeated timestamp contributes nothing.
    pub fn put(&mut self, timestamp: u64, val: Vector3<f32>) -> IntegrationUpdate {
        let last_integration_time = match self.last_integration_time {
            Some(time) => time,
            None => {
                // First sample since construction, seed the timing state.
                self.last_integration_time = Some(timestamp);
                self.last_reset_time = timestamp;
                self.last_val = val;
                return IntegrationUpdate::default();
            }
        };

        if timestamp < last_integration_time {
            log::warn!(
                "Dropping sample at {}us, older than last integration step at {}us",
                timestamp,
                last_integration_time
            );
            return IntegrationUpdate::default();
        }

        let dt = (timestamp - last_integration_time) as f32 / US_IN_SECOND;

        // Trapezoidal integral of the sub-interval.
        let delta_alpha = (self.last_val + val) * 0.5_f32 * dt;
        self.alpha += delta_alpha;

        if self.coning_comp_on {
            // Two-sample coning correction accumulated across sub-intervals:
            // the accumulated integral and the previous sub-interval both
            // rotate into the current one.
            self.beta += (self.last_alpha + self.last_delta_alpha * (1.0_f32 / 6.0_f32))
                .cross(&delta_alpha)
                * 0.5_f32;
            self.last_delta_alpha = delta_alpha;
            self.last_alpha = self.alpha;
        }

        self.last_val = val;
        self.last_integration_time = Some(timestamp);

        if self.auto_reset_interval != 0
            && timestamp - self.last_reset_time >= self.auto_reset_interval
        {
            let integral = self.corrected_integral();
            let integral_dt = self.reset();

            return IntegrationUpdate {
                reset_triggered: true,
                integral,
                integral_dt,
            };
        }

        IntegrationUpdate::default()
    }

    /// Put one sample using the elapsed microseconds since the previous
    /// sample instead of an absolute timestamp. The internal clock becomes
    /// the sum of the supplied intervals and may drift from the source clock.
    pub fn put_with_interval(&mut self, interval_us: u64, val: Vector3<f32>) -> IntegrationUpdate {
        let timestamp = self.last_integration_time.unwrap_or(0) + interval_us;
        self.put(timestamp, val)
    }

    /// Get the integral accumulated since the last reset, clearing it when
    /// `reset` is true. The returned reading always snapshots the pre-reset
    /// state. A never-sampled integrator reads as zeros.
    pub fn get(&mut self, reset: bool) -> IntegralReading {
        let integral = self.corrected_integral();
        let integral_dt = if reset { self.reset() } else { self.elapsed_us() };

        IntegralReading {
            integral,
            integral_dt,
        }
    }

    /// Same as `get`, additionally dividing the integral by the time it
    /// spans. Reads with zero elapsed time yield a zero rate.
    pub fn get_and_filtered(&mut self, reset: bool) -> MeanFilteredReading {
        let reading = self.get(reset);

        let filtered_val = if reading.integral_dt == 0 {
            Vector3::zeros()
        } else {
            reading.integral * (US_IN_SECOND / reading.integral_dt as f32)
        };

        MeanFilteredReading {
            integral: reading.integral,
            integral_dt: reading.integral_dt,
            filtered_val,
        }
    }

    /// Change the auto-reset interval, 0 disables it. Takes effect on the
    /// next ingestion call and never resets accumulated state by itself.
    pub fn set_autoreset_interval(&mut self, auto_reset_interval_us: u64) {
        self.auto_reset_interval = auto_reset_interval_us;
    }

    fn corrected_integral(&self) -> Vector3<f32> {
        if self.coning_comp_on {
            self.alpha + self.beta
        } else {
            self.alpha
        }
    }

    fn elapsed_us(&self) -> u64 {
        match self.last_integration_time {
            Some(time) => time - self.last_reset_time,
            None => 0,
        }
    }

    // Restart the accumulator. The sample stream stays continuous across the
    // reset, only the accumulated values clear.
    fn reset(&mut self) -> u64 {
        let integral_dt = self.elapsed_us();

        self.alpha = Vector3::zeros();
        self.last_alpha = Vector3::zeros();
        self.beta = Vector3::zeros();
        self.last_val = Vector3::zeros();
        self.last_delta_alpha = Vector3::zeros();

        if let Some(time) = self.last_integration_time {
            self.last_reset_time = time;
        }

        integral_dt
    }
}

impl Default for Integrator {
    fn default() -> Self {
        Integrator::new(DEFAULT_AUTO_RESET_INTERVAL_US, false)
    }
}
