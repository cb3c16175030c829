use serde::{Deserialize, Serialize};

/// Linear stand-in for the upstream viscosity model:
/// `intercept + elapsed_coef * elapsed_time + velocity_coef * velocity`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ViscosityModel {
    pub intercept: f64,
    pub elapsed_coef: f64,
    pub velocity_coef: f64,
}

impl Default for ViscosityModel {
    fn default() -> Self {
        Self {
            intercept: 0.5,
            elapsed_coef: 0.05,
            velocity_coef: 0.08,
        }
    }
}

impl ViscosityModel {
    /// Never negative.
    pub fn predict(&self, elapsed_time: f64, velocity: f64) -> f64 {
        let raw = self.intercept + self.elapsed_coef * elapsed_time + self.velocity_coef * velocity;
        raw.max(0.0)
    }
}
