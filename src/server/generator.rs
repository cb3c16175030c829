use rand::Rng;

use crate::metrics::Row;
use crate::predict::ViscosityModel;

/// Half-width of the noise added to the model's viscosity.
const VISCOSITY_NOISE: f64 = 1.5;

/// One synthetic observation and the model's viscosity for it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeneratedSample {
    pub row: Row,
    pub prediction: f64,
}

/// Test data source. Metrics are uniform over fixed ranges; viscosity tracks
/// the model with noise so predictions are close but not exact.
#[derive(Debug, Clone, Copy, Default)]
pub struct SampleGenerator {
    model: ViscosityModel,
}

impl SampleGenerator {
    pub fn new(model: ViscosityModel) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &ViscosityModel {
        &self.model
    }

    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R, timestamp_ms: i64) -> GeneratedSample {
        let elapsed_time = rng.gen_range(0.0..100.0);
        let velocity = rng.gen_range(0.0..50.0);
        let density = rng.gen_range(0.0..200.0);
        let tds = rng.gen_range(0.0..500.0);
        let mass = rng.gen_range(0.0..1000.0);

        let prediction = self.model.predict(elapsed_time, velocity);
        let noise = rng.gen_range(-VISCOSITY_NOISE..=VISCOSITY_NOISE);
        let viscosity = (prediction + noise).max(0.0);

        GeneratedSample {
            row: Row::new(
                [elapsed_time, velocity, density, viscosity, tds, mass],
                timestamp_ms,
            ),
            prediction,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn samples_stay_within_their_ranges() {
        let generator = SampleGenerator::default();
        let mut rng = StdRng::seed_from_u64(7);

        for i in 0..500 {
            let sample = generator.generate(&mut rng, 1_000 + i);
            let row = sample.row;
            assert_eq!(row.0[0], 0.0);
            assert_eq!(row.timestamp_ms(), 1_000 + i);
            assert!((0.0..100.0).contains(&row.metric(0)));
            assert!((0.0..50.0).contains(&row.metric(1)));
            assert!((0.0..200.0).contains(&row.metric(2)));
            assert!((0.0..500.0).contains(&row.metric(4)));
            assert!((0.0..1000.0).contains(&row.metric(5)));
            assert!(row.viscosity() >= 0.0);
            assert!((row.viscosity() - sample.prediction).abs() <= VISCOSITY_NOISE + 1e-9);
        }
    }

    #[test]
    fn prediction_comes_from_the_model() {
        let generator = SampleGenerator::new(ViscosityModel {
            intercept: 1.0,
            elapsed_coef: 0.0,
            velocity_coef: 0.0,
        });
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(generator.generate(&mut rng, 0).prediction, 1.0);
    }
}
