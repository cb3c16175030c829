pub mod client;
pub mod model;
pub mod types;

pub use client::{PredictionClient, PredictionForm, PredictionView};
pub use model::ViscosityModel;
pub use types::{ErrorBody, PredictionRequest, PredictionResponse};
