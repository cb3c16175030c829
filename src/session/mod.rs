pub mod controller;

pub use controller::{DashboardSession, SessionOptions, SessionUpdate};
