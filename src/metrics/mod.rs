mod types;
pub mod wire;

pub use types::{
    MetricDescriptor, Payload, Row, UpdateData, FIRST_METRIC_OFFSET, METRICS, METRIC_COUNT,
    ROW_WIDTH, TIMESTAMP_OFFSET, VISCOSITY_OFFSET,
};
