pub mod sync;
pub mod terminal;

use anyhow::Result;
use serde::Serialize;

use crate::metrics::MetricDescriptor;

pub use sync::ChartSet;
pub use terminal::{TerminalChart, TerminalSurface};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChartPoint {
    pub timestamp_ms: i64,
    pub value: f64,
}

/// Point buffer behind one chart. The engine is the only writer.
#[derive(Debug, Clone, Default)]
pub struct Series {
    points: Vec<ChartPoint>,
}

impl Series {
    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn push(&mut self, timestamp_ms: i64, value: f64) {
        self.points.push(ChartPoint {
            timestamp_ms,
            value,
        });
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[ChartPoint] {
        &self.points
    }

    pub fn timestamps(&self) -> impl Iterator<Item = i64> + '_ {
        self.points.iter().map(|point| point.timestamp_ms)
    }

    pub fn last(&self) -> Option<ChartPoint> {
        self.points.last().copied()
    }
}

/// One metric's visual time series. Renderers never see each other; keeping
/// them aligned is the job of [`ChartSet`].
pub trait Renderer: Send {
    fn descriptor(&self) -> &MetricDescriptor;

    fn series(&self) -> &Series;

    fn series_mut(&mut self) -> &mut Series;

    fn redraw(&mut self) -> Result<()>;

    /// Releases the backing surface. Called at most once per renderer.
    fn dispose(&mut self) -> Result<()>;
}

/// Binds descriptors to backing surfaces.
pub trait RendererFactory {
    /// Fails when the surface for `descriptor` is unavailable.
    fn create(&mut self, descriptor: &MetricDescriptor) -> Result<Box<dyn Renderer>>;
}
