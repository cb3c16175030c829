use anyhow::{anyhow, Result};

use crate::metrics::{Row, METRICS, METRIC_COUNT};

use super::{Renderer, RendererFactory};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

/// The full set of metric charts, kept in lock-step.
///
/// Renderer `i` is bound to `METRICS[i]` and always holds the same number of
/// points, with the same timestamps in the same order, as every sibling.
/// All mutation goes through `&mut self`, so no observer can see the set
/// half-updated.
pub struct ChartSet {
    renderers: Vec<Box<dyn Renderer>>,
    disposed: bool,
}

impl ChartSet {
    /// Creates one renderer per metric. Either every surface is acquired or
    /// none is: on the first failure the renderers created so far are
    /// disposed and the error is returned.
    pub fn new(factory: &mut dyn RendererFactory) -> Result<Self> {
        let mut renderers: Vec<Box<dyn Renderer>> = Vec::with_capacity(METRIC_COUNT);
        for descriptor in METRICS.iter() {
            match factory.create(descriptor) {
                Ok(renderer) => renderers.push(renderer),
                Err(err) => {
                    dispose_all(&mut renderers);
                    return Err(err.context(format!(
                        "chart surface for {} is unavailable",
                        descriptor.key
                    )));
                }
            }
        }

        Ok(Self {
            renderers,
            disposed: false,
        })
    }

    pub fn reset(&mut self) {
        for renderer in &mut self.renderers {
            renderer.series_mut().clear();
        }
    }

    /// Pushes one point to every chart, sharing the row's timestamp.
    pub fn append_row(&mut self, row: &Row) {
        let timestamp_ms = row.timestamp_ms();
        for (index, renderer) in self.renderers.iter_mut().enumerate() {
            renderer.series_mut().push(timestamp_ms, row.metric(index));
        }
    }

    /// Redraws every chart. A failing redraw does not stop the others; the
    /// first error is returned once all have been attempted.
    pub fn flush(&mut self) -> Result<()> {
        if self.disposed {
            return Err(anyhow!("chart set already disposed"));
        }

        let mut first_error = None;
        for renderer in &mut self.renderers {
            if let Err(err) = renderer.redraw() {
                log_warn!("redraw of {} failed: {err:#}", renderer.descriptor().key);
                first_error.get_or_insert(err);
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Replaces the contents of every chart with `rows` and redraws.
    pub fn load<'a>(&mut self, rows: impl IntoIterator<Item = &'a Row>) -> Result<()> {
        self.reset();
        for row in rows {
            self.append_row(row);
        }
        debug_assert!(self.is_aligned());
        self.flush()
    }

    /// Best-effort release of every renderer. Safe to call repeatedly.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        dispose_all(&mut self.renderers);
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn renderers(&self) -> &[Box<dyn Renderer>] {
        &self.renderers
    }

    /// Points per chart (identical for every chart).
    pub fn point_count(&self) -> usize {
        self.renderers
            .first()
            .map(|renderer| renderer.series().len())
            .unwrap_or(0)
    }

    pub fn is_aligned(&self) -> bool {
        let Some((first, rest)) = self.renderers.split_first() else {
            return true;
        };
        rest.iter()
            .all(|renderer| renderer.series().timestamps().eq(first.series().timestamps()))
    }
}

impl Drop for ChartSet {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn dispose_all(renderers: &mut [Box<dyn Renderer>]) {
    for renderer in renderers.iter_mut() {
        match renderer.dispose() {
            Ok(()) => log_debug!("disposed chart {}", renderer.descriptor().key),
            Err(err) => log_warn!(
                "failed to dispose chart {}: {err:#}",
                renderer.descriptor().key
            ),
        }
    }
}
