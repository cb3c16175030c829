use anyhow::{bail, Result};

use crate::metrics::MetricDescriptor;

use super::{Renderer, RendererFactory, Series};

const ENABLE_LOGS: bool = true;

use crate::log_info;

const SPARK_LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Hands out sparkline charts `width` cells wide.
#[derive(Debug, Clone)]
pub struct TerminalSurface {
    width: usize,
}

impl TerminalSurface {
    pub fn new(width: usize) -> Self {
        Self { width }
    }
}

impl RendererFactory for TerminalSurface {
    fn create(&mut self, descriptor: &MetricDescriptor) -> Result<Box<dyn Renderer>> {
        if self.width == 0 {
            bail!("terminal surface for {} has no room to draw", descriptor.key);
        }
        Ok(Box::new(TerminalChart {
            descriptor: *descriptor,
            series: Series::default(),
            width: self.width,
            last_frame: String::new(),
            disposed: false,
        }))
    }
}

/// Draws the newest points of one metric as a sparkline through the logger.
#[derive(Debug)]
pub struct TerminalChart {
    descriptor: MetricDescriptor,
    series: Series,
    width: usize,
    last_frame: String,
    disposed: bool,
}

impl TerminalChart {
    pub fn last_frame(&self) -> &str {
        &self.last_frame
    }
}

impl Renderer for TerminalChart {
    fn descriptor(&self) -> &MetricDescriptor {
        &self.descriptor
    }

    fn series(&self) -> &Series {
        &self.series
    }

    fn series_mut(&mut self) -> &mut Series {
        &mut self.series
    }

    fn redraw(&mut self) -> Result<()> {
        if self.disposed {
            bail!("chart {} was disposed", self.descriptor.key);
        }

        let points = self.series.points();
        let visible = &points[points.len().saturating_sub(self.width)..];
        let values: Vec<f64> = visible.iter().map(|point| point.value).collect();

        self.last_frame = match self.series.last() {
            Some(last) => format!(
                "{:<12} {} {:>9.2}",
                self.descriptor.key,
                sparkline(&values),
                last.value
            ),
            None => format!("{:<12} (no data)", self.descriptor.key),
        };
        log_info!("{}", self.last_frame);
        Ok(())
    }

    fn dispose(&mut self) -> Result<()> {
        self.disposed = true;
        self.series.clear();
        self.last_frame.clear();
        Ok(())
    }
}

/// Maps values onto eight block heights, scaled between their min and max.
pub fn sparkline(values: &[f64]) -> String {
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let span = max - min;
    let top = (SPARK_LEVELS.len() - 1) as f64;

    values
        .iter()
        .map(|&value| {
            let level = if span > 0.0 {
                ((value - min) / span * top).round() as usize
            } else {
                0
            };
            SPARK_LEVELS[level.min(SPARK_LEVELS.len() - 1)]
        })
        .collect()
}
