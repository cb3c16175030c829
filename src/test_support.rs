//! Scripted transports and recording chart surfaces shared by unit tests.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::channel::{Connection, Transport};
use crate::charts::{Renderer, RendererFactory, Series};
use crate::metrics::wire::encode_update;
use crate::metrics::{MetricDescriptor, Row, UpdateData};

/// Each connect pops the next script entry: `Some(frames)` connects and serves
/// those frames, `None` fails the attempt. Once its frames run out a
/// connection drops, unless the transport holds connections open.
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Option<Vec<String>>>>,
    attempts: AtomicUsize,
    hold_open: bool,
}

impl ScriptedTransport {
    pub fn new(script: Vec<Option<Vec<String>>>) -> Arc<Self> {
        Self::build(script, false)
    }

    pub fn holding_open(script: Vec<Option<Vec<String>>>) -> Arc<Self> {
        Self::build(script, true)
    }

    fn build(script: Vec<Option<Vec<String>>>, hold_open: bool) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            attempts: AtomicUsize::new(0),
            hold_open,
        })
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    fn endpoint(&self) -> &str {
        "scripted://test"
    }

    async fn connect(&self) -> Result<Box<dyn Connection>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front().flatten();
        match next {
            Some(frames) => Ok(Box::new(ScriptedConnection {
                frames: frames.into(),
                hold_open: self.hold_open,
            })),
            None => Err(anyhow!("connection refused")),
        }
    }
}

struct ScriptedConnection {
    frames: VecDeque<String>,
    hold_open: bool,
}

#[async_trait]
impl Connection for ScriptedConnection {
    async fn next_frame(&mut self) -> Option<Result<String>> {
        match self.frames.pop_front() {
            Some(frame) => Some(Ok(frame)),
            None if self.hold_open => std::future::pending().await,
            None => None,
        }
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

pub fn row(viscosity: f64, timestamp_ms: i64) -> Row {
    Row::new([10.0, 20.0, 30.0, viscosity, 50.0, 60.0], timestamp_ms)
}

/// An `update_data` frame; `rows` newest first, as a producer sends them.
pub fn frame(rows: &[Row], predictions: &[f64]) -> String {
    encode_update(&UpdateData {
        data: rows,
        predictions,
    })
    .unwrap()
}

#[derive(Debug, Default)]
pub struct Journal {
    pub created: Vec<&'static str>,
    pub redrawn: Vec<&'static str>,
    pub disposed: Vec<&'static str>,
}

/// Hands out in-memory charts that log their lifecycle into a shared journal.
#[derive(Default)]
pub struct RecordingSurfaces {
    pub journal: Arc<Mutex<Journal>>,
    pub missing: Option<&'static str>,
}

impl RecordingSurfaces {
    pub fn missing(key: &'static str) -> Self {
        Self {
            missing: Some(key),
            ..Self::default()
        }
    }

    pub fn journal(&self) -> std::sync::MutexGuard<'_, Journal> {
        self.journal.lock().unwrap()
    }
}

impl RendererFactory for RecordingSurfaces {
    fn create(&mut self, descriptor: &MetricDescriptor) -> Result<Box<dyn Renderer>> {
        if self.missing == Some(descriptor.key) {
            return Err(anyhow!("no canvas for {}", descriptor.key));
        }
        self.journal.lock().unwrap().created.push(descriptor.key);
        Ok(Box::new(RecordingChart {
            descriptor: *descriptor,
            series: Series::default(),
            journal: Arc::clone(&self.journal),
        }))
    }
}

struct RecordingChart {
    descriptor: MetricDescriptor,
    series: Series,
    journal: Arc<Mutex<Journal>>,
}

impl Renderer for RecordingChart {
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
        self.journal.lock().unwrap().redrawn.push(self.descriptor.key);
        Ok(())
    }

    fn dispose(&mut self) -> Result<()> {
        self.journal.lock().unwrap().disposed.push(self.descriptor.key);
        Ok(())
    }
}
