use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::metrics::wire::encode_update;
use crate::metrics::{Row, UpdateData};

use super::generator::{GeneratedSample, SampleGenerator};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// Frames buffered per subscriber before it starts lagging.
const BROADCAST_CAPACITY: usize = 64;

/// Rolling window of generated samples, oldest first.
#[derive(Debug, Clone, Default)]
struct Window {
    rows: VecDeque<Row>,
    predictions: VecDeque<f64>,
}

impl Window {
    fn push(&mut self, sample: GeneratedSample, capacity: usize) {
        self.rows.push_back(sample.row);
        self.predictions.push_back(sample.prediction);
        while self.rows.len() > capacity {
            self.rows.pop_front();
            self.predictions.pop_front();
        }
    }

    /// Producer order: newest first, predictions in the same order.
    fn encode_newest_first(&self, count: usize) -> Result<String> {
        let rows: Vec<Row> = self.rows.iter().rev().take(count).copied().collect();
        let predictions: Vec<f64> = self.predictions.iter().rev().take(count).copied().collect();
        encode_update(&UpdateData {
            data: &rows,
            predictions: &predictions,
        })
    }
}

/// Shared source of `update_data` frames for every connection.
///
/// A single ticker appends one sample per interval and broadcasts either the
/// whole window or just that sample. Connections subscribe, then send the
/// current window as their first frame.
#[derive(Clone)]
pub struct Feed {
    window: Arc<Mutex<Window>>,
    updates: broadcast::Sender<String>,
    generator: SampleGenerator,
    capacity: usize,
    send_full_window: bool,
}

impl Feed {
    pub fn new(generator: SampleGenerator, capacity: usize, send_full_window: bool) -> Self {
        let (updates, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            window: Arc::new(Mutex::new(Window::default())),
            updates,
            generator,
            capacity: capacity.max(1),
            send_full_window,
        }
    }

    /// Fills the window with `capacity` samples spaced `spacing` apart, ending now.
    pub async fn seed(&self, spacing: Duration) {
        let now = Utc::now().timestamp_millis();
        let spacing_ms = spacing.as_millis() as i64;
        let mut window = self.window.lock().await;
        let mut rng = rand::thread_rng();
        for step in (0..self.capacity as i64).rev() {
            let sample = self.generator.generate(&mut rng, now - step * spacing_ms);
            window.push(sample, self.capacity);
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.updates.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.updates.receiver_count()
    }

    pub async fn len(&self) -> usize {
        self.window.lock().await.rows.len()
    }

    /// The frame a new connection receives first.
    pub async fn snapshot(&self) -> Result<String> {
        let window = self.window.lock().await;
        window.encode_newest_first(self.capacity)
    }

    /// Generates one sample, appends it and broadcasts the resulting frame.
    pub async fn tick(&self) -> Result<()> {
        let sample = {
            let mut rng = rand::thread_rng();
            self.generator
                .generate(&mut rng, Utc::now().timestamp_millis())
        };

        let frame = {
            let mut window = self.window.lock().await;
            window.push(sample, self.capacity);
            let count = if self.send_full_window { self.capacity } else { 1 };
            window.encode_newest_first(count)?
        };

        // No subscribers is not an error; the frame is simply not seen.
        let delivered = self.updates.send(frame).unwrap_or(0);
        log_debug!("feed tick delivered to {} connections", delivered);
        Ok(())
    }

    /// Runs `tick` every `interval` until cancelled.
    pub fn spawn_ticker(&self, interval: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        let feed = self.clone();
        tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
            // the first tick completes immediately; the seeded window covers it
            ticker.tick().await;
            log_info!("feed ticking every {:?}", interval);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(err) = feed.tick().await {
                            log_warn!("feed tick failed: {err:#}");
                        }
                    }
                }
            }
            log_info!("feed ticker stopped");
        })
    }
}
