use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc::UnboundedReceiver;
use uuid::Uuid;

use crate::channel::{ChannelEvent, ChannelManager, ConnectionStatus, ReconnectPolicy, Transport};
use crate::charts::{ChartSet, RendererFactory};
use crate::correlation::{build_table, CorrelationRow};
use crate::ingest::{ingest, History, MergePolicy};
use crate::metrics::Payload;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

#[derive(Debug, Clone, Copy, Default)]
pub struct SessionOptions {
    pub reconnect: ReconnectPolicy,
    pub merge_policy: MergePolicy,
}

/// What handling one event changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionUpdate {
    Status(ConnectionStatus),
    /// The window was repainted; carries rows in view and rows dropped as invalid.
    Window { rows: usize, dropped: usize },
}

/// One client's dashboard: exactly one channel and one chart set, plus the
/// view state derived from them.
///
/// Events are handled strictly one at a time; each `Data` event runs ingestion,
/// the chart repaint and the table rebuild to completion before the next event
/// is looked at.
pub struct DashboardSession {
    id: String,
    status: ConnectionStatus,
    channel: ChannelManager,
    events: Option<UnboundedReceiver<ChannelEvent>>,
    charts: Option<ChartSet>,
    history: History,
    table: Vec<CorrelationRow>,
}

impl DashboardSession {
    /// Acquires every chart surface, then opens the channel. If any surface is
    /// missing the session is not created and no connection is attempted.
    pub fn open(
        transport: Arc<dyn Transport>,
        surfaces: &mut dyn RendererFactory,
        options: SessionOptions,
    ) -> Result<Self> {
        let id = Uuid::new_v4().to_string();
        let charts = ChartSet::new(surfaces)
            .with_context(|| format!("session {id} could not set up its charts"))?;
        let (channel, events) = ChannelManager::open(transport, options.reconnect);

        log_info!("session {} opened against {}", id, channel.endpoint());

        Ok(Self {
            id,
            status: ConnectionStatus::Connecting,
            channel,
            events: Some(events),
            charts: Some(charts),
            history: History::new(options.merge_policy),
            table: Vec::new(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn charts(&self) -> Option<&ChartSet> {
        self.charts.as_ref()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn table(&self) -> &[CorrelationRow] {
        &self.table
    }

    pub fn is_closed(&self) -> bool {
        self.events.is_none()
    }

    /// Waits for the next channel event. `None` once the session is closed or
    /// the channel has shut down for good.
    pub async fn next_event(&mut self) -> Option<ChannelEvent> {
        self.events.as_mut()?.recv().await
    }

    pub fn handle_event(&mut self, event: ChannelEvent) -> Result<SessionUpdate> {
        match event {
            ChannelEvent::Connected => {
                self.status = ConnectionStatus::Connected;
                log_info!("session {} connected", self.id);
                Ok(SessionUpdate::Status(self.status))
            }
            ChannelEvent::Disconnected => {
                self.status = ConnectionStatus::Disconnected;
                log_warn!("session {} disconnected", self.id);
                Ok(SessionUpdate::Status(self.status))
            }
            ChannelEvent::Data(payload) => self.apply_payload(payload),
        }
    }

    /// Waits for and handles the next event.
    pub async fn step(&mut self) -> Option<Result<SessionUpdate>> {
        let event = self.next_event().await?;
        Some(self.handle_event(event))
    }

    fn apply_payload(&mut self, payload: Payload) -> Result<SessionUpdate> {
        let batch = ingest(payload);
        let dropped = batch.dropped;
        if dropped > 0 {
            log_warn!("session {} dropped {} malformed rows", self.id, dropped);
        }

        self.history.merge(batch);
        self.table = build_table(self.history.samples());

        let charts = self
            .charts
            .as_mut()
            .context("session charts have been released")?;
        charts
            .load(self.history.samples().map(|sample| &sample.row))
            .context("chart redraw failed")?;

        log_debug!(
            "session {} window now {} rows",
            self.id,
            self.history.len()
        );
        Ok(SessionUpdate::Window {
            rows: self.history.len(),
            dropped,
        })
    }

    /// Restarts a channel that gave up after its retries ran out.
    pub fn reconnect(&mut self) -> bool {
        if self.is_closed() {
            return false;
        }
        let restarted = self.channel.reconnect();
        if restarted {
            self.status = ConnectionStatus::Connecting;
        }
        restarted
    }

    /// Swaps in a fresh chart set, disposing the previous one first. On failure
    /// the session is left without charts rather than with a partial set.
    pub fn remount(&mut self, surfaces: &mut dyn RendererFactory) -> Result<()> {
        if let Some(mut previous) = self.charts.take() {
            previous.dispose();
        }

        let mut charts = ChartSet::new(surfaces)
            .with_context(|| format!("session {} could not remount its charts", self.id))?;
        let repaint = charts.load(self.history.samples().map(|sample| &sample.row));
        self.charts = Some(charts);
        repaint
    }

    /// Closes the channel, then releases every chart. Both steps always run;
    /// calling this again is a no-op.
    pub async fn close(&mut self) {
        if let Err(err) = self.channel.close().await {
            log_warn!("session {} channel close failed: {err:#}", self.id);
        }
        if self.events.take().is_some() {
            log_info!("session {} closed", self.id);
        }

        if let Some(mut charts) = self.charts.take() {
            charts.dispose();
        }
        self.history.clear();
        self.table.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlation::Quality;
    use crate::test_support::{frame, row, RecordingSurfaces, ScriptedTransport};
    use std::time::Duration;

    fn options(merge_policy: MergePolicy) -> SessionOptions {
        SessionOptions {
            reconnect: ReconnectPolicy::default(),
            merge_policy,
        }
    }

    async fn expect_update(session: &mut DashboardSession) -> SessionUpdate {
        session.step().await.expect("channel ended").expect("event failed")
    }

    #[tokio::test]
    async fn payload_repaints_every_chart_and_the_table() {
        let payload = frame(
            &[row(1.9, 3_000), row(1.7, 2_000), row(1.2, 1_000)],
            &[2.4, 1.8, 1.6],
        );
        let transport = ScriptedTransport::holding_open(vec![Some(vec![payload])]);
        let mut surfaces = RecordingSurfaces::default();
        let mut session =
            DashboardSession::open(transport, &mut surfaces, options(MergePolicy::Replace))
                .unwrap();
        assert_eq!(session.status(), ConnectionStatus::Connecting);

        assert_eq!(
            expect_update(&mut session).await,
            SessionUpdate::Status(ConnectionStatus::Connected)
        );
        assert_eq!(
            expect_update(&mut session).await,
            SessionUpdate::Window { rows: 3, dropped: 0 }
        );

        let charts = session.charts().unwrap();
        assert_eq!(charts.point_count(), 3);
        assert!(charts.is_aligned());
        let timestamps: Vec<i64> = charts.renderers()[0].series().timestamps().collect();
        assert_eq!(timestamps, vec![1_000, 2_000, 3_000]);

        let table = session.table();
        assert_eq!(table.len(), 3);
        assert_eq!(table[0].timestamp_ms, 1_000);
        assert_eq!(table[0].predicted, Some(1.6));
        assert_eq!(table[0].actual_label, Quality::Bad);
        assert_eq!(table[2].predicted, Some(2.4));
        assert_eq!(table[2].predicted_label, Quality::Bad);
        assert_eq!(surfaces.journal().redrawn.len(), 6);

        session.close().await;
    }

    #[tokio::test]
    async fn replace_policy_shows_only_the_latest_payload() {
        let transport = ScriptedTransport::holding_open(vec![Some(vec![
            frame(&[row(1.7, 2_000), row(1.7, 1_000)], &[]),
            frame(&[row(1.8, 3_000)], &[]),
        ])]);
        let mut surfaces = RecordingSurfaces::default();
        let mut session =
            DashboardSession::open(transport, &mut surfaces, options(MergePolicy::Replace))
                .unwrap();

        expect_update(&mut session).await;
        expect_update(&mut session).await;
        assert_eq!(
            expect_update(&mut session).await,
            SessionUpdate::Window { rows: 1, dropped: 0 }
        );
        assert_eq!(session.charts().unwrap().point_count(), 1);
        assert_eq!(session.table()[0].predicted_label, Quality::Bad);

        session.close().await;
    }

    #[tokio::test]
    async fn append_policy_accumulates_up_to_capacity() {
        let transport = ScriptedTransport::holding_open(vec![Some(vec![
            frame(&[row(1.7, 2_000), row(1.7, 1_000)], &[]),
            frame(&[row(1.8, 3_000)], &[]),
            frame(&[row(1.8, 4_000)], &[]),
        ])]);
        let mut surfaces = RecordingSurfaces::default();
        let mut session = DashboardSession::open(
            transport,
            &mut surfaces,
            options(MergePolicy::Append { capacity: 3 }),
        )
        .unwrap();

        for _ in 0..4 {
            expect_update(&mut session).await;
        }
        let charts = session.charts().unwrap();
        assert!(charts.is_aligned());
        let timestamps: Vec<i64> = charts.renderers()[5].series().timestamps().collect();
        assert_eq!(timestamps, vec![2_000, 3_000, 4_000]);
        assert_eq!(session.table().len(), 3);

        session.close().await;
    }

    #[tokio::test]
    async fn malformed_frames_and_rows_do_not_end_the_session() {
        let transport = ScriptedTransport::holding_open(vec![Some(vec![
            "{not json".to_string(),
            r#"{"event":"update_data","data":{"data":[[0,1,2,3,1.8,5,6,1000],[0,"x"]],"predictions":[1.7,1.9]}}"#
                .to_string(),
        ])]);
        let mut surfaces = RecordingSurfaces::default();
        let mut session =
            DashboardSession::open(transport, &mut surfaces, SessionOptions::default()).unwrap();

        expect_update(&mut session).await;
        assert_eq!(
            expect_update(&mut session).await,
            SessionUpdate::Window { rows: 1, dropped: 1 }
        );
        // reversed: the bad row sat at position 0 and took 1.9 with it
        assert_eq!(session.table()[0].predicted, Some(1.7));

        session.close().await;
    }

    #[tokio::test]
    async fn missing_surface_prevents_the_session_and_the_connection() {
        let transport = ScriptedTransport::holding_open(vec![Some(vec![])]);
        let mut surfaces = RecordingSurfaces::missing("TDS");

        let result =
            DashboardSession::open(transport.clone(), &mut surfaces, SessionOptions::default());
        assert!(result.is_err());

        tokio::task::yield_now().await;
        assert_eq!(transport.attempts(), 0);
        let journal = surfaces.journal();
        assert_eq!(journal.created.len(), 4);
        assert_eq!(journal.disposed, journal.created);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_leave_status_disconnected() {
        let transport = ScriptedTransport::new(vec![]);
        let mut surfaces = RecordingSurfaces::default();
        let mut session =
            DashboardSession::open(transport.clone(), &mut surfaces, SessionOptions::default())
                .unwrap();

        assert_eq!(
            expect_update(&mut session).await,
            SessionUpdate::Status(ConnectionStatus::Disconnected)
        );
        assert_eq!(transport.attempts(), 6);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(transport.attempts(), 6);
        assert_eq!(session.status(), ConnectionStatus::Disconnected);

        session.close().await;
    }

    #[tokio::test]
    async fn closing_twice_is_quiet_and_releases_everything_once() {
        let transport = ScriptedTransport::holding_open(vec![Some(vec![frame(
            &[row(1.7, 1_000)],
            &[1.8],
        )])]);
        let mut surfaces = RecordingSurfaces::default();
        let mut session =
            DashboardSession::open(transport, &mut surfaces, SessionOptions::default()).unwrap();
        expect_update(&mut session).await;

        session.close().await;
        session.close().await;

        assert!(session.is_closed());
        assert!(session.charts().is_none());
        assert!(session.next_event().await.is_none());
        assert!(!session.reconnect());
        assert_eq!(surfaces.journal().disposed.len(), 6);
    }

    #[tokio::test]
    async fn remount_disposes_the_old_charts_before_creating_new_ones() {
        let transport = ScriptedTransport::holding_open(vec![Some(vec![frame(
            &[row(1.7, 2_000), row(1.7, 1_000)],
            &[],
        )])]);
        let mut first = RecordingSurfaces::default();
        let mut session =
            DashboardSession::open(transport, &mut first, SessionOptions::default()).unwrap();
        expect_update(&mut session).await;
        expect_update(&mut session).await;

        let mut second = RecordingSurfaces::default();
        session.remount(&mut second).unwrap();
        assert_eq!(first.journal().disposed.len(), 6);
        assert_eq!(session.charts().unwrap().point_count(), 2);

        let mut broken = RecordingSurfaces::missing("Elapsed Time");
        assert!(session.remount(&mut broken).is_err());
        assert!(session.charts().is_none());
        assert_eq!(second.journal().disposed.len(), 6);

        session.close().await;
    }
}
