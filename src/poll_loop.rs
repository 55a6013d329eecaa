//! Poll loop: schedule → live feed per game → classify → alert once.
//!
//! Two states. `Running` is the normal case; a cycle that fails puts the loop
//! in `Recovering` for the back-off sleep, after which it is `Running` again
//! whatever the next cycle does. Both sleep the same fixed interval, and
//! nothing inside the loop ever stops it.

use chrono::{Local, NaiveDate};
use logger::{now_iso, CycleHeartbeatEvent, EventLogger, ExtraInningsEvent};
use mlb_monitor::{FetchError, GamePk, GameSource};
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};
use webhook_alert::AlertSink;

use crate::dedup::NotifiedSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Recovering,
}

#[derive(Debug, Error)]
pub enum CycleError {
    #[error("schedule fetch failed: {0}")]
    Schedule(#[source] FetchError),

    #[error("live feed for game {game_pk} failed: {source}")]
    LiveFeed {
        game_pk: GamePk,
        #[source]
        source: FetchError,
    },
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub games_seen:         usize,
    pub feeds_fetched:      usize,
    pub skipped_without_id: usize,
    pub notified:           Vec<GamePk>,
    pub delivery_failures:  usize,
}

pub struct PollLoop<S, N> {
    source:   S,
    sink:     N,
    notified: NotifiedSet,
    interval: Duration,
    state:    LoopState,
    events:   Option<EventLogger>,
}

impl<S: GameSource, N: AlertSink> PollLoop<S, N> {
    pub fn new(source: S, sink: N, interval: Duration) -> Self {
        Self {
            source,
            sink,
            notified: NotifiedSet::new(),
            interval,
            state: LoopState::Running,
            events: None,
        }
    }

    pub fn with_event_log(mut self, events: EventLogger) -> Self {
        self.events = Some(events);
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn notified(&self) -> &NotifiedSet {
        &self.notified
    }

    /// Never returns; stop the process to stop polling.
    pub async fn run(mut self) {
        info!("Starting MLB extra innings notifier (interval {}s)", self.interval.as_secs());
        loop {
            let delay = self.tick().await;
            sleep(delay).await;
            self.back_off_elapsed();
        }
    }

    /// Recovering → Running. Unconditional: the next cycle starts as Running.
    pub fn back_off_elapsed(&mut self) {
        if self.state == LoopState::Recovering {
            info!("Back-off elapsed, resuming polling");
            self.state = LoopState::Running;
        }
    }

    /// One cycle for today's local date. Returns how long to sleep before the next.
    pub async fn tick(&mut self) -> Duration {
        let today = Local::now().date_naive();
        self.tick_for(today).await
    }

    pub async fn tick_for(&mut self, date: NaiveDate) -> Duration {
        debug!("--- Poll cycle {date} ---");
        match self.run_cycle(date).await {
            Ok(report) => {
                self.state = LoopState::Running;
                info!(
                    games = report.games_seen,
                    feeds = report.feeds_fetched,
                    notified = report.notified.len(),
                    "Cycle completed"
                );
                self.heartbeat(Some(&report), None);
            }
            Err(e) => {
                error!("Error: {e}");
                self.state = LoopState::Recovering;
                self.heartbeat(None, Some(e.to_string()));
            }
        }
        self.interval
    }

    /// The first live-feed failure ends the cycle; games after it wait for the next one.
    pub async fn run_cycle(&mut self, date: NaiveDate) -> Result<CycleReport, CycleError> {
        let games = self.source.schedule(date).await.map_err(CycleError::Schedule)?;

        let mut report = CycleReport {
            games_seen: games.len(),
            ..CycleReport::default()
        };

        for game in &games {
            let Some(game_pk) = game.game_pk else {
                warn!("Skipping {} vs {}: no gamePk", game.away, game.home);
                report.skipped_without_id += 1;
                continue;
            };

            let linescore = self.source.linescore(game_pk).await
                .map_err(|source| CycleError::LiveFeed { game_pk, source })?;
            report.feeds_fetched += 1;

            if !linescore.is_extra_innings() || self.notified.contains(game_pk) {
                continue;
            }

            let outcome = self.sink.notify(game).await;
            // Marked even when delivery failed: no second attempt for this game.
            self.notified.insert(game_pk);
            report.notified.push(game_pk);
            if !outcome.is_delivered() {
                report.delivery_failures += 1;
            }

            if let Some(events) = &self.events {
                events.log_or_warn(&ExtraInningsEvent {
                    ts:       now_iso(),
                    event:    "EXTRA_INNINGS",
                    game_pk:  game_pk.0,
                    home:     game.home.clone(),
                    away:     game.away.clone(),
                    inning:   linescore.current_inning,
                    half:     linescore.inning_state.clone(),
                    delivery: outcome.to_string(),
                });
            }
        }

        Ok(report)
    }

    fn heartbeat(&self, report: Option<&CycleReport>, error: Option<String>) {
        let Some(events) = &self.events else { return };
        let empty = CycleReport::default();
        let r = report.unwrap_or(&empty);
        events.log_or_warn(&CycleHeartbeatEvent {
            ts:                now_iso(),
            event:             "CYCLE_HEARTBEAT",
            ok:                error.is_none(),
            games_seen:        r.games_seen,
            feeds_fetched:     r.feeds_fetched,
            notified:          r.notified.len(),
            delivery_failures: r.delivery_failures,
            tracked_games:     self.notified.len(),
            error,
        });
    }
}
