//! The monitor engine.
//!
//! Each cycle:
//!   1. Refreshes every instrument's window from the price source
//!      (concurrently, each call bounded by `fetch_timeout`).
//!   2. Walks every instrument pair in a fixed order: cooldown gate,
//!      snapshot, Z-score, threshold.
//!   3. Sends qualifying alerts as one batch and restarts their cooldowns,
//!      whether or not delivery succeeded. Alerts that overflow the message
//!      get no cooldown and go out on the next cycle.
//!
//! Nothing that goes wrong for one instrument or one pair aborts the cycle.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use common::logger::{TraceId, cycle_span, warn_if_slow};
use common::time::now_ms;
use futures::future::join_all;
use market::cache::PriceCache;
use market::pulse::{SpreadError, pair_z};
use market::rolling_window::AppendOutcome;
use market::source::{PriceSource, SourceError};
use market::types::{Pair, PriceSample, all_pairs};
use notifier::{Alert, NotificationSink, render_batch};
use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval, timeout};
use tracing::{Instrument, debug, info, warn};

use super::counters::Counters;
use super::gate;
use super::state::AlertState;
use super::types::{ConfigError, CycleReport, DispatchOutcome, MonitorConfig, MonitorPhase};

/// Budget for the concurrent fetch phase before a slow-operation warning.
const FETCH_PHASE_BUDGET: Duration = Duration::from_secs(5);
const DISPATCH_BUDGET: Duration = Duration::from_secs(3);

type FetchResult = (String, bool, Result<Vec<PriceSample>, SourceError>);

pub struct MonitorScheduler {
    cfg: MonitorConfig,
    source: Arc<dyn PriceSource>,
    sink: Arc<dyn NotificationSink>,

    /// Every unordered instrument pair, fixed for the process lifetime.
    pairs: Vec<Pair>,

    cache: PriceCache,
    alerts: AlertState,
    phase: MonitorPhase,
    cycle: u64,

    /// Observability counters (does not affect behavior).
    counters: Counters,
}

impl MonitorScheduler {
    pub fn new(
        cfg: MonitorConfig,
        source: Arc<dyn PriceSource>,
        sink: Arc<dyn NotificationSink>,
    ) -> Result<Self, ConfigError> {
        cfg.validate()?;

        let pairs = all_pairs(&cfg.instruments);
        let cache = PriceCache::new(cfg.rolling_period, cfg.window_margin);

        Ok(Self {
            cfg,
            source,
            sink,
            pairs,
            cache,
            alerts: AlertState::new(),
            phase: MonitorPhase::WarmingUp,
            cycle: 0,
            counters: Counters::default(),
        })
    }

    pub fn phase(&self) -> MonitorPhase {
        self.phase
    }

    pub fn cache(&self) -> &PriceCache {
        &self.cache
    }

    pub fn alert_state(&self) -> &AlertState {
        &self.alerts
    }

    pub fn counters(&self) -> Counters {
        self.counters.clone()
    }

    /// Bulk-loads every instrument's history, then moves to `Steady`.
    ///
    /// Instruments that fail or come back short do not block the
    /// transition; their pairs stay insufficient until a later refresh
    /// rebuilds them.
    pub async fn warm_up(&mut self) {
        info!(
            instruments = self.cfg.instruments.len(),
            pairs = self.pairs.len(),
            venue = self.source.name(),
            "warming up price cache"
        );

        let plan: Vec<(String, bool)> = self
            .cfg
            .instruments
            .iter()
            .map(|s| (s.clone(), true))
            .collect();
        let results = warn_if_slow("warm_up_fetch", FETCH_PHASE_BUDGET, self.fetch_all(plan)).await;

        let (mut loaded, mut short, mut failed) = (0usize, 0usize, 0usize);
        for (symbol, _, result) in results {
            match result {
                Ok(samples) if !samples.is_empty() => {
                    let fetched = samples.len();
                    let kept = self.cache.initialize(&symbol, samples);
                    if self.cache.is_sufficient(&symbol) {
                        loaded += 1;
                        info!(symbol = %symbol, fetched, kept, "history loaded");
                    } else {
                        short += 1;
                        warn!(
                            symbol = %symbol,
                            kept,
                            need = self.cache.min_samples(),
                            "history shorter than rolling period"
                        );
                    }
                }
                Ok(_) => {
                    failed += 1;
                    warn!(symbol = %symbol, "initial fetch returned no data");
                }
                Err(e) => {
                    failed += 1;
                    Counters::add(&self.counters.fetch_failures, 1);
                    warn!(symbol = %symbol, kind = e.kind(), error = %e, "initial fetch failed");
                }
            }
        }

        self.phase = MonitorPhase::Steady;
        info!(loaded, short, failed, "warm-up complete; monitoring started");
    }

    /// Runs one full cycle at wall-clock `now_ms`. Warms up first if that
    /// has not happened yet.
    pub async fn run_cycle(&mut self, now_ms: u64) -> CycleReport {
        if self.phase == MonitorPhase::WarmingUp {
            self.warm_up().await;
        }

        self.cycle += 1;
        let span = cycle_span(self.cycle, &TraceId::default());
        self.cycle_inner(now_ms).instrument(span).await
    }

    async fn cycle_inner(&mut self, now_ms: u64) -> CycleReport {
        let mut report = CycleReport::new(self.cycle, now_ms);

        self.refresh(&mut report).await;
        self.evaluate_pairs(now_ms, &mut report);
        self.dispatch(now_ms, &mut report).await;

        tracing::Span::current().record("alerts", report.alerts.len());
        Counters::add(&self.counters.cycles, 1);

        info!(
            refreshed = report.refreshed,
            fetch_failed = report.fetch_failed,
            recovered = report.recovered,
            appended = report.appended,
            evaluated = report.pairs_evaluated,
            skipped_cooldown = report.skipped_cooldown,
            skipped_insufficient = report.skipped_insufficient,
            skipped_degenerate = report.skipped_degenerate,
            alerts = report.alerts.len(),
            deferred = report.deferred,
            dispatch = ?report.dispatch,
            "cycle complete"
        );

        report
    }

    /// Step 1: pull the newest samples. Instruments without a usable window
    /// are rebuilt from a full history fetch instead.
    async fn refresh(&mut self, report: &mut CycleReport) {
        let plan: Vec<(String, bool)> = self
            .cfg
            .instruments
            .iter()
            .map(|s| (s.clone(), !self.cache.is_sufficient(s)))
            .collect();

        let results = warn_if_slow("refresh_fetch", FETCH_PHASE_BUDGET, self.fetch_all(plan)).await;

        for (symbol, rebuild, result) in results {
            let samples = match result {
                Ok(samples) => samples,
                Err(e) => {
                    report.fetch_failed += 1;
                    Counters::add(&self.counters.fetch_failures, 1);
                    warn!(
                        symbol = %symbol,
                        kind = e.kind(),
                        retryable = e.is_retryable(),
                        error = %e,
                        "price refresh failed; keeping stale window"
                    );
                    continue;
                }
            };

            if samples.is_empty() {
                report.fetch_failed += 1;
                warn!(symbol = %symbol, "price refresh returned no data");
                continue;
            }
            report.refreshed += 1;

            if rebuild {
                let kept = self.cache.initialize(&symbol, samples);
                if self.cache.is_sufficient(&symbol) {
                    report.recovered += 1;
                    Counters::add(&self.counters.recoveries, 1);
                    info!(symbol = %symbol, kept, "window rebuilt from history");
                } else {
                    debug!(symbol = %symbol, kept, "window still short after rebuild");
                }
                continue;
            }

            for sample in samples {
                match self.cache.append_if_newer(&symbol, sample) {
                    AppendOutcome::Appended => report.appended += 1,
                    AppendOutcome::Stale => {}
                    AppendOutcome::Invalid => {
                        warn!(symbol = %symbol, price = sample.price, "dropping unusable price");
                    }
                }
            }
        }
    }

    /// Fetches every instrument in `plan` concurrently. `true` in the plan
    /// requests a full history, `false` an incremental refresh. Results come
    /// back in plan order.
    async fn fetch_all(&self, plan: Vec<(String, bool)>) -> Vec<FetchResult> {
        let fetch_timeout = self.cfg.fetch_timeout;

        let calls = plan.into_iter().map(|(symbol, full)| {
            let source = Arc::clone(&self.source);
            let limit = if full {
                self.cfg.initial_fetch_limit
            } else {
                self.cfg.refresh_fetch_limit
            };
            async move {
                let result = match timeout(fetch_timeout, source.fetch_klines(&symbol, limit)).await {
                    Ok(r) => r,
                    Err(_) => Err(SourceError::Timeout(fetch_timeout)),
                };
                (symbol, full, result)
            }
        });

        join_all(calls).await
    }

    /// Step 2: gate, snapshot, Z, threshold for every pair.
    fn evaluate_pairs(&self, now_ms: u64, report: &mut CycleReport) {
        let cooldown_ms = self.cfg.cooldown_ms();

        // one consistent view of the cache for the whole pass
        let snapshots: HashMap<&str, Option<Vec<PriceSample>>> = self
            .cfg
            .instruments
            .iter()
            .map(|s| (s.as_str(), self.cache.snapshot(s)))
            .collect();

        for pair in &self.pairs {
            let pair_id = pair.id();

            if !gate::should_fire(&pair_id, now_ms, cooldown_ms, &self.alerts) {
                report.skipped_cooldown += 1;
                debug!(
                    pair = %pair_id,
                    remaining_ms = ?gate::cooldown_remaining_ms(&pair_id, now_ms, cooldown_ms, &self.alerts),
                    "pair in cooldown"
                );
                continue;
            }

            let (Some(Some(a)), Some(Some(b))) = (
                snapshots.get(pair.base.as_str()),
                snapshots.get(pair.quote.as_str()),
            ) else {
                report.skipped_insufficient += 1;
                debug!(pair = %pair_id, reason = "insufficient", "pair skipped");
                continue;
            };

            let z = match pair_z(a, b, self.cfg.rolling_period, self.cfg.align_mode) {
                Ok(z) => z,
                Err(e) => {
                    match e {
                        SpreadError::DegenerateVariance { .. } => report.skipped_degenerate += 1,
                        SpreadError::Insufficient { .. } | SpreadError::NonPositivePrice => {
                            report.skipped_insufficient += 1
                        }
                    }
                    debug!(pair = %pair_id, reason = e.reason(), error = %e, "pair skipped");
                    continue;
                }
            };
            report.pairs_evaluated += 1;

            if z.abs() >= self.cfg.z_threshold {
                info!(pair = %pair_id, z, threshold = self.cfg.z_threshold, "divergence detected");
                report.alerts.push(Alert::new(&pair.base, &pair.quote, z));
            } else {
                debug!(pair = %pair_id, z, "within threshold");
            }
        }

        Counters::add(&self.counters.skip_cooldown, report.skipped_cooldown);
        Counters::add(&self.counters.skip_insufficient, report.skipped_insufficient);
        Counters::add(&self.counters.skip_degenerate, report.skipped_degenerate);
    }

    /// Step 3: one batched message, then cooldowns for every alert in it.
    ///
    /// Alerts that do not fit into one message are dropped from the report
    /// without a cooldown, so they qualify again on the next cycle.
    async fn dispatch(&mut self, now_ms: u64, report: &mut CycleReport) {
        if report.alerts.is_empty() {
            return;
        }

        let at = DateTime::<Utc>::from_timestamp_millis(now_ms as i64).unwrap_or_else(Utc::now);
        let rendered = render_batch(&report.alerts, at);
        if !rendered.is_complete(report.alerts.len()) {
            report.deferred = report.alerts.len() - rendered.included;
            report.alerts.truncate(rendered.included);
            warn!(
                sent = rendered.included,
                deferred = report.deferred,
                "alert batch exceeds one message; remainder deferred to next cycle"
            );
            if report.alerts.is_empty() {
                return;
            }
        }

        let delivered =
            warn_if_slow("dispatch", DISPATCH_BUDGET, self.sink.dispatch(&rendered.text, true)).await;

        report.dispatch = match delivered {
            Ok(()) => {
                Counters::add(&self.counters.batches_delivered, 1);
                info!(sink = self.sink.name(), alerts = report.alerts.len(), "alert batch delivered");
                DispatchOutcome::Delivered
            }
            Err(e) => {
                Counters::add(&self.counters.delivery_failures, 1);
                warn!(sink = self.sink.name(), error = %e, "alert delivery failed; cooldown still applied");
                DispatchOutcome::Failed(e.to_string())
            }
        };

        for alert in &report.alerts {
            gate::record(&alert.pair_id(), now_ms, &mut self.alerts);
        }
        Counters::add(&self.counters.alerts_fired, report.alerts.len());
    }

    /// Warms up, then cycles on a fixed tick until `shutdown` turns `true`
    /// (or its sender is dropped). A running cycle always completes first.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        if *shutdown.borrow() {
            return;
        }
        self.warm_up().await;

        let mut ticker = interval(self.cfg.cycle_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            every_ms = self.cfg.cycle_interval.as_millis() as u64,
            threshold = self.cfg.z_threshold,
            cooldown_s = self.cfg.cooldown.as_secs(),
            align = %self.cfg.align_mode,
            "monitor loop started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            }

            self.run_cycle(now_ms()).await;

            if *shutdown.borrow() {
                break;
            }
        }

        info!(cycles = self.cycle, "monitor loop stopped");
    }
}
