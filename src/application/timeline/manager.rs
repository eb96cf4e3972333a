use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use metrics::{counter, gauge, histogram};
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use crate::application::context::FeedContext;
use crate::application::feed::FeedServices;
use crate::application::pagination::{Order, Page};
use crate::application::prepare::{PrepareError, PreparedStatus};
use crate::application::repos::optional;
use crate::domain::entities::StatusRecord;
use crate::domain::ids::{MAX_ID, MIN_ID};

use super::assemble::{Audience, accept, advance, skip_unprepared};
use super::entry::TimelineEntry;
use super::index::TimelineIndex;
use super::page::TimelinePage;
use super::{LOAD_HEADROOM, TimelineConfig, TimelineError};

struct TimelineState {
    index: TimelineIndex,
    last_read: Instant,
}

/// One account's home timeline.
pub struct Timeline {
    account_id: String,
    state: Mutex<TimelineState>,
}

impl Timeline {
    fn new(account_id: &str) -> Self {
        Self {
            account_id: account_id.to_string(),
            state: Mutex::new(TimelineState {
                index: TimelineIndex::new(),
                last_read: Instant::now(),
            }),
        }
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub async fn ingest(
        &self,
        entry: TimelineEntry,
        prepared: Option<PreparedStatus>,
        boost_depth: usize,
    ) -> bool {
        self.state
            .lock()
            .await
            .index
            .insert(entry, prepared, boost_depth)
    }

    pub async fn unprepare(&self, item_id: &str) -> usize {
        self.state.lock().await.index.unprepare(item_id)
    }

    pub async fn unprepare_by_account(&self, account_id: &str) -> usize {
        self.state.lock().await.index.unprepare_by_account(account_id)
    }

    pub async fn unprepare_all(&self) -> usize {
        self.state.lock().await.index.unprepare_all()
    }

    pub async fn remove(&self, item_id: &str) -> usize {
        self.state.lock().await.index.remove(item_id)
    }

    pub async fn remove_all_by_or_boosting(&self, account_id: &str) -> usize {
        self.state
            .lock()
            .await
            .index
            .remove_all_by_or_boosting(account_id)
    }

    pub async fn prune(&self, prepared_len: usize, indexed_len: usize) -> usize {
        self.state.lock().await.index.prune(prepared_len, indexed_len)
    }

    pub async fn indexed_len(&self) -> usize {
        self.state.lock().await.index.len()
    }

    pub async fn prepared_len(&self) -> usize {
        self.state.lock().await.index.prepared_len()
    }

    pub async fn oldest_indexed_id(&self) -> Option<String> {
        self.state
            .lock()
            .await
            .index
            .oldest_id()
            .map(str::to_string)
    }

    /// Prune when the last read is at least `idle` before `now`; `None` when still active.
    pub(super) async fn prune_if_idle(
        &self,
        now: Instant,
        idle: Duration,
        prepared_len: usize,
        indexed_len: usize,
    ) -> Option<usize> {
        let mut state = self.state.lock().await;
        if now.saturating_duration_since(state.last_read) < idle {
            return None;
        }
        Some(state.index.prune(prepared_len, indexed_len))
    }
}

/// Registry of per-account home timelines.
pub struct TimelineManager {
    timelines: DashMap<String, Arc<Timeline>>,
    services: FeedServices,
    config: TimelineConfig,
}

impl TimelineManager {
    pub fn new(services: FeedServices, config: TimelineConfig) -> Self {
        Self {
            timelines: DashMap::new(),
            services,
            config,
        }
    }

    pub fn config(&self) -> &TimelineConfig {
        &self.config
    }

    pub fn services(&self) -> &FeedServices {
        &self.services
    }

    /// Number of timelines held in memory.
    pub fn len(&self) -> usize {
        self.timelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timelines.is_empty()
    }

    pub fn existing(&self, account_id: &str) -> Option<Arc<Timeline>> {
        self.timelines
            .get(account_id)
            .map(|timeline| Arc::clone(timeline.value()))
    }

    fn timeline(&self, account_id: &str) -> Arc<Timeline> {
        if let Some(timeline) = self.existing(account_id) {
            return timeline;
        }
        let timeline = Arc::clone(
            self.timelines
                .entry(account_id.to_string())
                .or_insert_with(|| Arc::new(Timeline::new(account_id)))
                .value(),
        );
        gauge!("feedline_timelines_active").set(self.timelines.len() as f64);
        timeline
    }

    /// Handles to every timeline, taken without holding map guards across awaits.
    pub(super) fn snapshot(&self) -> Vec<Arc<Timeline>> {
        self.timelines
            .iter()
            .map(|timeline| Arc::clone(timeline.value()))
            .collect()
    }

    /// Index `status` into `account_id`'s timeline. Returns `false` when it was deduplicated.
    pub async fn ingest_one(
        &self,
        account_id: &str,
        status: &StatusRecord,
    ) -> Result<bool, TimelineError> {
        let inserted = self
            .timeline(account_id)
            .ingest(
                TimelineEntry::from(status),
                None,
                self.config.boost_reinsertion_depth,
            )
            .await;
        record_ingest(account_id, &status.id, inserted);
        Ok(inserted)
    }

    /// Like [`ingest_one`](Self::ingest_one), but prepares the status up front.
    pub async fn ingest_and_prepare(
        &self,
        ctx: &FeedContext,
        account_id: &str,
        status: &StatusRecord,
    ) -> Result<bool, TimelineError> {
        ctx.check()?;
        let prepared = match self.services.preparer.prepare(status.clone()).await {
            Ok(prepared) => Some(prepared),
            Err(PrepareError::Repo(err)) => return Err(err.into()),
            Err(err @ PrepareError::Domain(_)) => {
                warn!(account_id, item_id = %status.id, error = %err, "ingesting unprepared status");
                None
            }
        };
        let inserted = self
            .timeline(account_id)
            .ingest(
                TimelineEntry::from(status),
                prepared,
                self.config.boost_reinsertion_depth,
            )
            .await;
        record_ingest(account_id, &status.id, inserted);
        Ok(inserted)
    }

    /// Assemble one page of `account_id`'s home timeline.
    #[instrument(skip(self, ctx, page), fields(account_id = %account_id, page = %page))]
    pub async fn get(
        &self,
        ctx: &FeedContext,
        account_id: &str,
        page: Page,
    ) -> Result<TimelinePage, TimelineError> {
        let started = Instant::now();
        ctx.check()?;

        let Some(owner) = optional(self.services.accounts.get_account(account_id).await)? else {
            debug!("timeline owner not stored");
            return Ok(TimelinePage::empty());
        };

        let timeline = self.timeline(account_id);
        let mut state = timeline.state.lock().await;
        state.last_read = Instant::now();

        let request = page.clone();
        let page = page.normalized();
        let limit = page.limit;
        let audience = Audience::Home(&owner);
        let mut items = Vec::with_capacity(limit);

        // Only the covered part of the index is walked; below the floor, storage fills in.
        let floor = state.index.covered_from().map(str::to_string);
        let mut window = page.clone();
        let mut needs_storage = true;
        if let Some(floor) = floor.as_deref() {
            let ids: Vec<String> = match page.order() {
                Order::Descending if page.max_value() > floor => state
                    .index
                    .ids_in(&page)
                    .into_iter()
                    .take_while(|id| id.as_str() >= floor)
                    .collect(),
                Order::Ascending if page.min_value() >= floor => state.index.ids_in(&page),
                _ => Vec::new(),
            };
            for chunk in ids.chunks(limit.max(1)) {
                self.prepare_missing(&mut state.index, audience, chunk).await?;
                for id in chunk {
                    if items.len() >= limit {
                        break;
                    }
                    let Some(prepared) = state
                        .index
                        .get(id)
                        .and_then(|indexed| indexed.prepared.clone())
                    else {
                        continue;
                    };
                    if let Some(view) = accept(&self.services, ctx, audience, &prepared).await? {
                        items.push(view);
                    }
                }
                if items.len() >= limit {
                    break;
                }
            }

            needs_storage = page.min_value() < floor;
            if needs_storage && page.order() == Order::Descending && page.max_value() > floor {
                advance(&mut window, floor);
            }
        }

        if needs_storage && items.len() < limit {
            window.limit = limit + LOAD_HEADROOM;
            for attempt in 0..self.config.load_attempts {
                ctx.check()?;
                let loaded = self
                    .services
                    .statuses
                    .load_home_page(account_id, &window)
                    .await?;
                let exhausted = loaded.len() < window.limit;
                let connected =
                    connected_floor(state.index.covered_from(), &window, &loaded, exhausted);
                let Some(last) = loaded.last().map(|status| status.id.clone()) else {
                    if let Some(reached) = connected {
                        state.index.extend_coverage(&reached);
                    }
                    break;
                };
                debug!(
                    attempt,
                    loaded = loaded.len(),
                    merged = connected.is_some(),
                    "backfilling timeline from storage"
                );

                // Rows that do not reach the covered range would leave a hole, so they only serve
                // this page.
                if let Some(reached) = &connected {
                    for status in &loaded {
                        state.index.insert_loaded(TimelineEntry::from(status));
                    }
                    state.index.extend_coverage(reached);
                }
                for (id, result) in self.services.preparer.prepare_records(loaded).await? {
                    let prepared = match result {
                        Ok(prepared) => prepared,
                        Err(err) => {
                            skip_unprepared(audience, &id, &err);
                            continue;
                        }
                    };
                    state.index.set_prepared(&id, prepared.clone());
                    if items.len() >= limit {
                        continue;
                    }
                    if let Some(view) = accept(&self.services, ctx, audience, &prepared).await? {
                        items.push(view);
                    }
                }

                advance(&mut window, &last);
                if items.len() >= limit || exhausted {
                    break;
                }
            }
        }
        drop(state);

        if page.order() == Order::Ascending {
            items.reverse();
        }
        let result = TimelinePage::from_items(items, &request);
        histogram!("feedline_timeline_get_ms", "timeline" => audience.label())
            .record(started.elapsed().as_secs_f64() * 1000.0);
        debug!(returned = result.items.len(), "timeline page assembled");
        Ok(result)
    }

    /// Prepare entries of `ids` that have no view yet. Entries whose status is gone are removed.
    async fn prepare_missing(
        &self,
        index: &mut TimelineIndex,
        audience: Audience<'_>,
        ids: &[String],
    ) -> Result<(), TimelineError> {
        let missing: Vec<String> = ids
            .iter()
            .filter(|id| index.get(id).is_some_and(|indexed| indexed.prepared.is_none()))
            .cloned()
            .collect();
        if missing.is_empty() {
            return Ok(());
        }

        let mut found = HashSet::with_capacity(missing.len());
        for (id, result) in self.services.preparer.prepare_batch(&missing).await? {
            match result {
                Ok(prepared) => {
                    index.set_prepared(&id, prepared);
                }
                Err(err) => skip_unprepared(audience, &id, &err),
            }
            found.insert(id);
        }
        for id in missing.iter().filter(|id| !found.contains(*id)) {
            debug!(item_id = %id, "dropping entry for status no longer stored");
            index.remove(id);
        }
        Ok(())
    }

    pub async fn unprepare(&self, account_id: &str, item_id: &str) -> usize {
        match self.existing(account_id) {
            Some(timeline) => timeline.unprepare(item_id).await,
            None => 0,
        }
    }

    pub async fn unprepare_by_account(&self, account_id: &str, target_account_id: &str) -> usize {
        match self.existing(account_id) {
            Some(timeline) => timeline.unprepare_by_account(target_account_id).await,
            None => 0,
        }
    }

    pub async fn unprepare_all(&self, account_id: &str) -> usize {
        match self.existing(account_id) {
            Some(timeline) => timeline.unprepare_all().await,
            None => 0,
        }
    }

    pub async fn remove(&self, account_id: &str, item_id: &str) -> usize {
        match self.existing(account_id) {
            Some(timeline) => timeline.remove(item_id).await,
            None => 0,
        }
    }

    /// Drop everything by or boosting `target_account_id` from `account_id`'s timeline, e.g.
    /// after a block or mute. Decisions cached for `account_id` are forgotten too.
    pub async fn remove_all_by_or_boosting(
        &self,
        account_id: &str,
        target_account_id: &str,
    ) -> usize {
        self.services.invalidate_requester(account_id);
        match self.existing(account_id) {
            Some(timeline) => timeline.remove_all_by_or_boosting(target_account_id).await,
            None => 0,
        }
    }

    pub async fn prune(&self, account_id: &str, prepared_len: usize, indexed_len: usize) -> usize {
        let pruned = match self.existing(account_id) {
            Some(timeline) => timeline.prune(prepared_len, indexed_len).await,
            None => 0,
        };
        counter!("feedline_timeline_pruned_total").increment(pruned as u64);
        pruned
    }

    pub async fn get_indexed_len(&self, account_id: &str) -> usize {
        match self.existing(account_id) {
            Some(timeline) => timeline.indexed_len().await,
            None => 0,
        }
    }

    pub async fn get_oldest_indexed_id(&self, account_id: &str) -> Option<String> {
        match self.existing(account_id) {
            Some(timeline) => timeline.oldest_indexed_id().await,
            None => None,
        }
    }

    /// Forget `account_id`'s timeline entirely.
    pub fn remove_timeline(&self, account_id: &str) -> bool {
        let removed = self.timelines.remove(account_id).is_some();
        gauge!("feedline_timelines_active").set(self.timelines.len() as f64);
        removed
    }

    /// Remove `item_id` and boosts of it from every timeline.
    #[instrument(skip(self))]
    pub async fn wipe_item_from_all(&self, item_id: &str) -> usize {
        self.services.invalidate_status(item_id);
        let mut removed = 0;
        for timeline in self.snapshot() {
            removed += timeline.remove(item_id).await;
        }
        debug!(removed, "wiped item from timelines");
        removed
    }

    #[instrument(skip(self))]
    pub async fn wipe_items_by_account_from_all(&self, account_id: &str) -> usize {
        let mut removed = 0;
        for timeline in self.snapshot() {
            removed += timeline.remove_all_by_or_boosting(account_id).await;
        }
        debug!(removed, "wiped account items from timelines");
        removed
    }

    /// Drop prepared views of `item_id` everywhere, e.g. after an edit.
    #[instrument(skip(self))]
    pub async fn unprepare_item_from_all(&self, item_id: &str) -> usize {
        self.services.invalidate_status(item_id);
        let mut unprepared = 0;
        for timeline in self.snapshot() {
            unprepared += timeline.unprepare(item_id).await;
        }
        unprepared
    }

    /// Drop prepared views by or boosting `account_id` everywhere, e.g. after a profile update.
    #[instrument(skip(self))]
    pub async fn unprepare_account_from_all(&self, account_id: &str) -> usize {
        let mut unprepared = 0;
        for timeline in self.snapshot() {
            unprepared += timeline.unprepare_by_account(account_id).await;
        }
        unprepared
    }
}

/// The new covered floor when a storage batch for `window` reaches the covered top of the index,
/// or `None` when merging it would leave a gap.
fn connected_floor(
    covered: Option<&str>,
    window: &Page,
    loaded: &[StatusRecord],
    exhausted: bool,
) -> Option<String> {
    let (lowest, highest) = match window.order() {
        Order::Descending => (loaded.last(), loaded.first()),
        Order::Ascending => (loaded.first(), loaded.last()),
    };

    let span_top = if exhausted || window.order() == Order::Descending {
        window.max_value()
    } else {
        highest?.id.as_str()
    };
    let connects = match covered {
        Some(floor) => span_top >= floor,
        None => span_top == MAX_ID,
    };
    if !connects {
        return None;
    }

    let from_bottom = exhausted || window.order() == Order::Ascending;
    if from_bottom && window.min_value() == MIN_ID {
        return Some(MIN_ID.to_string());
    }
    lowest.map(|status| status.id.clone())
}

fn record_ingest(account_id: &str, item_id: &str, inserted: bool) {
    let result = if inserted { "inserted" } else { "skipped" };
    debug!(account_id, item_id, result, "timeline ingest");
    counter!("feedline_timeline_ingest_total", "result" => result).increment(1);
}
