use std::time::Instant;

use metrics::histogram;
use tracing::{debug, instrument};

use crate::application::context::FeedContext;
use crate::application::feed::FeedServices;
use crate::application::pagination::{Order, Page};
use crate::domain::entities::AccountRecord;

use super::assemble::{Audience, accept, advance, skip_unprepared};
use super::page::TimelinePage;
use super::{LOAD_HEADROOM, TimelineConfig, TimelineError};

/// The instance-wide public feed, read straight from storage.
#[derive(Clone)]
pub struct PublicTimeline {
    services: FeedServices,
    load_attempts: usize,
}

impl PublicTimeline {
    pub fn new(services: FeedServices, config: &TimelineConfig) -> Self {
        Self {
            services,
            load_attempts: config.load_attempts,
        }
    }

    #[instrument(
        skip(self, ctx, viewer, page),
        fields(viewer = viewer.map(|account| account.id.as_str()), page = %page)
    )]
    pub async fn get(
        &self,
        ctx: &FeedContext,
        viewer: Option<&AccountRecord>,
        page: Page,
        local_only: bool,
    ) -> Result<TimelinePage, TimelineError> {
        let started = Instant::now();
        ctx.check()?;

        let request = page.clone();
        let page = page.normalized();
        let limit = page.limit;
        let audience = Audience::Public(viewer);
        let mut items = Vec::with_capacity(limit);

        let mut window = page.clone();
        window.limit = limit + LOAD_HEADROOM;
        for attempt in 0..self.load_attempts {
            ctx.check()?;
            let loaded = self
                .services
                .statuses
                .load_public_page(&window, local_only)
                .await?;
            let Some(last) = loaded.last().map(|status| status.id.clone()) else {
                break;
            };
            let exhausted = loaded.len() < window.limit;
            debug!(attempt, loaded = loaded.len(), "loaded public candidates");

            for (id, result) in self.services.preparer.prepare_records(loaded).await? {
                if items.len() >= limit {
                    break;
                }
                match result {
                    Ok(prepared) => {
                        if let Some(view) = accept(&self.services, ctx, audience, &prepared).await?
                        {
                            items.push(view);
                        }
                    }
                    Err(err) => skip_unprepared(audience, &id, &err),
                }
            }

            advance(&mut window, &last);
            if items.len() >= limit || exhausted {
                break;
            }
        }

        if page.order() == Order::Ascending {
            items.reverse();
        }
        let result = TimelinePage::from_items(items, &request);
        histogram!("feedline_timeline_get_ms", "timeline" => audience.label())
            .record(started.elapsed().as_secs_f64() * 1000.0);
        Ok(result)
    }
}
