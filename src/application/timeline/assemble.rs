//! Candidate checks shared by the home and public read paths.

use metrics::counter;
use tracing::{trace, warn};

use crate::application::context::FeedContext;
use crate::application::feed::FeedServices;
use crate::application::pagination::{Boundary, Order, Page};
use crate::application::prepare::{PrepareError, PreparedStatus, StatusView};
use crate::domain::entities::AccountRecord;
use crate::domain::types::FilterContext;

use super::TimelineError;

/// Who a page is assembled for.
#[derive(Debug, Clone, Copy)]
pub(super) enum Audience<'a> {
    Home(&'a AccountRecord),
    Public(Option<&'a AccountRecord>),
}

impl<'a> Audience<'a> {
    fn viewer(self) -> Option<&'a AccountRecord> {
        match self {
            Audience::Home(owner) => Some(owner),
            Audience::Public(viewer) => viewer,
        }
    }

    fn filter_context(self) -> FilterContext {
        match self {
            Audience::Home(_) => FilterContext::Home,
            Audience::Public(_) => FilterContext::Public,
        }
    }

    pub(super) fn label(self) -> &'static str {
        match self {
            Audience::Home(_) => "home",
            Audience::Public(_) => "public",
        }
    }
}

/// Run the feed checks on one prepared candidate. `None` means the candidate is dropped; warn
/// filter matches are attached to the returned view.
pub(super) async fn accept(
    services: &FeedServices,
    ctx: &FeedContext,
    audience: Audience<'_>,
    prepared: &PreparedStatus,
) -> Result<Option<StatusView>, TimelineError> {
    ctx.check()?;
    let status = &prepared.status;

    let timelineable = match audience {
        Audience::Home(owner) => {
            services
                .visibility
                .status_home_timelineable(ctx, owner, status)
                .await?
        }
        Audience::Public(viewer) => {
            services
                .visibility
                .status_public_timelineable(ctx, viewer, status)
                .await?
        }
    };
    if !timelineable {
        dropped(audience, &status.id, "not_timelineable");
        return Ok(None);
    }

    if services
        .mutes
        .status_muted(ctx, audience.viewer(), status)
        .await?
    {
        dropped(audience, &status.id, "muted");
        return Ok(None);
    }

    let (filtered, hidden) = services
        .filters
        .results_in_context(ctx, audience.viewer(), status, audience.filter_context())
        .await?;
    if hidden {
        dropped(audience, &status.id, "filtered");
        return Ok(None);
    }

    let mut view = prepared.view.clone();
    view.filtered = filtered;
    Ok(Some(view))
}

pub(super) fn skip_unprepared(audience: Audience<'_>, item_id: &str, err: &PrepareError) {
    warn!(item_id, error = %err, "skipping status that could not be prepared");
    counter!(
        "feedline_timeline_items_filtered_total",
        "timeline" => audience.label(),
        "reason" => "malformed"
    )
    .increment(1);
}

fn dropped(audience: Audience<'_>, item_id: &str, reason: &'static str) {
    trace!(item_id, reason, "candidate dropped");
    counter!(
        "feedline_timeline_items_filtered_total",
        "timeline" => audience.label(),
        "reason" => reason
    )
    .increment(1);
}

/// Move the walk past `last_id` in the window's direction.
pub(super) fn advance(window: &mut Page, last_id: &str) {
    match window.order() {
        Order::Descending => window.max = Some(Boundary::max_id(last_id)),
        Order::Ascending => window.min = Some(Boundary::min_id(last_id)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_follows_walk_direction() {
        let mut down = Page::top(20).normalized();
        advance(&mut down, "05");
        assert_eq!(down.max_value(), "05");
        assert_eq!(down.order(), Order::Descending);

        let mut refresh = Page::since("01", 20).normalized();
        advance(&mut refresh, "05");
        assert_eq!(refresh.min_value(), "01");
        assert_eq!(refresh.max_value(), "05");

        let mut up = Page::newer_than("01", 20).normalized();
        advance(&mut up, "05");
        assert_eq!(up.min_value(), "05");
        assert_eq!(up.order(), Order::Ascending);
    }
}
