//! Live dashboard mirror
//!
//! Keeps a dashboard snapshot for one user current. Every matching
//! `ProfileEvent` triggers a full re-read, so duplicate or reordered events
//! converge on the stored state.

use shared_bus::{EventFilter, EventSubscriber, Subscription};
use shared_types::UserId;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::DashboardView;
use crate::error::DashboardError;
use crate::ports::DashboardApi;

pub struct DashboardMirror<A: DashboardApi> {
    api: Arc<A>,
    user: UserId,
    snapshot: watch::Sender<Option<DashboardView>>,
}

impl<A: DashboardApi + 'static> DashboardMirror<A> {
    pub fn new(api: Arc<A>, user: UserId) -> Self {
        let (snapshot, _) = watch::channel(None);
        Self {
            api,
            user,
            snapshot,
        }
    }

    /// Receiver of the latest snapshot. `None` until the first read succeeds.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<Option<DashboardView>> {
        self.snapshot.subscribe()
    }

    /// Events that can change this user's dashboard.
    #[must_use]
    pub fn filter(&self) -> EventFilter {
        EventFilter::for_user(self.user)
    }

    /// Re-read the dashboard and replace the snapshot.
    ///
    /// On failure the previous snapshot stays in place.
    pub async fn refresh(&self) -> Result<(), DashboardError> {
        let view = self.api.dashboard(&self.user).await?;
        self.snapshot.send_replace(Some(view));
        Ok(())
    }

    /// Load once, then refresh on every event until the bus closes.
    pub async fn run(self, mut subscription: Subscription) {
        if let Err(e) = self.refresh().await {
            warn!(user = %self.user, error = %e, "Initial dashboard load failed");
        }

        while let Some(event) = subscription.recv().await {
            debug!(user = %self.user, ?event, "Profile change observed");
            if let Err(e) = self.refresh().await {
                warn!(user = %self.user, error = %e, "Dashboard refresh failed");
            }
        }

        info!(user = %self.user, "Event bus closed, mirror stopped");
    }

    /// Subscribe on `bus` and run the mirror on the current tokio runtime.
    ///
    /// The subscription is taken before this returns, so no event published
    /// afterwards is missed.
    pub fn spawn<B: EventSubscriber + ?Sized>(
        self,
        bus: &B,
    ) -> (watch::Receiver<Option<DashboardView>>, JoinHandle<()>) {
        let subscription = bus.subscribe(self.filter());
        let receiver = self.watch();
        let handle = tokio::spawn(self.run(subscription));
        (receiver, handle)
    }
}
