use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};
use uuid::Uuid;

use pitchpoint_types::events::ChangeEvent;
use pitchpoint_types::models::{Role, Table};

const CHANNEL_CAPACITY: usize = 1024;

/// Fans row changes out to every live subscription.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    /// Broadcast channel for change events. Every subscription sees every event
    broadcast_tx: broadcast::Sender<Arc<ChangeEvent>>,

    /// Live subscriptions, maintained by `Subscription`'s constructor and `Drop`
    active: AtomicUsize,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::with_capacity(CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (broadcast_tx, _) = broadcast::channel(capacity);
        Self {
            inner: Arc::new(DispatcherInner {
                broadcast_tx,
                active: AtomicUsize::new(0),
            }),
        }
    }

    /// Publish a row change. Having no listeners is not an error.
    pub fn publish(&self, event: ChangeEvent) {
        debug!("{} {:?}", event.table, event.event);
        let _ = self.inner.broadcast_tx.send(Arc::new(event));
    }

    /// Open a subscription scoped to the caller. It follows no tables until
    /// `follow` is called and is released when dropped.
    pub fn subscribe(&self, user_id: Uuid, role: Role) -> Subscription {
        self.inner.active.fetch_add(1, Ordering::Relaxed);
        Subscription {
            rx: self.inner.broadcast_tx.subscribe(),
            tables: BTreeSet::new(),
            user_id,
            role,
            dispatcher: self.inner.clone(),
        }
    }

    pub fn active_subscriptions(&self) -> usize {
        self.inner.active.load(Ordering::Relaxed)
    }
}

/// What a subscription yields next.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    Change(Arc<ChangeEvent>),
    /// Events were dropped because this subscriber fell behind. The listed
    /// tables must be re-fetched in full.
    Resync(Vec<Table>),
    Closed,
}

/// One listener's view of the change feed.
pub struct Subscription {
    rx: broadcast::Receiver<Arc<ChangeEvent>>,
    tables: BTreeSet<Table>,
    user_id: Uuid,
    role: Role,
    dispatcher: Arc<DispatcherInner>,
}

impl Subscription {
    /// Start following tables. Returns the full set now followed; tables the
    /// role may not see are left out.
    pub fn follow(&mut self, tables: &[Table]) -> Vec<Table> {
        for table in tables {
            if self.role.can_subscribe(*table) {
                self.tables.insert(*table);
            } else {
                warn!("{} ({}) may not follow {}", self.user_id, self.role, table);
            }
        }
        self.tables()
    }

    pub fn unfollow(&mut self, tables: &[Table]) -> Vec<Table> {
        for table in tables {
            self.tables.remove(table);
        }
        self.tables()
    }

    pub fn tables(&self) -> Vec<Table> {
        self.tables.iter().copied().collect()
    }

    fn wants(&self, event: &ChangeEvent) -> bool {
        if !self.tables.contains(&event.table) {
            return false;
        }
        if self.role == Role::Admin {
            return true;
        }
        match event.participants() {
            Some(ids) => ids.contains(&self.user_id),
            None => true,
        }
    }

    /// Wait for the next event this subscriber should see.
    pub async fn recv(&mut self) -> Delivery {
        loop {
            match self.rx.recv().await {
                Ok(event) => {
                    if self.wants(&event) {
                        return Delivery::Change(event);
                    }
                }
                Err(RecvError::Lagged(n)) => {
                    warn!("Subscriber {} lagged by {} events", self.user_id, n);
                    if !self.tables.is_empty() {
                        return Delivery::Resync(self.tables());
                    }
                }
                Err(RecvError::Closed) => return Delivery::Closed,
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.dispatcher.active.fetch_sub(1, Ordering::Relaxed);
        debug!("Subscription for {} released", self.user_id);
    }
}
