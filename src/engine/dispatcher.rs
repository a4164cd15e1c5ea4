use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::trace;

use super::Notification;

/// Producer side of one worker lane
#[derive(Debug)]
struct Lane {
    sender: mpsc::UnboundedSender<Notification>,
    /// Notifications enqueued and not yet taken by the worker
    depth: Arc<AtomicUsize>,
}

/// Consumer side of one worker lane, handed to its worker
#[derive(Debug)]
pub(crate) struct LaneReceiver {
    pub(crate) index: usize,
    pub(crate) receiver: mpsc::UnboundedReceiver<Notification>,
    pub(crate) depth: Arc<AtomicUsize>,
}

/// Routes notifications to the least loaded lane.
///
/// Runs on the thread delivering cache events, so it never blocks: lanes are
/// unbounded and lanes whose worker is gone are skipped.
#[derive(Debug)]
pub struct Dispatcher {
    lanes: Vec<Lane>,
}

impl Dispatcher {
    /// Creates `pool_size` lanes (at least one).
    pub(crate) fn new(pool_size: usize) -> (Self, Vec<LaneReceiver>) {
        let (lanes, receivers): (Vec<Lane>, Vec<LaneReceiver>) = (0..pool_size.max(1))
            .map(|index| {
                let (sender, receiver) = mpsc::unbounded_channel();
                let depth = Arc::new(AtomicUsize::new(0));
                (
                    Lane {
                        sender,
                        depth: depth.clone(),
                    },
                    LaneReceiver {
                        index,
                        receiver,
                        depth,
                    },
                )
            })
            .unzip();
        (Self { lanes }, receivers)
    }

    /// Index of the open lane with the fewest queued notifications, lowest
    /// index on ties. `None` once every lane is closed.
    pub fn select_lane(&self) -> Option<usize> {
        let mut selected = None;
        let mut min = usize::MAX;
        for (index, lane) in self.lanes.iter().enumerate() {
            if lane.sender.is_closed() {
                continue;
            }
            let depth = lane.depth.load(Ordering::Acquire);
            if depth < min {
                min = depth;
                selected = Some(index);
            }
        }
        selected
    }

    /// Enqueues `notification`. Returns false once every lane is closed.
    pub fn submit(
        &self,
        mut notification: Notification,
    ) -> bool {
        while let Some(index) = self.select_lane() {
            let lane = &self.lanes[index];
            lane.depth.fetch_add(1, Ordering::AcqRel);
            match lane.sender.send(notification) {
                Ok(()) => return true,
                Err(mpsc::error::SendError(dropped)) => {
                    // worker went away after selection, try the next open lane
                    lane.depth.fetch_sub(1, Ordering::AcqRel);
                    trace!(
                        lane = index,
                        primary_cache = %dropped.primary_cache_name,
                        "Lane closed, rerouting notification"
                    );
                    notification = dropped;
                }
            }
        }
        trace!(
            primary_cache = %notification.primary_cache_name,
            "All lanes closed, dropping notification"
        );
        false
    }

    /// Aggregate depth across all lanes
    pub fn queue_size(&self) -> usize {
        self.lanes.iter().map(|lane| lane.depth.load(Ordering::Acquire)).sum()
    }

    pub fn lane_depths(&self) -> Vec<usize> {
        self.lanes.iter().map(|lane| lane.depth.load(Ordering::Acquire)).collect()
    }

    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }

    pub(crate) fn depth_counters(&self) -> Vec<Arc<AtomicUsize>> {
        self.lanes.iter().map(|lane| lane.depth.clone()).collect()
    }
}
