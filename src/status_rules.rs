//! Order status progression rules.
//!
//! The auto-updater asks [`next_status`] what an open order should become,
//! given how long it has sat in its current status and which external signals
//! arrived since it got there. The answer is at most one step forward.

use chrono::TimeDelta;

use crate::models::{Order, OrderStatus};

/// Minimum time an order stays in a status before it advances on time alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusThresholds {
    pub pending: TimeDelta,
    pub processing: TimeDelta,
    pub shipped: TimeDelta,
}

impl StatusThresholds {
    pub fn from_hours(pending: i64, processing: i64, shipped: i64) -> Self {
        Self {
            pending: TimeDelta::hours(pending),
            processing: TimeDelta::hours(processing),
            shipped: TimeDelta::hours(shipped),
        }
    }

    /// Like [`Self::from_hours`], but every threshold must be at least one hour.
    pub fn try_from_hours(pending: i64, processing: i64, shipped: i64) -> anyhow::Result<Self> {
        for (name, hours) in [
            ("ORDER_PENDING_HOURS", pending),
            ("ORDER_PROCESSING_HOURS", processing),
            ("ORDER_SHIPPED_HOURS", shipped),
        ] {
            if hours < 1 {
                anyhow::bail!("{name} must be at least 1 hour, got {hours}");
            }
        }
        Ok(Self::from_hours(pending, processing, shipped))
    }

    fn for_status(&self, status: OrderStatus) -> Option<TimeDelta> {
        match status {
            OrderStatus::Pending => Some(self.pending),
            OrderStatus::Processing => Some(self.processing),
            OrderStatus::Shipped => Some(self.shipped),
            OrderStatus::Delivered | OrderStatus::Cancelled => None,
        }
    }
}

impl Default for StatusThresholds {
    fn default() -> Self {
        Self::from_hours(24, 48, 72)
    }
}

/// External events observed while the order sat in its current status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrderSignals {
    pub payment_recorded: bool,
    pub tracking_assigned: bool,
}

impl OrderSignals {
    /// Signals older than the last status change were already consumed by an
    /// earlier step and do not count again.
    pub fn observed(order: &Order) -> Self {
        let since = order.status_changed_at;
        Self {
            payment_recorded: order.paid_at.is_some_and(|at| at >= since),
            tracking_assigned: order.tracking_assigned_at.is_some_and(|at| at >= since),
        }
    }
}

/// One-step progression rule. Terminal statuses never move.
pub fn next_status(
    current: OrderStatus,
    elapsed: TimeDelta,
    signals: OrderSignals,
    thresholds: &StatusThresholds,
) -> Option<OrderStatus> {
    let threshold = thresholds.for_status(current)?;
    let signalled = match current {
        OrderStatus::Pending => signals.payment_recorded,
        OrderStatus::Processing => signals.tracking_assigned,
        _ => false,
    };

    if signalled || elapsed >= threshold {
        current.next()
    } else {
        None
    }
}

/// Manual transitions: any forward move, or cancellation of an open order.
pub fn can_transition(from: OrderStatus, to: OrderStatus) -> bool {
    if from.is_terminal() || from == to {
        return false;
    }
    match (from.rank(), to.rank()) {
        (_, None) => true,
        (Some(from), Some(to)) => to > from,
        (None, Some(_)) => false,
    }
}
