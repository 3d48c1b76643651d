//! Run reporting: a tick callback that logs finished routes and a
//! periodic territory census, and an ownership observer that counts
//! committed transfers.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use frontier_core::{SimulationState, TickCallback, TickSummary};
use frontier_types::{OwnershipChange, PathStatus};
use frontier_world::OwnershipObserver;
use tracing::{debug, info};

/// Counts ownership changes as the ledger commits them.
#[derive(Debug, Clone, Default)]
pub struct TransferCounter {
    transfers: Arc<AtomicU64>,
    changed_hands: Arc<AtomicU64>,
}

impl TransferCounter {
    /// Committed transfers, including same-owner ones.
    pub fn transfers(&self) -> u64 {
        self.transfers.load(Ordering::Relaxed)
    }

    /// Transfers where the owner actually changed.
    pub fn changed_hands(&self) -> u64 {
        self.changed_hands.load(Ordering::Relaxed)
    }
}

impl OwnershipObserver for TransferCounter {
    fn on_ownership_changed(&mut self, change: &OwnershipChange) {
        self.transfers.fetch_add(1, Ordering::Relaxed);
        if change.is_change() {
            self.changed_hands.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Logs each finished path request and, every `census_every` ticks, the
/// tile count of every player.
#[derive(Debug)]
pub struct ReportCallback {
    census_every: u64,
    found: u64,
    unreachable: u64,
    longest_route: usize,
}

impl ReportCallback {
    /// Create a reporter. A `census_every` of 0 disables the census.
    pub const fn new(census_every: u64) -> Self {
        Self {
            census_every,
            found: 0,
            unreachable: 0,
            longest_route: 0,
        }
    }

    /// Routes found so far.
    pub const fn found(&self) -> u64 {
        self.found
    }

    /// Requests that ended unreachable so far.
    pub const fn unreachable(&self) -> u64 {
        self.unreachable
    }

    /// Log the totals and the final territory census.
    pub fn log_totals(&self, state: &SimulationState) {
        info!(
            found = self.found,
            unreachable = self.unreachable,
            longest_route = self.longest_route,
            "Route totals"
        );
        log_census(state);
    }
}

impl TickCallback for ReportCallback {
    fn on_tick(&mut self, summary: &TickSummary, state: &SimulationState) {
        for completion in &summary.completions {
            match (&completion.status, &completion.path) {
                (PathStatus::Succeeded, Some(path)) => {
                    self.found = self.found.saturating_add(1);
                    self.longest_route = self.longest_route.max(path.len());
                    info!(
                        tick = summary.tick,
                        id = %completion.id,
                        length = path.len(),
                        expanded = completion.expanded,
                        "Route found"
                    );
                }
                _ => {
                    self.unreachable = self.unreachable.saturating_add(1);
                    info!(
                        tick = summary.tick,
                        id = %completion.id,
                        expanded = completion.expanded,
                        "Route unreachable"
                    );
                }
            }
        }

        if self.census_every > 0
            && summary.tick.checked_rem(self.census_every) == Some(0)
        {
            log_census(state);
        } else {
            debug!(tick = summary.tick, live = summary.live_requests, "Tick reported");
        }
    }
}

fn log_census(state: &SimulationState) {
    let ledger = state.ledger();
    for player in ledger.players() {
        info!(
            tick = state.clock().tick(),
            player = %player.id,
            name = %player.name,
            tiles = ledger.tile_count(player.owner()),
            "Territory census"
        );
    }
}
