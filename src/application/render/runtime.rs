use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::{DashMap, mapref::entry::Entry};

use crate::application::document::DocumentError;
use crate::domain::{mount::MountId, types::RenderState};

/// Per-mount render bookkeeping.
///
/// Every render takes a ticket carrying a sequence number. Only the holder of
/// the most recent ticket for a mount may write its final output; older
/// completions are dropped. Writes into the document happen while the mount's
/// slot is locked, so a stale render can never interleave with a newer one.
#[derive(Default, Clone)]
pub struct MountSlots {
    slots: Arc<DashMap<MountId, MountSlot>>,
    sequence: Arc<AtomicU64>,
}

#[derive(Debug, Default)]
struct MountSlot {
    latest: u64,
    state: RenderState,
}

/// Proof that a render was started; consumed when it settles.
#[derive(Debug)]
pub struct RenderTicket {
    mount_id: MountId,
    sequence: u64,
}

impl RenderTicket {
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Applied,
    Superseded,
    MountMissing,
}

impl MountSlots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a new ticket for `mount_id` and run `write_loading` under the slot
    /// lock. The ticket is only issued when the write succeeds; a failed write
    /// leaves no slot behind.
    pub fn begin<F>(
        &self,
        mount_id: &MountId,
        write_loading: F,
    ) -> Result<RenderTicket, DocumentError>
    where
        F: FnOnce() -> Result<(), DocumentError>,
    {
        let sequence = match self.slots.entry(mount_id.clone()) {
            Entry::Occupied(mut occupied) => {
                if let Err(err) = write_loading() {
                    occupied.remove();
                    return Err(err);
                }
                let sequence = self.next_sequence();
                let slot = occupied.get_mut();
                slot.latest = sequence;
                slot.state = RenderState::Loading;
                sequence
            }
            Entry::Vacant(vacant) => {
                write_loading()?;
                let sequence = self.next_sequence();
                vacant.insert(MountSlot {
                    latest: sequence,
                    state: RenderState::Loading,
                });
                sequence
            }
        };

        Ok(RenderTicket {
            mount_id: mount_id.clone(),
            sequence,
        })
    }

    /// Settle `ticket` with `state`, running `write_output` only when the ticket
    /// is still the latest for its mount.
    pub fn commit<F>(
        &self,
        ticket: RenderTicket,
        state: RenderState,
        write_output: F,
    ) -> CommitOutcome
    where
        F: FnOnce() -> Result<(), DocumentError>,
    {
        let Some(mut slot) = self.slots.get_mut(&ticket.mount_id) else {
            return CommitOutcome::MountMissing;
        };
        if slot.latest != ticket.sequence {
            return CommitOutcome::Superseded;
        }

        match write_output() {
            Ok(()) => {
                slot.state = state;
                CommitOutcome::Applied
            }
            Err(DocumentError::MountNotFound { .. }) => {
                slot.state = RenderState::Idle;
                CommitOutcome::MountMissing
            }
        }
    }

    pub fn state(&self, mount_id: &MountId) -> RenderState {
        self.slots
            .get(mount_id)
            .map(|slot| slot.state.clone())
            .unwrap_or_default()
    }

    /// Forget a mount. Renders still in flight for it will not write.
    pub fn release(&self, mount_id: &MountId) -> bool {
        self.slots.remove(mount_id).is_some()
    }

    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed) + 1
    }

    #[cfg(test)]
    fn is_current(&self, ticket: &RenderTicket) -> bool {
        self.slots
            .get(&ticket.mount_id)
            .is_some_and(|slot| slot.latest == ticket.sequence)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.slots.len()
    }
}
