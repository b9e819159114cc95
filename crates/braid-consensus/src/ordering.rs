//! Round received and block production
//!
//! An undetermined event is received in the first round, after its own,
//! whose famous witnesses see it according to the configured
//! [`ReceivedCriterion`](crate::config::ReceivedCriterion). Scanning stops at
//! the first round whose witnesses are not all decided, so rounds are
//! settled strictly in order.

use braid_core::{Block, BraidError, Result};
use tracing::{debug, info};

use crate::hashgraph::Hashgraph;

impl Hashgraph {
    /// Assign a round received to every event whose round can be settled
    pub fn decide_round_received(&mut self) -> Result<()> {
        let last_round = self.store.last_round();
        let criterion = self.config.received_criterion;
        let mut remaining = Vec::with_capacity(self.undetermined_events.len());

        for x in self.undetermined_events.clone() {
            let mut event = self.store.get_event(&x)?;
            if event.round_received().is_some() {
                continue;
            }
            let Some(round) = event.round() else {
                remaining.push(x);
                continue;
            };

            // Committed rounds never receive new events
            let start = match self.last_consensus_round {
                Some(last) => (round + 1).max(last + 1),
                None => round + 1,
            };

            let mut received = false;
            for i in start..=last_round {
                let mut round_info = match self.store.get_round(i) {
                    Ok(info) => info,
                    Err(e) if e.is_not_found() => break,
                    Err(e) => return Err(e),
                };
                if !round_info.witnesses_decided() {
                    break;
                }

                let famous = round_info.famous_witnesses();
                let mut seen = 0;
                for w in &famous {
                    if self.see(w, &x)? {
                        seen += 1;
                    }
                }

                if criterion.is_met(seen, famous.len()) {
                    event.set_round_received(i);
                    self.store.set_event(event)?;
                    round_info.set_consensus_event(x);
                    self.store.set_round(i, round_info)?;
                    received = true;
                    break;
                }
            }

            if !received {
                remaining.push(x);
            }
        }

        self.undetermined_events = remaining;
        Ok(())
    }

    /// Commit decided rounds from the front of the queue: build the frame,
    /// record its events as consensus events, persist and emit a block.
    ///
    /// Waits while the commit channel is full. A closed channel yields
    /// `CommitChannelClosed` after the block is persisted.
    pub async fn process_decided_rounds(&mut self) -> Result<()> {
        while let Some(pending) = self.pending_rounds.front().copied() {
            if !pending.decided {
                break;
            }
            if self
                .last_consensus_round
                .map_or(false, |last| pending.index <= last)
            {
                debug!(round = pending.index, "Skipping already committed round");
                self.pending_rounds.pop_front();
                continue;
            }

            // Store writes first, all of them safe to repeat; engine state
            // only moves once they have succeeded
            let frame = self.get_frame(pending.index)?;
            for frame_event in &frame.events {
                self.store.add_consensus_event(&frame_event.core)?;
            }

            let block = if frame.is_empty() {
                None
            } else {
                let block = Block::from_frame(self.store.last_block_index() + 1, &frame);
                self.store.set_block(block.clone())?;
                Some(block)
            };

            for frame_event in &frame.events {
                self.consensus_transactions += frame_event.transactions().len() as u64;
                if frame_event.core.is_loaded() {
                    self.pending_loaded_events -= 1;
                }
            }
            self.last_consensus_round = Some(pending.index);
            self.first_consensus_round.get_or_insert(pending.index);
            self.pending_rounds.pop_front();

            info!(
                round = pending.index,
                events = frame.events.len(),
                block = block.as_ref().map(Block::index),
                "Round committed"
            );

            if let Some(block) = block {
                self.commit_tx
                    .send(block)
                    .await
                    .map_err(|_| BraidError::CommitChannelClosed)?;
            }
        }
        Ok(())
    }
}
