//! Block signature pool
//!
//! Signatures piggybacked on events are checked against the local copy of
//! the block they claim to sign. A bad or unmatched signature is logged and
//! dropped so that it never holds up the others. Store failures propagate
//! with the unprocessed signatures back in the pool.

use braid_core::Result;
use tracing::{debug, error, info, warn};

use crate::hashgraph::Hashgraph;

impl Hashgraph {
    /// Verify pooled signatures, attach the valid ones to their blocks and
    /// promote the anchor block
    pub fn process_sig_pool(&mut self) -> Result<()> {
        let trust_count = self.participants.trust_count();
        let mut pool = std::mem::take(&mut self.sig_pool).into_iter();

        while let Some(signature) = pool.next() {
            if self.participants.by_pub_key(&signature.validator).is_none() {
                warn!(
                    validator = %signature.validator,
                    block = signature.index,
                    "Discarding block signature from unknown validator"
                );
                continue;
            }

            let mut block = match self.store.get_block(signature.index) {
                Ok(block) => block,
                Err(e) if e.is_not_found() => {
                    debug!(block = signature.index, "Discarding signature for unknown block");
                    continue;
                }
                Err(e) => {
                    self.sig_pool.push(signature);
                    self.sig_pool.extend(pool);
                    return Err(e);
                }
            };

            match block.verify(&signature) {
                Ok(true) => {}
                Ok(false) => {
                    warn!(
                        validator = %signature.validator,
                        block = signature.index,
                        "Discarding invalid block signature"
                    );
                    continue;
                }
                Err(e) => {
                    error!(
                        validator = %signature.validator,
                        block = signature.index,
                        error = %e,
                        "Block signature verification failed"
                    );
                    continue;
                }
            }

            block.set_signature(signature.clone());
            let index = block.index();
            let count = block.signature_count();
            if let Err(e) = self.store.set_block(block) {
                self.sig_pool.push(signature);
                self.sig_pool.extend(pool);
                return Err(e);
            }

            if count > trust_count && self.anchor_block.map_or(true, |anchor| index > anchor) {
                self.anchor_block = Some(index);
                info!(block = index, signatures = count, "New anchor block");
            }
        }
        Ok(())
    }
}
