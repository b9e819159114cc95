//! Fame decision by virtual voting
//!
//! For a witness `x` of round `r`, every witness `y` of a later round `j`
//! casts a vote computed purely from the DAG:
//!
//! ```text
//!   j = r + 1           vote(y, x) = see(y, x)
//!   j > r + 1           v, t = majority and its size over the votes of the
//!                              round j-1 witnesses that y strongly sees
//!     (j - r) % n != 0    normal round: t >= supermajority decides fame(x) = v
//!     (j - r) % n == 0    coin round:   vote v if t >= supermajority,
//!                                       else the middle bit of y's hash
//! ```
//!
//! Votes live only for the duration of one pass; a witness either gets
//! decided or stays undefined for the next pass. Every pending round is
//! revisited on each pass, since a witness may join a round after the
//! others were decided.

use braid_core::{EventHash, Result};
use hashbrown::HashMap;
use tracing::debug;

use crate::hashgraph::Hashgraph;

/// Outcome of one voter's tally over the votes it strongly sees
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Ballot {
    /// Supermajority in a normal round: fame is settled
    Decide(bool),
    Vote(bool),
    /// Split coin round: the voter's hash picks the vote
    Coin(bool),
}

/// Tally of a voter in round `r + diff` among `n` participants
fn tally(yays: usize, nays: usize, diff: i64, n: i64, super_majority: usize, voter: &EventHash) -> Ballot {
    let (v, t) = if yays >= nays { (true, yays) } else { (false, nays) };
    if diff % n > 0 {
        if t >= super_majority {
            Ballot::Decide(v)
        } else {
            Ballot::Vote(v)
        }
    } else if t >= super_majority {
        Ballot::Vote(v)
    } else {
        Ballot::Coin(voter.middle_bit())
    }
}

impl Hashgraph {
    /// Decide the fame of the witnesses of every pending round
    pub fn decide_fame(&mut self) -> Result<()> {
        // (voter, candidate) -> vote
        let mut votes: HashMap<(EventHash, EventHash), bool> = HashMap::new();
        let n = self.participants.len() as i64;
        let super_majority = self.participants.super_majority();
        let last_round = self.store.last_round();

        for position in 0..self.pending_rounds.len() {
            let r = self.pending_rounds[position].index;
            let mut round_info = self.store.get_round(r)?;

            for x in round_info.witnesses() {
                if round_info.is_decided(&x) {
                    continue;
                }

                'rounds: for j in (r + 1)..=last_round {
                    let diff = j - r;
                    let voters = self.store.round_witnesses(j);
                    let previous = if diff > 1 {
                        self.store.round_witnesses(j - 1)
                    } else {
                        Vec::new()
                    };

                    for y in voters {
                        if diff == 1 {
                            let vote = self.see(&y, &x)?;
                            votes.insert((y, x), vote);
                            continue;
                        }

                        let mut yays = 0;
                        let mut nays = 0;
                        for w in &previous {
                            if self.strongly_see(&y, w)? {
                                if votes.get(&(*w, x)).copied().unwrap_or(false) {
                                    yays += 1;
                                } else {
                                    nays += 1;
                                }
                            }
                        }
                        match tally(yays, nays, diff, n, super_majority, &y) {
                            Ballot::Decide(v) => {
                                round_info.set_fame(&x, v);
                                votes.insert((y, x), v);
                                debug!(witness = %x, round = r, famous = v, decided_in = j, "Fame decided");
                                break 'rounds;
                            }
                            Ballot::Vote(v) => {
                                votes.insert((y, x), v);
                            }
                            Ballot::Coin(v) => {
                                self.coin_votes += 1;
                                votes.insert((y, x), v);
                            }
                        }
                    }
                }
            }

            // A witness discovered late can reopen a round
            let decided = round_info.witnesses_decided();
            self.store.set_round(r, round_info)?;
            if decided && !self.pending_rounds[position].decided {
                debug!(round = r, "Round decided");
            }
            self.pending_rounds[position].decided = decided;
        }
        Ok(())
    }
}
