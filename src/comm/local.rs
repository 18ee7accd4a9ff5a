//! In-process communicator over crossbeam channels
//!
//! Connects N ranks running as threads of one process with a dedicated
//! unbounded channel per ordered peer pair. An all-reduce is an all-gather
//! plus a local sum: every rank sends its vector to every peer, then
//! receives one vector per peer. Per-peer channels keep successive
//! collectives from interleaving, so no round tags are needed.

use crate::comm::Communicator;
use crate::error::FeedError;
use crate::Result;
use crossbeam::channel::{unbounded, Receiver, Sender};

/// Communicator handle for one rank of an in-process group
///
/// Handles are created together by [`ThreadGroupCommunicator::group`] and
/// moved to their owning threads. Dropping a handle while peers still run
/// collectives makes those collectives fail.
pub struct ThreadGroupCommunicator {
    rank: usize,
    num_ranks: usize,
    // Indexed by peer rank; the slot for this rank itself stays None.
    senders: Vec<Option<Sender<Vec<i64>>>>,
    receivers: Vec<Option<Receiver<Vec<i64>>>>,
}

impl ThreadGroupCommunicator {
    /// Create a connected group of `num_ranks` handles, one per rank
    pub fn group(num_ranks: usize) -> Vec<ThreadGroupCommunicator> {
        let mut senders: Vec<Vec<Option<Sender<Vec<i64>>>>> = (0..num_ranks)
            .map(|_| (0..num_ranks).map(|_| None).collect())
            .collect();
        let mut receivers: Vec<Vec<Option<Receiver<Vec<i64>>>>> = (0..num_ranks)
            .map(|_| (0..num_ranks).map(|_| None).collect())
            .collect();

        for from in 0..num_ranks {
            for to in 0..num_ranks {
                if from == to {
                    continue;
                }
                let (tx, rx) = unbounded();
                senders[from][to] = Some(tx);
                receivers[to][from] = Some(rx);
            }
        }

        senders
            .into_iter()
            .zip(receivers)
            .enumerate()
            .map(|(rank, (senders, receivers))| ThreadGroupCommunicator {
                rank,
                num_ranks,
                senders,
                receivers,
            })
            .collect()
    }
}

impl Communicator for ThreadGroupCommunicator {
    fn rank(&self) -> usize {
        self.rank
    }

    fn num_ranks(&self) -> usize {
        self.num_ranks
    }

    fn all_reduce_sum(&self, values: &mut [i64]) -> Result<()> {
        for sender in self.senders.iter().flatten() {
            sender.send(values.to_vec()).map_err(|_| {
                FeedError::communication(format!(
                    "rank {}: peer dropped out of the group during all-reduce",
                    self.rank
                ))
            })?;
        }

        for (peer, receiver) in self.receivers.iter().enumerate() {
            let Some(receiver) = receiver else { continue };
            let contribution = receiver.recv().map_err(|_| {
                FeedError::communication(format!(
                    "rank {}: lost connection to rank {} during all-reduce",
                    self.rank, peer
                ))
            })?;
            if contribution.len() != values.len() {
                return Err(FeedError::communication(format!(
                    "rank {}: rank {} reduced {} values, this rank reduced {}",
                    self.rank,
                    peer,
                    contribution.len(),
                    values.len()
                ))
                .into());
            }
            for (value, term) in values.iter_mut().zip(&contribution) {
                *value += term;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_group_all_reduce_sums() {
        let group = ThreadGroupCommunicator::group(3);
        let handles: Vec<_> = group
            .into_iter()
            .map(|comm| {
                thread::spawn(move || {
                    let mut values = vec![comm.rank() as i64 + 1, 10];
                    comm.all_reduce_sum(&mut values).unwrap();
                    values
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), vec![1 + 2 + 3, 30]);
        }
    }

    #[test]
    fn test_successive_collectives_stay_ordered() {
        let group = ThreadGroupCommunicator::group(2);
        let handles: Vec<_> = group
            .into_iter()
            .map(|comm| {
                thread::spawn(move || {
                    let mut results = Vec::new();
                    for round in 0..5i64 {
                        let mut values = vec![round * (comm.rank() as i64 + 1)];
                        comm.all_reduce_sum(&mut values).unwrap();
                        results.push(values[0]);
                    }
                    results
                })
            })
            .collect();

        for handle in handles {
            // Round r sums r*1 + r*2
            assert_eq!(handle.join().unwrap(), vec![0, 3, 6, 9, 12]);
        }
    }

    #[test]
    fn test_dropped_peer_is_error() {
        let mut group = ThreadGroupCommunicator::group(2);
        let survivor = group.remove(0);
        drop(group);
        let mut values = vec![1];
        assert!(survivor.all_reduce_sum(&mut values).is_err());
    }

    #[test]
    fn test_single_rank_group() {
        let mut group = ThreadGroupCommunicator::group(1);
        let comm = group.remove(0);
        let mut values = vec![7];
        comm.all_reduce_sum(&mut values).unwrap();
        assert_eq!(values, vec![7]);
    }
}
