use core::fmt;

use crossbeam_channel::{Receiver, Sender, unbounded};
use thiserror::Error;
use tracing::{debug, warn};

pub const COORDINATOR_RANK: usize = 0;

/// Which side of the collectives a group member plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Coordinator,
    Worker,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collective {
    Broadcast,
    Scatter,
    Gather,
}

impl fmt::Display for Collective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Collective::Broadcast => "broadcast",
            Collective::Scatter => "scatter",
            Collective::Gather => "gather",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollectiveError {
    #[error("rank {rank} aborted the group: {reason}")]
    Aborted { rank: usize, reason: String },
    #[error("rank {peer} disconnected during {op}")]
    Disconnected { peer: usize, op: Collective },
    #[error("expected {expected} from rank {peer} but received {received}")]
    UnexpectedCollective {
        peer: usize,
        expected: Collective,
        received: Collective,
    },
    #[error("scatter needs {expected} blocks but {found} were supplied")]
    BlockCount { expected: usize, found: usize },
    #[error("rank {peer} contributed to gather more than once")]
    DuplicateContribution { peer: usize },
}

enum Envelope<M> {
    Data { op: Collective, payload: M },
    Abort { reason: String },
}

/// One member's connection to the group, tagged with its role.
pub enum Endpoint<M> {
    Coordinator(CoordinatorLink<M>),
    Worker(WorkerLink<M>),
}

impl<M> Endpoint<M> {
    /// Wires a group of `size` members: rank 0 coordinates, ranks `1..size` work.
    pub fn connect(size: usize) -> Vec<Endpoint<M>> {
        if size == 0 {
            return Vec::new();
        }

        let (reply_tx, reply_rx) = unbounded();
        let mut workers = Vec::with_capacity(size - 1);
        let mut endpoints = Vec::with_capacity(size);
        for rank in 1..size {
            let (command_tx, command_rx) = unbounded();
            workers.push(command_tx);
            endpoints.push(Endpoint::Worker(WorkerLink {
                rank,
                size,
                commands: command_rx,
                replies: reply_tx.clone(),
            }));
        }
        drop(reply_tx);

        endpoints.insert(
            0,
            Endpoint::Coordinator(CoordinatorLink {
                size,
                workers,
                replies: reply_rx,
            }),
        );
        endpoints
    }

    pub fn role(&self) -> Role {
        match self {
            Endpoint::Coordinator(_) => Role::Coordinator,
            Endpoint::Worker(_) => Role::Worker,
        }
    }

    pub fn rank(&self) -> usize {
        match self {
            Endpoint::Coordinator(_) => COORDINATOR_RANK,
            Endpoint::Worker(link) => link.rank,
        }
    }

    pub fn size(&self) -> usize {
        match self {
            Endpoint::Coordinator(link) => link.size,
            Endpoint::Worker(link) => link.size,
        }
    }
}

/// Rank 0's side of every collective.
pub struct CoordinatorLink<M> {
    size: usize,
    workers: Vec<Sender<Envelope<M>>>,
    replies: Receiver<(usize, Envelope<M>)>,
}

impl<M> CoordinatorLink<M> {
    pub fn size(&self) -> usize {
        self.size
    }

    /// Sends an identical copy of `payload` to every worker.
    pub fn broadcast(&self, payload: &M) -> Result<(), CollectiveError>
    where
        M: Clone,
    {
        for (index, worker) in self.workers.iter().enumerate() {
            let envelope = Envelope::Data {
                op: Collective::Broadcast,
                payload: payload.clone(),
            };
            if worker.send(envelope).is_err() {
                return Err(self.peer_failure(index + 1, Collective::Broadcast));
            }
        }
        debug!(
            target: "exam_cluster::collective",
            op = %Collective::Broadcast,
            peers = self.workers.len(),
            "broadcast delivered"
        );
        Ok(())
    }

    /// Sends block `r` to rank `r` and returns block 0 for the coordinator.
    pub fn scatter(&self, blocks: Vec<M>) -> Result<M, CollectiveError> {
        if blocks.len() != self.size {
            return Err(CollectiveError::BlockCount {
                expected: self.size,
                found: blocks.len(),
            });
        }

        let mut blocks = blocks.into_iter();
        let Some(own) = blocks.next() else {
            return Err(CollectiveError::BlockCount {
                expected: self.size,
                found: 0,
            });
        };
        for (index, (worker, block)) in self.workers.iter().zip(blocks).enumerate() {
            let envelope = Envelope::Data {
                op: Collective::Scatter,
                payload: block,
            };
            if worker.send(envelope).is_err() {
                return Err(self.peer_failure(index + 1, Collective::Scatter));
            }
        }
        debug!(
            target: "exam_cluster::collective",
            op = %Collective::Scatter,
            blocks = self.size,
            "scatter delivered"
        );
        Ok(own)
    }

    /// Collects one contribution per rank, returned in ascending rank order
    /// regardless of arrival order.
    pub fn gather(&self, own: M) -> Result<Vec<M>, CollectiveError> {
        let mut slots: Vec<Option<M>> = (0..self.size).map(|_| None).collect();
        slots[COORDINATOR_RANK] = Some(own);

        for _ in 1..self.size {
            let Ok((peer, envelope)) = self.replies.recv() else {
                let peer = slots.iter().position(Option::is_none).unwrap_or(0);
                return Err(CollectiveError::Disconnected {
                    peer,
                    op: Collective::Gather,
                });
            };

            match envelope {
                Envelope::Abort { reason } => {
                    return Err(CollectiveError::Aborted { rank: peer, reason });
                }
                Envelope::Data {
                    op: Collective::Gather,
                    payload,
                } => match slots.get_mut(peer) {
                    Some(slot) if slot.is_none() => *slot = Some(payload),
                    _ => return Err(CollectiveError::DuplicateContribution { peer }),
                },
                Envelope::Data { op, .. } => {
                    return Err(CollectiveError::UnexpectedCollective {
                        peer,
                        expected: Collective::Gather,
                        received: op,
                    });
                }
            }
        }

        debug!(
            target: "exam_cluster::collective",
            op = %Collective::Gather,
            contributions = self.size,
            "gather complete"
        );
        Ok(slots.into_iter().flatten().collect())
    }

    /// Tells every worker to stop; blocked workers return [`CollectiveError::Aborted`].
    pub fn abort(&self, reason: &str) {
        warn!(target: "exam_cluster::collective", rank = COORDINATOR_RANK, reason, "aborting group");
        for worker in &self.workers {
            let _ = worker.send(Envelope::Abort {
                reason: reason.to_string(),
            });
        }
    }

    // A worker that hung up may have left an abort notice behind.
    fn peer_failure(&self, peer: usize, op: Collective) -> CollectiveError {
        for (rank, envelope) in self.replies.try_iter() {
            if let Envelope::Abort { reason } = envelope {
                return CollectiveError::Aborted { rank, reason };
            }
        }
        CollectiveError::Disconnected { peer, op }
    }
}

/// A non-coordinating member's side of every collective.
pub struct WorkerLink<M> {
    rank: usize,
    size: usize,
    commands: Receiver<Envelope<M>>,
    replies: Sender<(usize, Envelope<M>)>,
}

impl<M> WorkerLink<M> {
    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn recv_broadcast(&self) -> Result<M, CollectiveError> {
        self.receive(Collective::Broadcast)
    }

    pub fn recv_scatter(&self) -> Result<M, CollectiveError> {
        self.receive(Collective::Scatter)
    }

    pub fn send_gather(&self, payload: M) -> Result<(), CollectiveError> {
        let envelope = Envelope::Data {
            op: Collective::Gather,
            payload,
        };
        self.replies
            .send((self.rank, envelope))
            .map_err(|_| CollectiveError::Disconnected {
                peer: COORDINATOR_RANK,
                op: Collective::Gather,
            })
    }

    pub fn abort(&self, reason: &str) {
        warn!(target: "exam_cluster::collective", rank = self.rank, reason, "aborting group");
        let _ = self.replies.send((
            self.rank,
            Envelope::Abort {
                reason: reason.to_string(),
            },
        ));
    }

    fn receive(&self, expected: Collective) -> Result<M, CollectiveError> {
        let received = match self.commands.recv() {
            Ok(Envelope::Data { op, payload }) if op == expected => Ok(payload),
            Ok(Envelope::Data { op, .. }) => Err(CollectiveError::UnexpectedCollective {
                peer: COORDINATOR_RANK,
                expected,
                received: op,
            }),
            Ok(Envelope::Abort { reason }) => Err(CollectiveError::Aborted {
                rank: COORDINATOR_RANK,
                reason,
            }),
            Err(_) => Err(CollectiveError::Disconnected {
                peer: COORDINATOR_RANK,
                op: expected,
            }),
        };
        if received.is_ok() {
            debug!(target: "exam_cluster::collective", rank = self.rank, op = %expected, "received");
        }
        received
    }
}
