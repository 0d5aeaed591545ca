use std::io;
use std::thread;

use thiserror::Error;
use tracing::info;

use crate::comm::Endpoint;

#[derive(Debug, Error)]
pub enum GroupError {
    #[error("a worker group needs at least one member")]
    Empty,
    #[error("failed to spawn worker {rank}: {source}")]
    Spawn {
        rank: usize,
        #[source]
        source: io::Error,
    },
    #[error("worker {rank} panicked")]
    Panicked { rank: usize },
}

/// Runs `body` once per rank on its own thread and returns every rank's
/// result in rank order.
///
/// The group size is fixed for the whole run. A member that returns early or
/// panics drops its channels, so peers blocked in a collective observe a
/// disconnect instead of hanging.
pub fn launch<M, T, F>(size: usize, body: F) -> Result<Vec<T>, GroupError>
where
    M: Send,
    T: Send,
    F: Fn(Endpoint<M>) -> T + Sync,
{
    if size == 0 {
        return Err(GroupError::Empty);
    }

    let endpoints = Endpoint::<M>::connect(size);
    info!(target: "exam_cluster::group", size, "launching worker group");

    thread::scope(|scope| -> Result<Vec<T>, GroupError> {
        let body = &body;
        let mut handles = Vec::with_capacity(size);
        for endpoint in endpoints {
            let rank = endpoint.rank();
            let handle = thread::Builder::new()
                .name(format!("exam-worker-{rank}"))
                .spawn_scoped(scope, move || body(endpoint))
                .map_err(|source| GroupError::Spawn { rank, source })?;
            handles.push((rank, handle));
        }

        // Join every member before reporting so no panic is left unobserved.
        let joined: Vec<_> = handles
            .into_iter()
            .map(|(rank, handle)| (rank, handle.join()))
            .collect();
        joined
            .into_iter()
            .map(|(rank, outcome)| outcome.map_err(|_| GroupError::Panicked { rank }))
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::{CollectiveError, Role};

    #[test]
    fn rejects_empty_group() {
        let result = launch::<(), (), _>(0, |_| ());
        assert!(matches!(result, Err(GroupError::Empty)));
    }

    #[test]
    fn results_come_back_in_rank_order() {
        let roles = launch::<(), _, _>(4, |endpoint| (endpoint.rank(), endpoint.role())).unwrap();
        assert_eq!(roles[0], (0, Role::Coordinator));
        assert_eq!(
            roles.iter().map(|(rank, _)| *rank).collect::<Vec<_>>(),
            vec![0, 1, 2, 3]
        );
        assert!(roles[1..].iter().all(|(_, role)| *role == Role::Worker));
    }

    #[test]
    fn sums_scattered_blocks() {
        let results = launch::<Vec<u64>, _, _>(3, |endpoint| -> Result<u64, CollectiveError> {
            match endpoint {
                Endpoint::Coordinator(link) => {
                    let own = link.scatter(vec![vec![1, 2], vec![3], vec![4, 5, 6]])?;
                    let partials = link.gather(vec![own.iter().sum()])?;
                    Ok(partials.iter().flatten().sum())
                }
                Endpoint::Worker(link) => {
                    let block = link.recv_scatter()?;
                    link.send_gather(vec![block.iter().sum()])?;
                    Ok(0)
                }
            }
        })
        .unwrap();
        assert_eq!(results[0], Ok(21));
    }

    #[test]
    fn panicking_member_is_reported_without_hanging_peers() {
        let result = launch::<u8, _, _>(3, |endpoint| match endpoint {
            Endpoint::Coordinator(link) => link.gather(0).map(|_| ()),
            Endpoint::Worker(link) if link.rank() == 2 => panic!("worker failure"),
            Endpoint::Worker(link) => link.send_gather(1),
        });
        assert!(matches!(result, Err(GroupError::Panicked { rank: 2 })));
    }
}
