//! A fixed-size group of cooperating workers that only talk through
//! collective operations (broadcast, scatter, gather) rooted at rank 0.

pub mod comm;
pub mod group;
pub mod partition;

pub use comm::{
    COORDINATOR_RANK, Collective, CollectiveError, CoordinatorLink, Endpoint, Role, WorkerLink,
};
pub use group::{GroupError, launch};
pub use partition::{block_sizes, concat_blocks, split_contiguous};
