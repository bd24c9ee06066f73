//! Indset Distribution Substrate
//!
//! Groups the copies of one global entity held by different workers under a
//! single owner, and moves per-entity values between them using blocking
//! collectives.
//!
//! # Overview
//!
//! ## Collectives
//!
//! The [`Comm`] trait is the whole contract with the communication layer:
//!
//! - **all-reduce**: combine one value per worker under a [`ReduceOp`]
//! - **exchange**: blocking all-to-all of typed batches
//! - **barrier**
//!
//! [`SelfComm`] is the one-worker group. [`ThreadGroup`] connects `n`
//! threads of one process through a shared barrier and mailbox.
//!
//! ## Distribution
//!
//! A [`Dist`] maps local roots to remote destination slots. Built from each
//! entity's owner with [`Dist::from_owners`] and flipped with
//! [`Dist::invert`], it propagates an owner's value to every copy:
//!
//! ```rust
//! use indset_dist::{Comm, Dist, Remote, SelfComm};
//!
//! let owners = vec![Remote::new(0, 0), Remote::new(0, 1)];
//! let owners2copies = Dist::from_owners(SelfComm, owners)?.invert()?;
//! assert_eq!(owners2copies.exch(&[7i8, 9], 1)?, vec![7, 9]);
//! assert_eq!(owners2copies.parent_comm().size(), 1);
//! # Ok::<(), indset_dist::DistError>(())
//! ```

mod comm;
mod dist;
mod error;
mod group;

pub use comm::{Comm, SelfComm};
pub use dist::{owned_marks, Dist, Remote};
pub use error::{CommError, DistError, Result};
pub use group::{ThreadComm, ThreadGroup};

// Re-export the reduction vocabulary collectives are expressed in
pub use indset_graph::{ReduceOp, Reducible};
