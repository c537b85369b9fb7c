//! Causal versioning for replicated metadata.
//!
//! Every copy of the cluster metadata a node stores carries a
//! [`VectorClock`]. Comparing two clocks yields an [`Occurred`] relation;
//! a [`Occurred::Concurrent`] result between copies of the same key means
//! two writers updated it without seeing each other, which the resolver
//! refuses to merge.
//!
//! ```text
//!   {1:1}  ──►  {1:2}  ──►  {1:2, 2:1}
//!     │
//!     └──►  {1:1, 3:1}        ({1:2} vs {1:1, 3:1} = Concurrent)
//! ```

mod clock;
mod versioned;

pub use clock::{Occurred, VectorClock};
pub use versioned::Versioned;
