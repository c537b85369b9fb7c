//! Cluster metadata agreement.
//!
//! Before planning, the cluster must agree on one topology. Each node keeps
//! its own versioned copy; [`MetadataResolver`] gathers them and picks the
//! newest, refusing to guess when two copies diverged.
//!
//! ```text
//!   node 0: v{0:1}        ─┐
//!   node 1: v{0:1, 1:1}   ─┼──► resolve_latest ──► v{0:1, 1:1}
//!   node 2: unreachable   ─┘     (skipped unless required)
//! ```

mod resolver;

pub use resolver::MetadataResolver;
