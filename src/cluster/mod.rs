//! Cluster topology model.
//!
//! A [`Cluster`] is an immutable description of the nodes in a cluster,
//! the primary partitions each owns, and the zones they are grouped into.
//! Every edit produces a new value; nothing here is shared or locked.
//!
//! ```text
//! Cluster "prod"
//!   ├── Node 0 (zone 0)  partitions [0, 3, 6, 9]
//!   ├── Node 1 (zone 0)  partitions [1, 4, 7, 10]
//!   └── Node 2 (zone 1)  partitions [2, 5, 8, 11]
//! ```

mod node;
mod topology;
mod zone;

pub use node::{Node, DEFAULT_ADMIN_PORT, DEFAULT_HTTP_PORT, DEFAULT_SOCKET_PORT};
pub use topology::Cluster;
pub use zone::Zone;
