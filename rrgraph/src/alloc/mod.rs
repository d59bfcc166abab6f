//! Node id allocation. Ids are handed out by a single sequential counter so that identical
//! inputs always produce identical graphs.

mod block;
mod chan;

pub use block::{alloc_block_nodes, wanted_sides};
pub use chan::alloc_chan_nodes;
