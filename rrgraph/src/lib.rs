//! Routing resource graph construction and checking for island-style FPGA fabrics.
//!
//! [`RrGraph::build`] allocates the block (SOURCE, SINK, IPIN, OPIN) and channel (CHANX,
//! CHANY, CHANZ) nodes of a device and registers them in a [`SpatialLookup`]; an edge builder
//! such as [`edges::build_uniform_edges`] then connects them, after which
//! [`check::check_rr_graph`] and [`verify::verify_lookup`] prove the result is consistent.

pub mod alloc;
pub mod check;
pub mod diag;
pub mod edges;
pub mod error;
pub mod graph;
pub mod lookup;
pub mod node;
pub mod options;
pub mod verify;

pub use diag::{Check, Diagnostic, Report, Subject, ViolationKind};
pub use error::{Error, Result};
pub use graph::{DeviceContext, RrGraph};
pub use lookup::{SpatialKey, SpatialLookup};
pub use node::{Edge, EdgeId, Node, NodeId, NodeKind};
pub use options::{BuildOptions, CheckOptions, Options, RouteType};
