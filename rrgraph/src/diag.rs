use crate::node::{EdgeId, NodeId};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ViolationKind {
    /// Further traversal of the graph is unsafe.
    FatalStructural,
    SoftInvariant,
}

impl std::fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                ViolationKind::FatalStructural => "FATAL",
                ViolationKind::SoftInvariant => "SOFT",
            }
        )
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Subject {
    Node(NodeId),
    Edge(EdgeId),
}

impl std::fmt::Display for Subject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Subject::Node(node) => write!(f, "node {node}"),
            Subject::Edge(edge) => write!(f, "edge {edge}"),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Check {
    EdgeNode,
    EdgeSwitch,
    Bounds,
    BoxOrder,
    Ptc,
    Capacity,
    CostIndex,
    Shape,
    Electrical,
    BufferFanIn,
    IllegalMultiEdge,
    RedundantEdge,
    SourceFanIn,
    MissingFanIn,
    FringeFanIn,
    LookupNodeRange,
    LookupKind,
    LookupPtc,
    LookupSide,
    LookupLocation,
    LookupLayer,
    LookupOrphan,
    LookupPlacements,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Diagnostic {
    pub subject: Subject,
    pub kind: ViolationKind,
    pub check: Check,
    pub message: String,
}

impl Diagnostic {
    pub fn fatal(subject: Subject, check: Check, message: String) -> Self {
        Diagnostic {
            subject,
            kind: ViolationKind::FatalStructural,
            check,
            message,
        }
    }

    pub fn soft(subject: Subject, check: Check, message: String) -> Self {
        Diagnostic {
            subject,
            kind: ViolationKind::SoftInvariant,
            check,
            message,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.kind == ViolationKind::FatalStructural
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{kind} {subject} [{check:?}]: {message}",
            kind = self.kind,
            subject = self.subject,
            check = self.check,
            message = self.message
        )
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Report {
    pub diagnostics: Vec<Diagnostic>,
    /// Set when a fatal diagnostic stopped the pass early.
    pub aborted: bool,
}

impl Report {
    pub fn push(&mut self, diag: Diagnostic) {
        self.diagnostics.push(diag);
    }

    /// True unless a fatal or soft violation was found; the undriven fringe wire exemplar
    /// is informational.
    pub fn passed(&self) -> bool {
        !self.aborted
            && self
                .diagnostics
                .iter()
                .all(|diag| diag.check == Check::FringeFanIn)
    }

    pub fn fatal_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_fatal()).count()
    }

    pub fn count(&self, check: Check) -> usize {
        self.diagnostics.iter().filter(|d| d.check == check).count()
    }
}
