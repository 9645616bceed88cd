//! Time-based overlap detection between transcription units.
//!
//! Units whose intervals intersect are linked in an [`OverlapGraph`]; the
//! maximal cliques of that graph are the overlap events, which are then
//! matched against the `[...]` brackets the transcriber wrote.

pub mod cliques;
pub mod graph;
pub mod reconcile;

pub use cliques::maximal_cliques;
pub use graph::{OverlapEdge, OverlapGraph};
pub use reconcile::{reconcile, Reconciliation};
