pub mod io;
pub mod models;
pub mod normalize;
pub mod overlaps;
pub mod pipeline;
pub mod stats;

pub use io::{
    format_conll, format_linear, read_ignore_file, read_transcript_file, write_conll,
    write_linear, InputError, TranscriptDocument, TranscriptMetadata,
};
pub use models::{Diagnostics, Token, TokenType, Transcript, TranscriptionUnit};
pub use overlaps::{maximal_cliques, reconcile, OverlapGraph, Reconciliation};
pub use pipeline::{process_transcript, ProcessingConfig, UnitRow};
pub use stats::TranscriptStats;
