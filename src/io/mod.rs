pub mod input;
pub mod output;

pub use input::{
    parse_ignore_json, parse_transcript_tsv, read_ignore_file, read_transcript_file,
    IgnoreAnnotations, InputError,
};
pub use output::{
    conll_rows, format_conll, format_linear, jefferson_feats, linear_rows, write_conll,
    write_linear, TranscriptDocument, TranscriptMetadata, CONLL_FIELDNAMES, LINEAR_FIELDNAMES,
};
