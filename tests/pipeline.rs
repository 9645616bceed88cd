use kiparla::models::{OverlapMatch, Span, TokenType, Warning};
use kiparla::{
    format_conll, process_transcript, read_transcript_file, write_linear, ProcessingConfig,
    UnitRow,
};

fn config(duration_threshold: f64) -> ProcessingConfig {
    ProcessingConfig {
        duration_threshold,
        ..Default::default()
    }
}

#[test]
fn test_annotated_overlap_is_matched() {
    let rows = vec![
        UnitRow::new(0, "A", 0.0, 1.0, "ciao (.) bella"),
        UnitRow::new(1, "B", 0.9, 2.0, "[ciao] a te"),
    ];
    let transcript = process_transcript("t1", &rows, &config(0.05));

    let first = transcript.get(0).unwrap();
    let forms: Vec<&str> = first.tokens.values().map(|t| t.text.as_str()).collect();
    assert_eq!(forms, vec!["ciao", "{P}", "bella"]);
    assert_eq!(first.tokens[&1].token_type, TokenType::Shortpause);

    assert_eq!(transcript.overlap_events.len(), 1);
    let edge = transcript.time_based_overlaps.edge(0, 1).unwrap();
    assert!((edge.duration - 0.1).abs() < 1e-9);

    let second = transcript.get(1).unwrap();
    assert_eq!(
        second.overlapping_matches.values().copied().collect::<Vec<_>>(),
        vec![OverlapMatch::Clique(0)]
    );
    assert_eq!(
        second.tokens[&0].overlaps.get(&OverlapMatch::Clique(0)),
        Some(&Span::new(0, 4))
    );
    assert!(second.tokens[&1].overlaps.is_empty());
}

#[test]
fn test_short_unannotated_overlap_is_resynced() {
    let rows = vec![
        UnitRow::new(0, "A", 0.0, 1.0, "ciao (.) bella"),
        UnitRow::new(1, "B", 0.98, 2.0, "ciao a te"),
    ];
    let transcript = process_transcript("t2", &rows, &config(0.05));

    assert_eq!(transcript.time_based_overlaps.edge_count(), 0);
    assert!(transcript.overlap_events.is_empty());

    let first = transcript.get(0).unwrap();
    let second = transcript.get(1).unwrap();
    assert!((first.end - 0.99).abs() < 1e-9);
    assert!((second.start - 0.99).abs() < 1e-9);
    assert_eq!(first.diagnostics.warning_count(Warning::MovedBoundaries), 1);
    assert_eq!(second.diagnostics.warning_count(Warning::MovedBoundaries), 1);
}

#[test]
fn test_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("conv.tsv");
    std::fs::write(
        &input,
        "tu_id\tspeaker\tstart\tend\ttext\n\
         0\tA\t0.0\t1.0\tciao (.) bella\n\
         1\tB\t0.9\t2.0\t[ciao] a te\n\
         2\tTraduzione\t0.0\t2.0\thello\n",
    )
    .unwrap();

    let rows = read_transcript_file(&input).unwrap();
    assert_eq!(rows.len(), 3);

    let transcript = process_transcript("conv", &rows, &config(0.05));
    assert_eq!(transcript.len(), 2);

    let conll = format_conll(&transcript);
    assert_eq!(conll.lines().count(), 7);
    assert!(conll.lines().any(|line| line.starts_with("1-0\tB\t1\tciao\t")));

    let linear = dir.path().join("conv.tus.tsv");
    write_linear(&transcript, &linear).unwrap();
    let written = std::fs::read_to_string(&linear).unwrap();
    assert_eq!(written.lines().count(), 3);
    assert!(written.lines().nth(1).unwrap().ends_with("ciao {P} bella"));
}

#[test]
fn test_missing_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let err = read_transcript_file(&dir.path().join("missing.tsv")).unwrap_err();
    assert!(err.to_string().contains("Failed to read file"));
}
