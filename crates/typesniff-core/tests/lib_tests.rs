//! Behavioural tests for the detection pipeline through the public API.

use std::sync::Arc;

use typesniff_core::{
    DetectOptions, Detector, EngineContext, EngineRegistry, OracleMode, Signal, score_magic,
    score_tokens,
};

fn offline_registry() -> Arc<EngineRegistry> {
    Arc::new(
        EngineRegistry::builder()
            .with_defaults()
            .with_context(EngineContext::offline())
            .build(),
    )
}

fn detector() -> Detector {
    Detector::new(offline_registry())
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

const PNG_HEADER: &[u8] = b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR\x00\x00\x00\x01";

#[test]
fn test_png_signature_ranks_first() {
    let det = detector()
        .detect(PNG_HEADER, &DetectOptions::default())
        .unwrap();
    let best = det.best().unwrap();
    assert_eq!(best.media_type, "image/png");
    assert_eq!(best.extension.as_deref(), Some("png"));
    assert_eq!(best.confidence, 0.99);
    assert_eq!(det.candidates[0], *best);
}

#[test]
fn test_json_full_parse_beats_embedded_fragment() {
    let only_json = DetectOptions::default().only(["json"]);

    let full = detector()
        .detect(br#"{"id": 7, "tags": ["a", "b"]}"#, &only_json)
        .unwrap();
    let full = full.best().unwrap();
    assert_eq!(full.confidence, 1.0);
    assert!(!full.is_partial());

    let embedded = detector()
        .detect(
            b"2024-01-01 INFO request body {\"id\": 7} accepted by upstream",
            &only_json,
        )
        .unwrap();
    let embedded = embedded.best().unwrap();
    assert_eq!(embedded.media_type, "application/json");
    assert!(embedded.is_partial());
    assert!(embedded.confidence < 1.0);
    assert!(embedded.confidence < full.confidence);
}

#[test]
fn test_csv_header_detection() {
    let only_csv = DetectOptions::default().only(["csv"]);

    let with_header = detector()
        .detect(
            b"city,population,area\nparis,2148000,105.4\nrome,2873000,1285.3\noslo,709000,454.0\n",
            &only_csv,
        )
        .unwrap();
    let with_header = with_header.best().unwrap();
    assert!(approx(with_header.confidence, score_tokens(0.9)));
    assert_eq!(with_header.signal("header"), Some(Signal::Flag(true)));

    let headerless = detector()
        .detect(b"1,2148000,105.4\n2,2873000,1285.3\n3,709000,454.0\n", &only_csv)
        .unwrap();
    let headerless = headerless.best().unwrap();
    assert!(approx(headerless.confidence, score_tokens(0.7)));
    assert_eq!(headerless.signal("header"), Some(Signal::Flag(false)));
}

#[test]
fn test_xml_confidence_is_max_of_layers() {
    let mut payload = b"\xEF\xBB\xBF<note>".to_vec();
    payload.extend(std::iter::repeat_n(b'x', 200));
    payload.extend_from_slice(b"</note");

    let det = detector()
        .detect(&payload, &DetectOptions::default().only(["xml"]))
        .unwrap();
    let best = det.best().unwrap();
    assert_eq!(best.media_type, "application/xml");
    assert!(approx(best.confidence, score_magic(3)));
    assert!(best.confidence > score_tokens(0.2));
    assert!(best.signal("bom").is_some());
    assert!(best.signal("balanced").is_some());
    assert!(best.signal("parsed").is_none());
}

#[test]
fn test_unknown_engine_is_not_found() {
    let registry = offline_registry();
    assert!(registry.get("cobol").unwrap_err().is_not_found());
    assert!(
        Detector::new(registry)
            .detect(b"x", &DetectOptions::default().only(["json", "cobol"]))
            .unwrap_err()
            .is_not_found()
    );
}

#[test]
fn test_engine_listing_is_unique() {
    let registry = offline_registry();
    let names = registry.list();
    assert_eq!(names.len(), registry.len());
    for expected in [
        "signature",
        "csv",
        "json",
        "xml",
        "python",
        "php",
        "cpp",
        "swift",
        "zig",
        "elixir",
        "powershell",
        "toml",
        "magic",
        "magika",
        "trid",
    ] {
        assert!(names.contains(expected), "missing engine {expected}");
    }
}

#[test]
fn test_detection_is_deterministic() {
    let payload = b"import os\n\ndef main():\n    print(os.getcwd())\n\nif __name__ == \"__main__\":\n    main()\n";
    let first = detector().detect(payload, &DetectOptions::default()).unwrap();
    let second = detector().detect(payload, &DetectOptions::default()).unwrap();
    assert_eq!(first.candidates, second.candidates);
    assert_eq!(first.hash, second.hash);
    assert_eq!(first.best().unwrap().media_type, "text/x-python");
}

#[test]
fn test_cache_hit_returns_equal_copy() {
    let registry = offline_registry();
    let json = registry.get("json").unwrap();
    let payload = br#"[1, 2, 3]"#;

    let mut first = json.classify(payload).unwrap();
    assert_eq!(json.cached_len(), 1);
    let second = json.classify(payload).unwrap();
    assert_eq!(json.cached_len(), 1);

    assert_eq!(first.candidates, second.candidates);
    assert_eq!(first.hash, second.hash);
    assert_eq!(second.engine, "json");
    assert_eq!(second.bytes_analyzed, payload.len());

    // Mutating a returned copy must not leak into the cache.
    first.candidates[0].confidence = 0.0;
    first.candidates.clear();
    let third = json.classify(payload).unwrap();
    assert_eq!(third.candidates, second.candidates);
}

#[test]
fn test_oracle_only_mode_without_oracles_yields_heuristic_silence() {
    let registry = EngineRegistry::builder()
        .with_defaults()
        .with_context(EngineContext::offline().with_mode(OracleMode::Only))
        .build();
    let det = Detector::new(Arc::new(registry))
        .detect(br#"{"a": 1}"#, &DetectOptions::default().only(["json", "csv", "xml"]))
        .unwrap();
    assert!(det.is_empty());
}

#[test]
fn test_path_source_reads_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("payload.bin");
    std::fs::write(&path, PNG_HEADER).unwrap();

    let det = detector()
        .detect(&path, &DetectOptions::default().cap_bytes(8))
        .unwrap();
    assert_eq!(det.bytes_analyzed, 8);
    assert_eq!(det.best().unwrap().media_type, "image/png");
}
