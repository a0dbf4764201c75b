//! Benchmark smoke test for the parse -> rank -> fingerprint loop.

use std::time::Instant;

use smart_leaf_benchmarks::{synthetic_image, synthetic_predict_body};
use smart_leaf_core::{DEFAULT_RANK_LIMIT, rank};
use smart_leaf_inference_contract::parse_predict_response;
use smart_leaf_upload::image_fingerprint;

#[test]
fn benchmark_rank_pipeline_smoke_prints_latency() {
    let body = synthetic_predict_body(1_000);
    let image = synthetic_image(512 * 1024);

    let start = Instant::now();
    let mut ranked_rows = 0usize;
    let mut fingerprint_len = 0usize;

    for _ in 0..100 {
        let result = parse_predict_response(&body).expect("synthetic body should parse");
        let ranked = rank(&result, DEFAULT_RANK_LIMIT);
        assert_eq!(ranked[0].label, "Crop_0000___Disease");
        ranked_rows += ranked.len();
        fingerprint_len += image_fingerprint(&image).len();
    }

    let elapsed_ms = start.elapsed().as_millis();
    println!("benchmark_rank_pipeline_elapsed_ms={elapsed_ms}");
    println!("benchmark_ranked_rows={ranked_rows}");
    println!("benchmark_fingerprint_total_len={fingerprint_len}");

    assert_eq!(ranked_rows, 100 * DEFAULT_RANK_LIMIT);
    assert!(
        elapsed_ms < 5_000,
        "rank pipeline smoke benchmark should stay bounded"
    );
}

#[test]
fn benchmark_full_rank_keeps_tie_order() {
    let body = synthetic_predict_body(30);
    let result = parse_predict_response(&body).expect("synthetic body should parse");

    let ranked = rank(&result, usize::MAX);
    assert_eq!(ranked.len(), 30);
    assert_eq!(ranked[0].label, "Crop_0000___Disease");
    assert_eq!(ranked[1].label, "Crop_0001___Disease");
    let position = |label: &str| {
        ranked
            .iter()
            .position(|entry| entry.label == label)
            .expect("label should be ranked")
    };
    assert_eq!(position("Crop_0010___Disease"), position("Crop_0009___Disease") + 1);
}
