#![warn(missing_docs)]
//! # smart-leaf-benchmarks
//!
//! Deterministic workload builders for the latency smoke tests.

/// Builds a `/predict` body with `classes` labels and descending confidences.
///
/// Every tenth label shares its confidence with the previous one so ranking
/// has ties to resolve.
pub fn synthetic_predict_body(classes: usize) -> String {
    let mut entries = Vec::with_capacity(classes);
    let mut confidence = 100.0_f64;
    for index in 0..classes {
        if index % 10 != 0 {
            confidence /= 1.01;
        }
        entries.push(format!("\"Crop_{index:04}___Disease\":{confidence}"));
    }

    format!(
        "{{\"predicted_class\":\"Crop_0000___Disease\",\"confidence\":100,\"all_confidences\":{{{}}}}}",
        entries.join(",")
    )
}

/// Fixed pseudo-image bytes of `len` bytes.
pub fn synthetic_image(len: usize) -> Vec<u8> {
    (0..len).map(|index| (index % 251) as u8).collect()
}
