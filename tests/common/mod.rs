#![allow(dead_code)]
/// Common helpers for integration tests
use columnar_frame::{
    RecordBatch,
    Table,
    Vector,
};

/// Single-column batch `{x: Int32}`
pub fn int_batch(values: &[i32]) -> RecordBatch {
    RecordBatch::try_from_columns([("x", Vector::from_values(values))])
        .expect("Failed to build batch")
}

/// Batch `{x: Int32, y: Dictionary<Int32, Utf8>}`
pub fn labeled_batch(x: &[i32], y: &[&str]) -> RecordBatch {
    let y: Vec<Option<&str>> = y.iter().copied().map(Some).collect();
    RecordBatch::try_from_columns([
        ("x", Vector::from_values(x)),
        (
            "y",
            Vector::dictionary_from_strings(&y).expect("Failed to encode labels"),
        ),
    ])
    .expect("Failed to build batch")
}

/// The two-batch table used throughout: x = 1..=8, y alternating a/b
pub fn example_table() -> Table {
    Table::from_batches(vec![
        labeled_batch(&[1, 2, 3, 4], &["a", "b", "a", "b"]),
        labeled_batch(&[5, 6, 7, 8], &["a", "b", "a", "b"]),
    ])
    .expect("Failed to build table")
}
