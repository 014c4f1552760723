//! # columnar-frame
//!
//! In-memory columnar tables with zero-copy slicing, multi-batch column
//! addressing and compiled row predicates.
//!
//! - [`data`] holds one column chunk: a header with a lazily counted validity
//!   bitmap over a flat, boolean, variable-length, dictionary, struct, list
//!   or union payload.
//! - [`chunked`] joins per-batch chunks of a field into one logical column.
//! - [`predicate`] builds `col("x").ge(3)` style expressions and binds them
//!   to a batch as a per-row test.
//! - [`table`] scans, filters, counts and groups over a sequence of
//!   [`RecordBatch`]es.

pub mod bit;
pub mod chunked;
pub mod data;
pub mod error;
pub mod format;
pub mod predicate;
pub mod record_batch;
pub mod schema;
pub mod source;
pub mod table;
pub mod types;
pub mod vector;

pub use data::{
    ColumnValue,
    Data,
    DataKind,
    DataRef,
};
pub use error::{
    Error,
    Result,
};
pub use format::{
    FormatOptions,
    RowsToString,
};
pub use predicate::{
    col,
    custom,
    lit,
    Col,
    Predicate,
    Value,
};
pub use record_batch::RecordBatch;
pub use schema::{
    Field,
    Schema,
};
pub use source::{
    BatchSource,
    IterSource,
};
pub use table::{
    CountByResult,
    DataFrame,
    FilteredDataFrame,
    FilteredRows,
    Table,
};
pub use types::DataType;
pub use vector::Vector;
