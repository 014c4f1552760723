//! # Tables
//!
//! A [`Table`] owns an ordered list of [`RecordBatch`]es sharing one schema
//! and presents them as one logical frame. Each column is exposed as a
//! single [`Vector`], chunked across batches when there is more than one.
//!
//! Queries go through the [`DataFrame`] trait:
//!
//! ```
//! use columnar_frame::{predicate::col, table::{DataFrame, Table}, RecordBatch, Vector};
//!
//! let batch = |values: &[i32]| {
//!     RecordBatch::try_from_columns([("x", Vector::from_values(values))]).unwrap()
//! };
//! let table = Table::from_batches(vec![batch(&[1, 2, 3, 4]), batch(&[5, 6, 7, 8])]).unwrap();
//!
//! assert_eq!(table.len(), 8);
//! assert_eq!(table.filter(col("x").ge(3)).count().unwrap(), 6);
//! ```
//!
//! [`Table::filter`](DataFrame::filter) is lazy: it returns a
//! [`FilteredDataFrame`] that evaluates its predicate batch by batch when
//! scanned, counted or grouped.

use crate::{
    data::{
        ColumnValue,
        Data,
        DataKind,
    },
    format::{
        FormatOptions,
        RowsToString,
    },
    predicate::{
        BoundPredicate,
        Col,
        CompiledPredicate,
        Predicate,
    },
    record_batch::RecordBatch,
    schema::{
        Field,
        Schema,
    },
    source::BatchSource,
    types::DataType,
    vector::Vector,
    Error,
    Result,
};
use std::{
    collections::BTreeMap,
    fmt,
    future::Future,
    ops::Deref,
    sync::Arc,
};
use tracing::debug;

/// Row callback of [`DataFrame::scan`]: row index within the batch, and the
/// batch
pub type NextFn<'a> = &'a mut dyn FnMut(usize, &RecordBatch);

/// Per-batch callback of [`DataFrame::scan`], run before the batch's rows
pub type BindCallback<'a> = &'a mut dyn FnMut(&RecordBatch) -> Result<()>;

/// Query operations shared by tables and filtered views
pub trait DataFrame {
    /// Lazily restrict the rows to those matching `predicate`
    fn filter(&self, predicate: Predicate) -> FilteredDataFrame;

    /// Visit every (matching) row of every batch in order
    fn scan(&self, next: NextFn<'_>, bind: Option<BindCallback<'_>>) -> Result<()>;

    /// Number of (matching) rows
    fn count(&self) -> Result<usize>;

    /// Count (matching) rows per value of a dictionary-encoded column
    fn count_by(&self, column: Col) -> Result<CountByResult>;
}

#[derive(Debug)]
pub struct Table {
    schema: Arc<Schema>,
    batches: Vec<RecordBatch>,
    union: RecordBatch,
}

impl Table {
    /// Table with no fields and no batches
    pub fn empty() -> Self {
        let schema = Arc::new(Schema::empty());
        Self { union: RecordBatch::empty(schema.clone()), schema, batches: Vec::new() }
    }

    /// Table over `batches`, each of which must have exactly `schema`
    pub fn new(schema: Arc<Schema>, batches: Vec<RecordBatch>) -> Result<Self> {
        for (index, batch) in batches.iter().enumerate() {
            if batch.schema().as_ref() != schema.as_ref() {
                return Err(Error::SchemaMismatch(format!(
                    "batch {} has {}, table has {}",
                    index,
                    batch.schema(),
                    schema
                )));
            }
        }
        Self::assemble(schema, batches)
    }

    /// Table over `batches`, taking the schema from the first one
    pub fn from_batches(batches: Vec<RecordBatch>) -> Result<Self> {
        match batches.first() {
            Some(first) => Self::new(first.schema().clone(), batches),
            None => Ok(Self::empty()),
        }
    }

    /// Collect batches from a synchronous source
    pub fn from_sources<I>(sources: I) -> Result<Self>
    where
        I: IntoIterator<Item = Result<RecordBatch>>,
    {
        let batches = sources.into_iter().collect::<Result<Vec<_>>>()?;
        Self::from_batches(batches)
    }

    /// Collect batches from an asynchronous source, awaiting each one
    pub async fn from_async<S: BatchSource>(mut source: S) -> Result<Self> {
        let mut batches = Vec::new();
        while let Some(batch) = source.next_batch().await? {
            batches.push(batch);
        }
        Self::from_batches(batches)
    }

    /// Await a source, then collect batches from it
    pub async fn from_async_future<F, S>(source: F) -> Result<Self>
    where
        F: Future<Output = Result<S>>,
        S: BatchSource,
    {
        Self::from_async(source.await?).await
    }

    /// One batch per struct vector (per chunk, for chunked struct vectors)
    pub fn from_struct(vector: &Vector) -> Result<Self> {
        let batches = match vector.data().kind() {
            DataKind::Chunked(chunked) => chunked
                .chunks()
                .iter()
                .map(RecordBatch::from_struct)
                .collect::<Result<Vec<_>>>()?,
            _ => vec![RecordBatch::from_struct(vector)?],
        };
        match vector.data_type() {
            DataType::Struct { fields } => {
                Self::new(Arc::new(Schema::new(fields.clone())), batches)
            }
            other => Err(Error::TypeMismatch {
                expected: "Struct".to_string(),
                actual: other.name(),
            }),
        }
    }

    /// Fold `batches` into the union batch; each column becomes one
    /// chunked vector when there are several batches
    fn assemble(schema: Arc<Schema>, batches: Vec<RecordBatch>) -> Result<Self> {
        let union = RecordBatch::concat_all(&schema, &batches)?;
        debug!(
            batches = batches.len(),
            rows = union.len(),
            columns = schema.len(),
            "table assembled"
        );
        Ok(Self { schema, batches, union })
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn batches(&self) -> &[RecordBatch] {
        &self.batches
    }

    pub fn len(&self) -> usize {
        self.union.len()
    }

    pub fn is_empty(&self) -> bool {
        self.union.len() == 0
    }

    pub fn num_cols(&self) -> usize {
        self.schema.len()
    }

    /// All batches folded into one, with chunked columns when there are
    /// several batches
    pub fn batches_union(&self) -> &RecordBatch {
        &self.union
    }

    /// Row `index` across all batches
    pub fn get(&self, index: usize) -> Option<Vec<ColumnValue>> {
        self.union.get(index)
    }

    /// The whole column at `index`, built once at construction
    pub fn get_column_at(&self, index: usize) -> Option<Vector> {
        self.union.get_child_at(index).cloned()
    }

    pub fn get_column(&self, name: &str) -> Option<Vector> {
        self.get_column_at(self.get_column_index(name)?)
    }

    pub fn get_column_index(&self, name: &str) -> Option<usize> {
        self.schema.index_of(name)
    }

    /// Rows in order, one `Vec` of values per row
    pub fn iter(&self) -> impl Iterator<Item = Vec<ColumnValue>> + '_ {
        self.batches
            .iter()
            .flat_map(|batch| (0..batch.len()).filter_map(move |row| batch.get(row)))
    }

    /// Project every batch onto `names`, in schema order
    pub fn select(&self, names: &[&str]) -> Result<Table> {
        let schema = Arc::new(self.schema.select(names));
        let batches = self.batches.iter().map(|batch| batch.select(names)).collect();
        Table::new(schema, batches)
    }

    pub fn rows_to_string(&self) -> RowsToString<'_> {
        RowsToString::new(self, FormatOptions::default())
    }

    pub fn rows_to_string_with(&self, options: FormatOptions) -> RowsToString<'_> {
        RowsToString::new(self, options)
    }
}

impl DataFrame for Table {
    fn filter(&self, predicate: Predicate) -> FilteredDataFrame {
        FilteredDataFrame {
            schema: self.schema.clone(),
            batches: self.batches.clone(),
            predicate,
        }
    }

    fn scan(&self, next: NextFn<'_>, mut bind: Option<BindCallback<'_>>) -> Result<()> {
        for batch in &self.batches {
            if let Some(bind) = bind.as_mut() {
                bind(batch)?;
            }
            for index in 0..batch.len() {
                next(index, batch);
            }
        }
        Ok(())
    }

    fn count(&self) -> Result<usize> {
        Ok(self.len())
    }

    fn count_by(&self, column: Col) -> Result<CountByResult> {
        count_by(&self.schema, &self.batches, None, column)
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in self.rows_to_string() {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

/// Lazy view of a table's rows matching a predicate
#[derive(Debug, Clone)]
pub struct FilteredDataFrame {
    schema: Arc<Schema>,
    batches: Vec<RecordBatch>,
    predicate: Predicate,
}

impl FilteredDataFrame {
    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Matching rows in order. The predicate binds to each batch when the
    /// iterator reaches it; a bind failure is yielded once and ends the rows.
    pub fn iter(&self) -> FilteredRows<'_> {
        FilteredRows {
            batches: self.batches.iter(),
            compiled: self.predicate.compile(),
            current: None,
            row: 0,
        }
    }

    fn scan_with(
        &self,
        next: NextFn<'_>,
        mut bind: Option<BindCallback<'_>>,
    ) -> Result<()> {
        let mut compiled = self.predicate.compile();
        for batch in &self.batches {
            if let Some(bind) = bind.as_mut() {
                bind(batch)?;
            }
            let predicate = compiled.bind(batch)?;
            if predicate.is_always_false() {
                continue;
            }
            for index in 0..batch.len() {
                if predicate.test(index, batch) {
                    next(index, batch);
                }
            }
        }
        Ok(())
    }
}

/// Iterator over the rows of a [`FilteredDataFrame`]
pub struct FilteredRows<'a> {
    batches: std::slice::Iter<'a, RecordBatch>,
    compiled: CompiledPredicate,
    current: Option<(&'a RecordBatch, BoundPredicate)>,
    row: usize,
}

impl Iterator for FilteredRows<'_> {
    type Item = Result<Vec<ColumnValue>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((batch, predicate)) = &self.current {
                while self.row < batch.len() {
                    let index = self.row;
                    self.row += 1;
                    if predicate.test(index, batch) {
                        if let Some(row) = batch.get(index) {
                            return Some(Ok(row));
                        }
                    }
                }
                self.current = None;
            }

            let batch = self.batches.next()?;
            match self.compiled.bind(batch) {
                Ok(predicate) if predicate.is_always_false() => {}
                Ok(predicate) => {
                    self.current = Some((batch, predicate));
                    self.row = 0;
                }
                Err(error) => {
                    self.batches = Default::default();
                    return Some(Err(error));
                }
            }
        }
    }
}

impl DataFrame for FilteredDataFrame {
    fn filter(&self, predicate: Predicate) -> FilteredDataFrame {
        FilteredDataFrame {
            schema: self.schema.clone(),
            batches: self.batches.clone(),
            predicate: self.predicate.clone().and(predicate),
        }
    }

    fn scan(&self, next: NextFn<'_>, bind: Option<BindCallback<'_>>) -> Result<()> {
        self.scan_with(next, bind)
    }

    fn count(&self) -> Result<usize> {
        let mut count = 0;
        self.scan_with(&mut |_: usize, _: &RecordBatch| count += 1, None)?;
        Ok(count)
    }

    fn count_by(&self, column: Col) -> Result<CountByResult> {
        count_by(&self.schema, &self.batches, Some(&self.predicate), column)
    }
}

fn count_by(
    schema: &Schema,
    batches: &[RecordBatch],
    predicate: Option<&Predicate>,
    column: Col,
) -> Result<CountByResult> {
    let Some(last) = batches.last() else {
        let index = schema
            .index_of(column.name())
            .ok_or_else(|| Error::ColumnNotFound(column.name().to_string()))?;
        return match schema.fields()[index].data_type() {
            DataType::Dictionary { value_type, .. } => {
                CountByResult::new(Vector::new(Data::empty(value_type)), Vec::new())
            }
            other => Err(Error::NotDictionaryEncoded {
                column: column.name().to_string(),
                actual: other.name(),
            }),
        };
    };

    let mut binding = column.binding();
    let vector = binding.bind(last)?;
    let dictionary = vector
        .dictionary()
        .ok_or_else(|| Error::NotDictionaryEncoded {
            column: column.name().to_string(),
            actual: vector.data_type().name(),
        })?
        .clone();
    let mut counts = vec![0u32; dictionary.len()];
    debug!(column = column.name(), keys = counts.len(), "countBy sized from last dictionary");

    let mut compiled = predicate.map(Predicate::compile);
    for batch in batches {
        let vector = binding.bind(batch)?;
        if !vector.is_dictionary() {
            return Err(Error::NotDictionaryEncoded {
                column: column.name().to_string(),
                actual: vector.data_type().name(),
            });
        }
        let filter = match compiled.as_mut() {
            Some(compiled) => compiled.bind(batch)?,
            None => BoundPredicate::Const(true),
        };
        if filter.is_always_false() {
            continue;
        }
        for index in 0..batch.len() {
            if !filter.test(index, batch) {
                continue;
            }
            if let Some(key) = vector.get_key(index) {
                let slot = counts.get_mut(key).ok_or_else(|| {
                    Error::Validation(format!(
                        "Dictionary key {} out of range for dictionary of length {}",
                        key,
                        dictionary.len()
                    ))
                })?;
                *slot += 1;
            }
        }
    }

    CountByResult::new(dictionary, counts)
}

/// Per-value counts from [`DataFrame::count_by`]: a two-column table of
/// dictionary `values` and their `counts`
#[derive(Debug)]
pub struct CountByResult {
    table: Table,
}

impl CountByResult {
    fn new(values: Vector, counts: Vec<u32>) -> Result<Self> {
        let schema = Arc::new(Schema::new(vec![
            Field::new("values", values.data_type().clone()),
            Field::new("counts", DataType::uint32()),
        ]));
        let batch = RecordBatch::new(schema.clone(), vec![values, Vector::from_values(&counts)])?;
        Ok(Self { table: Table::new(schema, vec![batch])? })
    }

    pub fn values(&self) -> Option<Vector> {
        self.table.get_column_at(0)
    }

    pub fn counts(&self) -> Option<Vector> {
        self.table.get_column_at(1)
    }

    /// `(value, count)` for every dictionary entry, in key order
    pub fn to_pairs(&self) -> Vec<(ColumnValue, u32)> {
        self.table
            .iter()
            .filter_map(|row| {
                let mut row = row.into_iter();
                let value = row.next()?;
                let count = row.next()?.as_i64()?;
                Some((value, u32::try_from(count).ok()?))
            })
            .collect()
    }

    /// Counts keyed by the value's display string
    pub fn to_map(&self) -> BTreeMap<String, u32> {
        self.to_pairs()
            .into_iter()
            .map(|(value, count)| (value.to_string(), count))
            .collect()
    }
}

impl Deref for CountByResult {
    type Target = Table;

    fn deref(&self) -> &Table {
        &self.table
    }
}
