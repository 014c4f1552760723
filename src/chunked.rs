//! # Chunked Columns
//!
//! A [`ChunkedData`] presents an ordered list of same-typed vectors as one
//! logical column. Row addressing goes through a prefix-sum offset table
//! (`chunk_offsets[i]` is the first global row of chunk `i`, with one extra
//! trailing entry for the total length) and a binary search over it.
//!
//! Slicing never copies: chunks entirely inside the window are kept as-is,
//! chunks entirely outside it are dropped, and only the (at most two)
//! boundary chunks are sliced.

use crate::{
    data::{
        ColumnValue,
        Data,
        DataKind,
    },
    types::DataType,
    vector::{
        ArrayValues,
        Vector,
    },
    Error,
    Result,
};
use std::sync::OnceLock;
use tracing::trace;

#[derive(Debug, Clone)]
pub struct ChunkedData {
    chunks: Vec<Vector>,
    chunk_offsets: Vec<usize>,
    child_cache: Vec<OnceLock<Vector>>,
}

impl ChunkedData {
    pub(crate) fn new(data_type: &DataType, chunks: Vec<Vector>) -> Self {
        let chunk_offsets = Self::compute_offsets(&chunks);
        let child_cache =
            (0..data_type.children().len()).map(|_| OnceLock::new()).collect();
        Self { chunks, chunk_offsets, child_cache }
    }

    /// Prefix sums of chunk lengths: `N + 1` entries, starting at 0
    pub fn compute_offsets(chunks: &[Vector]) -> Vec<usize> {
        let mut offsets = Vec::with_capacity(chunks.len() + 1);
        let mut total = 0;
        offsets.push(total);
        for chunk in chunks {
            total += chunk.len();
            offsets.push(total);
        }
        offsets
    }

    pub fn chunks(&self) -> &[Vector] {
        &self.chunks
    }

    pub fn chunk_offsets(&self) -> &[usize] {
        &self.chunk_offsets
    }

    pub fn len(&self) -> usize {
        self.chunk_offsets.last().copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn view(&self) -> ChunkedView<'_> {
        ChunkedView { data: self }
    }

    pub(crate) fn slice(&self, offset: usize, length: usize) -> Result<Self> {
        let begin = offset;
        let end = offset + length;
        let mut chunks = Vec::new();

        for (index, chunk) in self.chunks.iter().enumerate() {
            let chunk_begin = self.chunk_offsets[index];
            let chunk_end = self.chunk_offsets[index + 1];
            if chunk_end <= begin || chunk_begin >= end || chunk.is_empty() {
                continue;
            }
            if chunk_begin >= begin && chunk_end <= end {
                chunks.push(chunk.clone());
                continue;
            }
            let from = begin.saturating_sub(chunk_begin);
            let to = end.min(chunk_end) - chunk_begin;
            trace!(chunk = index, from, to, "slicing boundary chunk");
            chunks.push(chunk.slice(from, to - from)?);
        }

        let chunk_offsets = Self::compute_offsets(&chunks);
        let child_cache = self.child_cache.iter().map(|_| OnceLock::new()).collect();
        Ok(Self { chunks, chunk_offsets, child_cache })
    }

    pub(crate) fn retype(&self, data_type: &DataType) -> Result<Self> {
        let chunks = self
            .chunks
            .iter()
            .map(|chunk| {
                chunk.data().clone_with_type(data_type.clone()).map(Vector::new)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(data_type, chunks))
    }

    /// The `index`-th child of every chunk, concatenated. Memoized per child.
    pub(crate) fn child_at(&self, index: usize) -> Option<Vector> {
        let slot = self.child_cache.get(index)?;
        if let Some(child) = slot.get() {
            return Some(child.clone());
        }
        let children = self
            .chunks
            .iter()
            .map(|chunk| chunk.get_child_at(index))
            .collect::<Option<Vec<_>>>()?;
        let child = Vector::concat(&children).ok()?;
        let _ = slot.set(child.clone());
        Some(child)
    }
}

/// Row addressing over a [`ChunkedData`]
#[derive(Debug, Clone, Copy)]
pub struct ChunkedView<'a> {
    data: &'a ChunkedData,
}

impl<'a> ChunkedView<'a> {
    /// Locate global row `index` as `(chunk, row within chunk)`.
    ///
    /// Returns `None` when `index` is past the end.
    pub fn locate(&self, index: usize) -> Option<(usize, usize)> {
        let offsets = &self.data.chunk_offsets;
        let mut lhs = 0;
        let mut rhs = offsets.len().checked_sub(1)?;
        while index < offsets[rhs] && index >= offsets[lhs] {
            if lhs + 1 == rhs {
                return Some((lhs, index - offsets[lhs]));
            }
            let mid = lhs + (rhs - lhs) / 2;
            if index >= offsets[mid] {
                lhs = mid;
            } else {
                rhs = mid;
            }
        }
        None
    }

    pub fn get(&self, index: usize) -> Option<ColumnValue> {
        let (chunk, row) = self.locate(index)?;
        self.data.chunks[chunk].get(row)
    }

    pub fn is_valid(&self, index: usize) -> bool {
        self.locate(index)
            .is_some_and(|(chunk, row)| self.data.chunks[chunk].is_valid(row))
    }

    /// Dictionary key at global row `index`
    pub fn get_key(&self, index: usize) -> Option<usize> {
        let (chunk, row) = self.locate(index)?;
        self.data.chunks[chunk].get_key(row)
    }

    /// Values of every chunk in order
    pub fn iter(&self) -> impl Iterator<Item = ColumnValue> + 'a {
        self.data.chunks.iter().flat_map(|chunk| chunk.iter())
    }

    /// First global row at or after `from` whose value matches `value`
    pub fn index_of(&self, value: &ColumnValue, from: usize) -> Option<usize> {
        let offsets = &self.data.chunk_offsets;
        for (index, chunk) in self.data.chunks.iter().enumerate() {
            if offsets[index + 1] <= from {
                continue;
            }
            let start = from.saturating_sub(offsets[index]);
            if let Some(row) = chunk.index_of(value, start) {
                return Some(offsets[index] + row);
            }
        }
        None
    }

    /// Materialize the whole column.
    ///
    /// A single chunk is returned as its own array. Several chunks produce
    /// one typed array when they all share a fixed-width representation,
    /// and a list of decoded values otherwise.
    pub fn to_array(&self) -> ArrayValues {
        let chunks = &self.data.chunks;
        if chunks.len() == 1 {
            return chunks[0].to_array();
        }

        let arrays: Vec<ArrayValues> = chunks.iter().map(Vector::to_array).collect();
        let typed = arrays.iter().all(|array| match (array, arrays.first()) {
            (
                ArrayValues::Typed { data_type, .. },
                Some(ArrayValues::Typed { data_type: first, .. }),
            ) => data_type == first,
            _ => false,
        });

        if typed {
            let mut data_type = None;
            let mut values = Vec::new();
            for array in arrays {
                if let ArrayValues::Typed { data_type: ty, values: bytes } = array {
                    values.extend_from_slice(&bytes);
                    data_type = Some(ty);
                }
            }
            if let Some(data_type) = data_type {
                return ArrayValues::Typed { data_type, values: values.into() };
            }
        }

        ArrayValues::Values(self.iter().collect())
    }
}

impl Data {
    /// Chunked column over `chunks`. Nested chunked inputs are flattened.
    pub fn new_chunked(data_type: DataType, chunks: Vec<Vector>) -> Result<Data> {
        let mut flat = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            if chunk.data_type() != &data_type {
                return Err(Error::TypeMismatch {
                    expected: data_type.name(),
                    actual: chunk.data_type().name(),
                });
            }
            match chunk.data().kind() {
                DataKind::Chunked(inner) => flat.extend(inner.chunks().iter().cloned()),
                _ => flat.push(chunk),
            }
        }

        let chunked = ChunkedData::new(&data_type, flat);
        let length = chunked.len();
        Data::from_parts(data_type, length, 0, None, None, DataKind::Chunked(chunked))
    }
}
