//! Asynchronous batch sources consumed by [`Table::from_async`].
//!
//! [`Table::from_async`]: crate::table::Table::from_async

use crate::{
    record_batch::RecordBatch,
    Result,
};
use async_trait::async_trait;
use tokio::sync::mpsc;

/// A stream of record batches, pulled one at a time.
///
/// `Ok(None)` ends the stream.
#[async_trait]
pub trait BatchSource: Send {
    async fn next_batch(&mut self) -> Result<Option<RecordBatch>>;
}

#[async_trait]
impl BatchSource for mpsc::Receiver<Result<RecordBatch>> {
    async fn next_batch(&mut self) -> Result<Option<RecordBatch>> {
        self.recv().await.transpose()
    }
}

#[async_trait]
impl BatchSource for mpsc::UnboundedReceiver<Result<RecordBatch>> {
    async fn next_batch(&mut self) -> Result<Option<RecordBatch>> {
        self.recv().await.transpose()
    }
}

/// Adapter serving batches from a synchronous iterator without suspending
pub struct IterSource<I> {
    iter: I,
}

impl<I> IterSource<I>
where
    I: Iterator<Item = Result<RecordBatch>> + Send,
{
    pub fn new<T>(batches: T) -> Self
    where
        T: IntoIterator<IntoIter = I>,
    {
        Self { iter: batches.into_iter() }
    }
}

#[async_trait]
impl<I> BatchSource for IterSource<I>
where
    I: Iterator<Item = Result<RecordBatch>> + Send,
{
    async fn next_batch(&mut self) -> Result<Option<RecordBatch>> {
        self.iter.next().transpose()
    }
}
