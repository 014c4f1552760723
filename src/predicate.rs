//! # Predicates
//!
//! Filters are built as an unbound expression tree of [`Value`]s
//! ([`col`], [`lit`]) and [`Predicate`]s, then compiled and bound against
//! one [`RecordBatch`] at a time to produce a per-row test.
//!
//! ```
//! use columnar_frame::predicate::{col, lit};
//!
//! let p = col("x").ge(3).and(col("y").eq("a")).or(lit(1).eq(1).not());
//! assert_eq!(p.ands().len(), 1);
//! ```
//!
//! ## Binding
//!
//! [`Predicate::compile`] returns a [`CompiledPredicate`] owning all
//! bind-time caches, so the same tree can be compiled any number of times
//! without cross-talk. Binding a compiled predicate to a batch resolves
//! column references (by name on first bind, cached by index afterwards) and
//! picks a specialized closure per comparison:
//!
//! - literal vs literal folds to a constant
//! - column vs column reads both columns per row
//! - column vs literal (either order) reads one column per row, except that
//!   `Equals` on a dictionary column reverse-looks-up the literal once and
//!   then compares keys
//!
//! The dictionary key is cached per dictionary identity, so batches sharing
//! a dictionary skip the lookup. A literal absent from the dictionary binds
//! to a constant `false`.
//!
//! Comparisons involving a null are false. `lt`, `gt` and `ne` are the
//! negations of `ge`, `le` and `eq`, so they match null rows.

use crate::{
    data::{
        ColumnValue,
        DataKind,
    },
    record_batch::RecordBatch,
    vector::Vector,
    Error,
    Result,
};
use chrono::{
    NaiveDate,
    NaiveDateTime,
};
use std::{
    cmp::Ordering,
    fmt,
    sync::Arc,
};
use tracing::trace;

/// Per-row test produced by binding
pub type PredicateFn = Arc<dyn Fn(usize, &RecordBatch) -> bool + Send + Sync>;

/// Bind-time side effect of a [`custom`] predicate
pub type BindFn = Arc<dyn Fn(&RecordBatch) + Send + Sync>;

/// Reference to a column by name
#[derive(Debug, Clone)]
pub struct Col {
    name: String,
}

impl Col {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolve this column in `batch` by name
    pub fn bind(&self, batch: &RecordBatch) -> Result<Vector> {
        batch
            .column_by_name(&self.name)
            .cloned()
            .ok_or_else(|| Error::ColumnNotFound(self.name.clone()))
    }

    pub fn eq(self, other: impl Into<Value>) -> Predicate {
        Value::from(self).eq(other)
    }

    pub fn le(self, other: impl Into<Value>) -> Predicate {
        Value::from(self).le(other)
    }

    pub fn ge(self, other: impl Into<Value>) -> Predicate {
        Value::from(self).ge(other)
    }

    pub fn lt(self, other: impl Into<Value>) -> Predicate {
        Value::from(self).lt(other)
    }

    pub fn gt(self, other: impl Into<Value>) -> Predicate {
        Value::from(self).gt(other)
    }

    pub fn ne(self, other: impl Into<Value>) -> Predicate {
        Value::from(self).ne(other)
    }

    pub(crate) fn binding(&self) -> ColumnBinding {
        ColumnBinding { name: self.name.clone(), index: None }
    }
}

/// Operand of a comparison
#[derive(Debug, Clone)]
pub enum Value {
    Literal(ColumnValue),
    Column(Col),
}

impl Value {
    pub fn eq(self, other: impl Into<Value>) -> Predicate {
        Predicate::Equals(self, other.into())
    }

    pub fn le(self, other: impl Into<Value>) -> Predicate {
        Predicate::LtEq(self, other.into())
    }

    pub fn ge(self, other: impl Into<Value>) -> Predicate {
        Predicate::GtEq(self, other.into())
    }

    pub fn lt(self, other: impl Into<Value>) -> Predicate {
        self.ge(other).not()
    }

    pub fn gt(self, other: impl Into<Value>) -> Predicate {
        self.le(other).not()
    }

    pub fn ne(self, other: impl Into<Value>) -> Predicate {
        self.eq(other).not()
    }
}

impl From<Col> for Value {
    fn from(col: Col) -> Self {
        Value::Column(col)
    }
}

macro_rules! impl_literal_value {
    ($($type:ty),* $(,)?) => {
        $(
            impl From<$type> for Value {
                fn from(value: $type) -> Self {
                    Value::Literal(value.into())
                }
            }
        )*
    };
}

impl_literal_value!(
    ColumnValue,
    i8,
    i16,
    i32,
    i64,
    u8,
    u16,
    u32,
    u64,
    f32,
    f64,
    bool,
    &str,
    String,
    NaiveDate,
    NaiveDateTime,
);

/// Column reference
pub fn col(name: impl Into<String>) -> Col {
    Col { name: name.into() }
}

/// Literal operand
pub fn lit(value: impl Into<ColumnValue>) -> Value {
    Value::Literal(value.into())
}

/// Predicate from a caller-supplied row test.
///
/// `bind` runs every time the predicate is bound to a batch, before rows of
/// that batch are tested with `next`.
pub fn custom<N, B>(next: N, bind: B) -> Predicate
where
    N: Fn(usize, &RecordBatch) -> bool + Send + Sync + 'static,
    B: Fn(&RecordBatch) + Send + Sync + 'static,
{
    Predicate::Custom { next: Arc::new(next), bind: Arc::new(bind) }
}

#[derive(Clone)]
pub enum Predicate {
    Equals(Value, Value),
    LtEq(Value, Value),
    GtEq(Value, Value),
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
    Not(Box<Predicate>),
    Custom { next: PredicateFn, bind: BindFn },
}

impl Predicate {
    pub fn and(self, other: Predicate) -> Predicate {
        Predicate::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Predicate) -> Predicate {
        Predicate::Or(Box::new(self), Box::new(other))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Predicate {
        Predicate::Not(Box::new(self))
    }

    /// The clauses of a conjunction chain, left to right. A predicate that
    /// is not an `And` is its own single clause.
    pub fn ands(&self) -> Vec<&Predicate> {
        match self {
            Predicate::And(left, right) => {
                let mut clauses = left.ands();
                clauses.extend(right.ands());
                clauses
            }
            other => vec![other],
        }
    }

    /// Fresh compiled form with empty bind caches
    pub fn compile(&self) -> CompiledPredicate {
        CompiledPredicate { root: Node::compile(self) }
    }

    /// One-shot bind; prefer [`CompiledPredicate`] when binding many batches
    pub fn bind(&self, batch: &RecordBatch) -> Result<BoundPredicate> {
        self.compile().bind(batch)
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Equals(l, r) => f.debug_tuple("Equals").field(l).field(r).finish(),
            Predicate::LtEq(l, r) => f.debug_tuple("LtEq").field(l).field(r).finish(),
            Predicate::GtEq(l, r) => f.debug_tuple("GtEq").field(l).field(r).finish(),
            Predicate::And(l, r) => f.debug_tuple("And").field(l).field(r).finish(),
            Predicate::Or(l, r) => f.debug_tuple("Or").field(l).field(r).finish(),
            Predicate::Not(p) => f.debug_tuple("Not").field(p).finish(),
            Predicate::Custom { .. } => f.write_str("Custom"),
        }
    }
}

/// Result of binding a predicate to one batch
#[derive(Clone)]
pub enum BoundPredicate {
    /// Same answer for every row
    Const(bool),
    Func(PredicateFn),
}

impl BoundPredicate {
    #[inline]
    pub fn test(&self, index: usize, batch: &RecordBatch) -> bool {
        match self {
            BoundPredicate::Const(value) => *value,
            BoundPredicate::Func(f) => f(index, batch),
        }
    }

    /// Whether no row of the bound batch can match
    pub fn is_always_false(&self) -> bool {
        matches!(self, BoundPredicate::Const(false))
    }

    fn not(self) -> BoundPredicate {
        match self {
            BoundPredicate::Const(value) => BoundPredicate::Const(!value),
            BoundPredicate::Func(f) => {
                BoundPredicate::Func(Arc::new(move |index, batch| !f(index, batch)))
            }
        }
    }

    fn and(self, other: BoundPredicate) -> BoundPredicate {
        match (self, other) {
            (BoundPredicate::Const(false), _) | (_, BoundPredicate::Const(false)) => {
                BoundPredicate::Const(false)
            }
            (BoundPredicate::Const(true), p) | (p, BoundPredicate::Const(true)) => p,
            (BoundPredicate::Func(l), BoundPredicate::Func(r)) => BoundPredicate::Func(
                Arc::new(move |index, batch| l(index, batch) && r(index, batch)),
            ),
        }
    }

    fn or(self, other: BoundPredicate) -> BoundPredicate {
        match (self, other) {
            (BoundPredicate::Const(true), _) | (_, BoundPredicate::Const(true)) => {
                BoundPredicate::Const(true)
            }
            (BoundPredicate::Const(false), p) | (p, BoundPredicate::Const(false)) => p,
            (BoundPredicate::Func(l), BoundPredicate::Func(r)) => BoundPredicate::Func(
                Arc::new(move |index, batch| l(index, batch) || r(index, batch)),
            ),
        }
    }
}

impl fmt::Debug for BoundPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundPredicate::Const(value) => f.debug_tuple("Const").field(value).finish(),
            BoundPredicate::Func(_) => f.write_str("Func"),
        }
    }
}

/// Column reference with its index cached after the first bind
#[derive(Debug, Clone)]
pub(crate) struct ColumnBinding {
    name: String,
    index: Option<usize>,
}

impl ColumnBinding {
    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn bind(&mut self, batch: &RecordBatch) -> Result<Vector> {
        let index = match self.index {
            Some(index) => index,
            None => {
                let index = batch
                    .schema()
                    .index_of(&self.name)
                    .ok_or_else(|| Error::ColumnNotFound(self.name.clone()))?;
                self.index = Some(index);
                index
            }
        };
        batch
            .get_child_at(index)
            .cloned()
            .ok_or_else(|| Error::ColumnNotFound(self.name.clone()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompareOp {
    Equals,
    LtEq,
    GtEq,
}

impl CompareOp {
    fn eval(self, left: &ColumnValue, right: &ColumnValue) -> bool {
        match self {
            CompareOp::Equals => left.matches(right),
            CompareOp::LtEq => {
                matches!(left.compare(right), Some(Ordering::Less | Ordering::Equal))
            }
            CompareOp::GtEq => {
                matches!(left.compare(right), Some(Ordering::Greater | Ordering::Equal))
            }
        }
    }

    /// The operator with its operands swapped: `a <= b` is `b >= a`
    fn flip(self) -> CompareOp {
        match self {
            CompareOp::Equals => CompareOp::Equals,
            CompareOp::LtEq => CompareOp::GtEq,
            CompareOp::GtEq => CompareOp::LtEq,
        }
    }
}

enum Operand {
    Literal(ColumnValue),
    Column(ColumnBinding),
}

impl Operand {
    fn compile(value: &Value) -> Operand {
        match value {
            Value::Literal(v) => Operand::Literal(v.clone()),
            Value::Column(col) => Operand::Column(col.binding()),
        }
    }
}

struct DictionaryKeyCache {
    dictionary: Vector,
    key: Option<usize>,
}

enum Node {
    Compare {
        op: CompareOp,
        left: Operand,
        right: Operand,
        cache: Option<DictionaryKeyCache>,
    },
    And(Box<Node>, Box<Node>),
    Or(Box<Node>, Box<Node>),
    Not(Box<Node>),
    Custom { next: PredicateFn, bind: BindFn },
}

impl Node {
    fn compile(predicate: &Predicate) -> Node {
        let compare = |op, left: &Value, right: &Value| Node::Compare {
            op,
            left: Operand::compile(left),
            right: Operand::compile(right),
            cache: None,
        };
        match predicate {
            Predicate::Equals(l, r) => compare(CompareOp::Equals, l, r),
            Predicate::LtEq(l, r) => compare(CompareOp::LtEq, l, r),
            Predicate::GtEq(l, r) => compare(CompareOp::GtEq, l, r),
            Predicate::And(l, r) => {
                Node::And(Box::new(Node::compile(l)), Box::new(Node::compile(r)))
            }
            Predicate::Or(l, r) => {
                Node::Or(Box::new(Node::compile(l)), Box::new(Node::compile(r)))
            }
            Predicate::Not(p) => Node::Not(Box::new(Node::compile(p))),
            Predicate::Custom { next, bind } => {
                Node::Custom { next: next.clone(), bind: bind.clone() }
            }
        }
    }

    fn bind(&mut self, batch: &RecordBatch) -> Result<BoundPredicate> {
        match self {
            Node::Compare { op, left, right, cache } => match (left, right) {
                (Operand::Literal(a), Operand::Literal(b)) => {
                    Ok(BoundPredicate::Const(op.eval(a, b)))
                }
                (Operand::Column(a), Operand::Column(b)) => {
                    let left = a.bind(batch)?;
                    let right = b.bind(batch)?;
                    let op = *op;
                    Ok(BoundPredicate::Func(Arc::new(move |index, _| {
                        match (left.get(index), right.get(index)) {
                            (Some(l), Some(r)) => op.eval(&l, &r),
                            _ => false,
                        }
                    })))
                }
                (Operand::Column(column), Operand::Literal(value)) => {
                    bind_col_lit(*op, column, value, cache, batch)
                }
                (Operand::Literal(value), Operand::Column(column)) => {
                    bind_col_lit(op.flip(), column, value, cache, batch)
                }
            },
            Node::And(left, right) => {
                let left = left.bind(batch)?;
                let right = right.bind(batch)?;
                Ok(left.and(right))
            }
            Node::Or(left, right) => {
                let left = left.bind(batch)?;
                let right = right.bind(batch)?;
                Ok(left.or(right))
            }
            Node::Not(inner) => Ok(inner.bind(batch)?.not()),
            Node::Custom { next, bind } => {
                bind(batch);
                Ok(BoundPredicate::Func(next.clone()))
            }
        }
    }
}

fn bind_col_lit(
    op: CompareOp,
    column: &mut ColumnBinding,
    value: &ColumnValue,
    cache: &mut Option<DictionaryKeyCache>,
    batch: &RecordBatch,
) -> Result<BoundPredicate> {
    let vector = column.bind(batch)?;

    // chunked columns may mix dictionaries, so only direct dictionary data
    // can compare keys
    let dictionary = match vector.data().kind() {
        DataKind::Dictionary(dictionary) if op == CompareOp::Equals => {
            Some(dictionary.dictionary().clone())
        }
        _ => None,
    };
    if let Some(dictionary) = dictionary {
        let key = match cache {
            Some(cached) if cached.dictionary.ptr_eq(&dictionary) => cached.key,
            _ => {
                let key = dictionary.index_of(value, 0);
                trace!(column = column.name(), ?key, "dictionary reverse lookup");
                *cache = Some(DictionaryKeyCache { dictionary, key });
                key
            }
        };
        return Ok(match key {
            None => BoundPredicate::Const(false),
            Some(key) => BoundPredicate::Func(Arc::new(move |index, _| {
                vector.get_key(index) == Some(key)
            })),
        });
    }

    let value = value.clone();
    Ok(BoundPredicate::Func(Arc::new(move |index, _| {
        vector.get(index).is_some_and(|cell| op.eval(&cell, &value))
    })))
}

/// A predicate with its own bind-time caches.
///
/// Column indices resolved on the first bind are reused for later batches,
/// as is the dictionary key of each dictionary comparison while the batches
/// share a dictionary.
pub struct CompiledPredicate {
    root: Node,
}

impl CompiledPredicate {
    pub fn bind(&mut self, batch: &RecordBatch) -> Result<BoundPredicate> {
        self.root.bind(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{
        AtomicUsize,
        Ordering as AtomicOrdering,
    };

    fn batch() -> RecordBatch {
        RecordBatch::try_from_columns([
            ("x", Vector::from_options(&[Some(1i32), Some(2), None, Some(4)])),
            ("y", Vector::from_values(&[4i64, 2, 1, 1])),
            (
                "s",
                Vector::dictionary_from_strings(&[Some("a"), Some("b"), None, Some("a")])
                    .unwrap(),
            ),
        ])
        .unwrap()
    }

    fn matches(predicate: &Predicate, batch: &RecordBatch) -> Vec<usize> {
        let bound = predicate.bind(batch).unwrap();
        (0..batch.len()).filter(|i| bound.test(*i, batch)).collect()
    }

    #[test]
    fn test_comparisons() {
        let batch = batch();
        assert_eq!(matches(&col("x").eq(2), &batch), vec![1]);
        assert_eq!(matches(&col("x").le(2), &batch), vec![0, 1]);
        assert_eq!(matches(&col("x").ge(2), &batch), vec![1, 3]);
    }

    #[test]
    fn test_derived_negations_match_nulls() {
        let batch = batch();
        assert_eq!(matches(&col("x").lt(2), &batch), vec![0, 2]);
        assert_eq!(matches(&col("x").gt(2), &batch), vec![2, 3]);
        assert_eq!(matches(&col("x").ne(2), &batch), vec![0, 2, 3]);
    }

    #[test]
    fn test_lit_col_is_flipped() {
        let batch = batch();
        assert_eq!(matches(&lit(2).le(col("x")), &batch), vec![1, 3]);
        assert_eq!(matches(&lit(2).ge(col("x")), &batch), vec![0, 1]);
        assert_eq!(matches(&lit(4).eq(col("x")), &batch), vec![3]);
    }

    #[test]
    fn test_col_col() {
        let batch = batch();
        assert_eq!(matches(&col("x").ge(col("y")), &batch), vec![1, 3]);
    }

    #[test]
    fn test_lit_lit_folds() {
        let batch = batch();
        assert!(matches!(lit(1).eq(1).bind(&batch).unwrap(), BoundPredicate::Const(true)));
        assert!(lit(1).gt(2).bind(&batch).unwrap().is_always_false());
    }

    #[test]
    fn test_combinators() {
        let batch = batch();
        let p = col("x").ge(2).and(col("y").eq(1));
        assert_eq!(matches(&p, &batch), vec![3]);
        let p = col("x").eq(1).or(col("s").eq("b"));
        assert_eq!(matches(&p, &batch), vec![0, 1]);
        assert!(col("x").eq(1).and(lit(0).eq(1)).bind(&batch).unwrap().is_always_false());
    }

    #[test]
    fn test_dictionary_fast_path() {
        let batch = batch();
        assert_eq!(matches(&col("s").eq("a"), &batch), vec![0, 3]);
        assert_eq!(matches(&lit("a").eq(col("s")), &batch), vec![0, 3]);
        assert!(col("s").eq("zzz").bind(&batch).unwrap().is_always_false());
        assert_eq!(matches(&col("s").ne("a"), &batch), vec![1, 2]);
    }

    #[test]
    fn test_chunked_dictionaries_compare_values() {
        let keys = Vector::from_values(&[0i32, 1]);
        let dictionary = |values: &[&str]| Vector::from_strings(values).unwrap();
        let forward = Vector::new_dictionary(&keys, dictionary(&["a", "b"])).unwrap();
        let reversed = Vector::new_dictionary(&keys, dictionary(&["b", "a"])).unwrap();
        let batch = RecordBatch::try_from_columns([(
            "y",
            Vector::concat(&[forward, reversed]).unwrap(),
        )])
        .unwrap();
        assert_eq!(matches(&col("y").eq("a"), &batch), vec![0, 3]);
        assert_eq!(matches(&col("y").eq("b"), &batch), vec![1, 2]);
        assert_eq!(matches(&col("y").ne("a"), &batch), vec![1, 2]);
    }

    #[test]
    fn test_dictionary_key_cached_by_identity() {
        let batch = batch();
        let mut compiled = col("s").eq("b").compile();
        compiled.bind(&batch).unwrap();
        let Node::Compare { cache: Some(first), .. } = &compiled.root else {
            panic!("expected cached key");
        };
        let first = first.dictionary.clone();
        compiled.bind(&batch.slice(1, 2).unwrap()).unwrap();
        let Node::Compare { cache: Some(second), .. } = &compiled.root else {
            panic!("expected cached key");
        };
        assert!(second.dictionary.ptr_eq(&first));
        assert_eq!(second.key, Some(1));
    }

    #[test]
    fn test_unknown_column() {
        let batch = batch();
        let result = col("missing").eq(1).bind(&batch);
        assert!(matches!(result, Err(Error::ColumnNotFound(name)) if name == "missing"));
    }

    #[test]
    fn test_column_index_cached_across_batches() {
        let batch = batch();
        let mut compiled = col("y").eq(1).compile();
        compiled.bind(&batch).unwrap();

        let narrower = batch.select(&["x"]);
        assert!(matches!(compiled.bind(&narrower), Err(Error::ColumnNotFound(_))));
    }

    #[test]
    fn test_custom_predicate_binds_per_batch() {
        let batch = batch();
        let binds = Arc::new(AtomicUsize::new(0));
        let counter = binds.clone();
        let p = custom(
            |index, _| index % 2 == 0,
            move |_| {
                counter.fetch_add(1, AtomicOrdering::SeqCst);
            },
        );
        let mut compiled = p.compile();
        let bound = compiled.bind(&batch).unwrap();
        compiled.bind(&batch).unwrap();
        assert_eq!(binds.load(AtomicOrdering::SeqCst), 2);
        assert!(bound.test(0, &batch));
        assert!(!bound.test(1, &batch));
    }

    #[test]
    fn test_ands_flattens() {
        let p = col("a").eq(1).and(col("b").eq(2)).and(col("c").eq(3).or(col("d").eq(4)));
        let clauses = p.ands();
        assert_eq!(clauses.len(), 3);
        assert!(matches!(clauses[2], Predicate::Or(_, _)));
        assert_eq!(col("a").eq(1).ands().len(), 1);
    }
}
