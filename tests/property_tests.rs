// Property-based tests for bit accounting, slicing, chunked addressing and
// predicate evaluation

use columnar_frame::{
    bit,
    col,
    ColumnValue,
    DataFrame,
    RecordBatch,
    Table,
    Vector,
};
use proptest::prelude::*;

fn naive_popcnt(data: &[u8], lhs: usize, rhs: usize) -> usize {
    (lhs..rhs).filter(|index| data[index / 8] & (1 << (index % 8)) != 0).count()
}

/// Random bitmap plus an ordered triple of bit positions inside it
fn bitmap_and_bounds() -> impl Strategy<Value = (Vec<u8>, usize, usize, usize)> {
    prop::collection::vec(any::<u8>(), 1..64).prop_flat_map(|data| {
        let bits = data.len() * 8;
        (Just(data), 0..=bits, 0..=bits, 0..=bits).prop_map(|(data, a, b, c)| {
            let mut bounds = [a, b, c];
            bounds.sort_unstable();
            (data, bounds[0], bounds[1], bounds[2])
        })
    })
}

/// Nullable values plus a non-empty window inside them
fn values_and_window() -> impl Strategy<Value = (Vec<Option<i32>>, usize, usize)> {
    prop::collection::vec(prop::option::of(any::<i32>()), 1..200).prop_flat_map(|values| {
        let len = values.len();
        (Just(values), 0..len).prop_flat_map(move |(values, offset)| {
            (Just(values), Just(offset), 1..=len - offset)
        })
    })
}

fn labeled_table(chunks: &[Vec<(i32, u8)>]) -> Table {
    let alphabet = ["a", "b", "c", "d"];
    let batches = chunks
        .iter()
        .map(|rows| {
            let x: Vec<i32> = rows.iter().map(|(x, _)| *x).collect();
            let y: Vec<Option<&str>> =
                rows.iter().map(|(_, y)| Some(alphabet[*y as usize % 4])).collect();
            RecordBatch::try_from_columns([
                ("x", Vector::from_values(&x)),
                ("y", Vector::dictionary_from_strings(&y).unwrap()),
            ])
            .unwrap()
        })
        .collect();
    Table::from_batches(batches).unwrap()
}

/// Batches of nullable keys, each batch with its own ordering of the
/// dictionary `a..d`
fn shuffled_dictionary_chunks(
) -> impl Strategy<Value = Vec<(Vec<&'static str>, Vec<Option<i32>>)>> {
    prop::collection::vec(
        (
            Just(vec!["a", "b", "c", "d"]).prop_shuffle(),
            prop::collection::vec(prop::option::of(0i32..4), 0..20),
        ),
        1..5,
    )
}

fn scanned_rows(frame: &dyn DataFrame) -> Vec<Vec<ColumnValue>> {
    let mut rows = Vec::new();
    frame
        .scan(
            &mut |index: usize, batch: &RecordBatch| rows.push(batch.get(index).unwrap()),
            None,
        )
        .unwrap();
    rows
}

proptest! {
    #[test]
    fn prop_popcnt_matches_naive((data, lhs, _, rhs) in bitmap_and_bounds()) {
        prop_assert_eq!(bit::popcnt_bit_range(&data, lhs, rhs), naive_popcnt(&data, lhs, rhs));
    }

    #[test]
    fn prop_popcnt_composes((data, lhs, mid, rhs) in bitmap_and_bounds()) {
        prop_assert_eq!(
            bit::popcnt_bit_range(&data, lhs, rhs),
            bit::popcnt_bit_range(&data, lhs, mid) + bit::popcnt_bit_range(&data, mid, rhs)
        );
    }

    #[test]
    fn prop_null_count_of_window((values, offset, length) in values_and_window()) {
        let vector = Vector::from_options(&values);
        let window = vector.slice(offset, length).unwrap();
        let expected = values[offset..offset + length].iter().filter(|v| v.is_none()).count();
        prop_assert_eq!(window.null_count(), expected);
        for (index, value) in values[offset..offset + length].iter().enumerate() {
            prop_assert_eq!(window.is_valid(index), value.is_some());
        }
    }

    #[test]
    fn prop_slice_whole_is_identity(values in prop::collection::vec(prop::option::of(any::<i64>()), 1..100)) {
        let vector = Vector::from_options(&values);
        let whole = vector.slice(0, vector.len()).unwrap();
        prop_assert_eq!(whole.len(), vector.len());
        prop_assert_eq!(whole.null_count(), vector.null_count());
        prop_assert_eq!(whole.to_vec(), vector.to_vec());
    }

    #[test]
    fn prop_chunked_get_matches_linear_scan(
        chunks in prop::collection::vec(prop::collection::vec(any::<i32>(), 0..20), 1..8)
    ) {
        let parts: Vec<Vector> = chunks.iter().map(|chunk| Vector::from_values(chunk)).collect();
        let joined = Vector::concat(&parts).unwrap();
        let total: usize = chunks.iter().map(Vec::len).sum();
        prop_assert_eq!(joined.len(), total);

        for index in 0..total {
            let mut local = index;
            let mut expected = None;
            for chunk in &chunks {
                if local < chunk.len() {
                    expected = Some(ColumnValue::from(chunk[local]));
                    break;
                }
                local -= chunk.len();
            }
            prop_assert_eq!(joined.get(index), expected);
        }
        prop_assert_eq!(joined.get(total), None);
    }

    #[test]
    fn prop_dictionary_equals_matches_naive(
        keys in prop::collection::vec(prop::option::of(0usize..4), 1..100),
        literal in prop::sample::select(vec!["a", "b", "c", "d", "zz"]),
    ) {
        let alphabet = ["a", "b", "c", "d"];
        let strings: Vec<Option<&str>> = keys.iter().map(|key| key.map(|k| alphabet[k])).collect();
        let batch = RecordBatch::try_from_columns([
            ("y", Vector::dictionary_from_strings(&strings).unwrap()),
        ])
        .unwrap();

        let bound = col("y").eq(literal).bind(&batch).unwrap();
        for (index, value) in strings.iter().enumerate() {
            prop_assert_eq!(bound.test(index, &batch), *value == Some(literal));
        }
    }

    #[test]
    fn prop_dictionary_equals_across_batches(
        chunks in shuffled_dictionary_chunks(),
        literal in prop::sample::select(vec!["a", "b", "c", "d", "zz"]),
    ) {
        let batches: Vec<RecordBatch> = chunks
            .iter()
            .map(|(dictionary, keys)| {
                let y = Vector::new_dictionary(
                    &Vector::from_options(keys),
                    Vector::from_strings(dictionary).unwrap(),
                )
                .unwrap();
                RecordBatch::try_from_columns([("y", y)]).unwrap()
            })
            .collect();
        let expected: Vec<bool> = chunks
            .iter()
            .flat_map(|(dictionary, keys)| {
                keys.iter().map(move |key| key.is_some_and(|k| dictionary[k as usize] == literal))
            })
            .collect();
        let table = Table::from_batches(batches).unwrap();

        let mut compiled = col("y").eq(literal).compile();
        let mut per_batch = Vec::new();
        for batch in table.batches() {
            let bound = compiled.bind(batch).unwrap();
            per_batch.extend((0..batch.len()).map(|index| bound.test(index, batch)));
        }
        prop_assert_eq!(&per_batch, &expected);

        let union = table.batches_union();
        let bound = col("y").eq(literal).bind(union).unwrap();
        let unioned: Vec<bool> = (0..union.len()).map(|index| bound.test(index, union)).collect();
        prop_assert_eq!(&unioned, &expected);

        let matching = expected.iter().filter(|matched| **matched).count();
        prop_assert_eq!(table.filter(col("y").eq(literal)).count().unwrap(), matching);
    }

    #[test]
    fn prop_filter_composition(
        chunks in prop::collection::vec(prop::collection::vec((-50i32..50, any::<u8>()), 1..20), 1..5),
        low in -50i32..50,
        label in prop::sample::select(vec!["a", "b", "c", "d"]),
    ) {
        let table = labeled_table(&chunks);
        let chained = table.filter(col("x").ge(low)).filter(col("y").eq(label));
        let combined = table.filter(col("x").ge(low).and(col("y").eq(label)));

        prop_assert_eq!(chained.count().unwrap(), combined.count().unwrap());
        prop_assert_eq!(scanned_rows(&chained), scanned_rows(&combined));
        let iterated = chained.iter().collect::<columnar_frame::Result<Vec<_>>>().unwrap();
        prop_assert_eq!(iterated, scanned_rows(&combined));
    }
}
