mod common;

use common::{VecRowSource, int_source, pair_def, pair_source, single_def, text_spec};
use flatdex_index::{
    Fetch, Index, IndexConfig, IndexCursor, IndexDefinition, KeyPartDefinition, KeyValue,
    RangeBound, SeekOp,
};
use flatdex_result::Error;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn drain(index: &mut dyn IndexCursor) -> (Vec<u32>, Fetch) {
    let mut rows = Vec::new();
    loop {
        match index.fetch() {
            Fetch::Row(pos) => rows.push(pos),
            other => return (rows, other),
        }
    }
}

fn seek_all(index: &mut Index, op: SeekOp) -> Vec<u32> {
    index.reset();
    index.seek(op);
    let (rows, end) = drain(index);
    assert_eq!(end, Fetch::End);
    rows
}

fn seek_eq(index: &mut Index, probe: &[KeyValue]) -> (Vec<u32>, Fetch) {
    index.set_probe(probe).unwrap();
    index.seek(SeekOp::Eq);
    drain(index)
}

fn groups() -> Index {
    Index::build(
        &single_def("k", false),
        &mut int_source(&[30, 10, 20, 10, 30]),
        IndexConfig::default(),
    )
    .unwrap()
}

/// Logical order: (1,x)r1 (1,x)r3 (2,a)r2 (2,b)r0 (2,b)r5 (3,c)r4
fn pairs() -> Index {
    let rows = [(2, "b"), (1, "x"), (2, "a"), (1, "x"), (3, "c"), (2, "b")];
    Index::build(&pair_def("ab", false), &mut pair_source(&rows), IndexConfig::default()).unwrap()
}

// ===== single key part =====

#[test]
fn scans_follow_index_order() {
    let mut index = groups();
    assert_eq!(seek_all(&mut index, SeekOp::First), vec![1, 3, 2, 0, 4]);
    assert_eq!(seek_all(&mut index, SeekOp::Last), vec![4, 0, 2, 3, 1]);
    assert_eq!(seek_all(&mut index, SeekOp::FirstDistinct), vec![1, 2, 0]);
}

#[test]
fn equality_walks_the_group_then_reports_no_match() {
    let mut index = groups();
    assert_eq!(seek_eq(&mut index, &[KeyValue::Int32(10)]), (vec![1, 3], Fetch::NoMatch));
    // The probe was consumed.
    assert_eq!(index.fetch(), Fetch::End);

    assert_eq!(seek_eq(&mut index, &[KeyValue::Int32(25)]), (vec![], Fetch::NoMatch));
    assert_eq!(index.group_size(), 0);
}

#[test]
fn same_row_is_not_served_twice() {
    let mut index = Index::build(
        &single_def("pk", true),
        &mut int_source(&[5, 6, 7]),
        IndexConfig::default(),
    )
    .unwrap();
    index.set_probe(&[KeyValue::Int32(6)]).unwrap();
    index.seek(SeekOp::Eq);
    assert_eq!(index.fetch(), Fetch::Row(1));

    index.set_probe(&[KeyValue::Int32(6)]).unwrap();
    assert_eq!(index.fetch(), Fetch::AlreadyServed);

    index.reset();
    assert_eq!(index.fetch(), Fetch::Row(1));
}

#[test]
fn greater_operators_continue_in_order() {
    let mut index = groups();
    index.set_probe(&[KeyValue::Int32(15)]).unwrap();
    index.seek(SeekOp::Ge);
    assert_eq!(drain(&mut index), (vec![2, 0, 4], Fetch::End));

    index.reset();
    index.set_probe(&[KeyValue::Int32(20)]).unwrap();
    index.seek(SeekOp::Gt);
    assert_eq!(drain(&mut index), (vec![0, 4], Fetch::End));

    index.reset();
    index.set_probe(&[KeyValue::Int32(30)]).unwrap();
    index.seek(SeekOp::Gt);
    assert_eq!(index.fetch(), Fetch::NoMatch);
}

#[test]
fn reset_rearms_the_probe() {
    let mut index = groups();
    assert_eq!(seek_eq(&mut index, &[KeyValue::Int32(30)]).0, vec![0, 4]);
    index.reset();
    assert_eq!(drain(&mut index), (vec![0, 4], Fetch::NoMatch));
}

#[test]
fn probes_are_validated() {
    let mut index = groups();
    assert!(matches!(index.set_probe(&[]), Err(Error::InvalidArgumentError(_))));
    assert!(index.set_probe(&[KeyValue::Int32(1), KeyValue::Int32(2)]).is_err());
    assert!(index.set_probe(&["ten".into()]).is_err());
    assert!(index.set_probe(&[KeyValue::Null]).is_err());
    // Any numeric type probes a numeric key.
    assert!(index.set_probe(&[KeyValue::Int64(10)]).is_ok());
    assert!(index.set_probe(&[KeyValue::Float64(10.0)]).is_ok());
}

#[test]
fn float_probe_on_integer_key() {
    let mut index = groups();
    assert_eq!(index.range(RangeBound::Gt, &[KeyValue::Float64(19.5)]).unwrap(), 3);
    assert_eq!(index.range(RangeBound::Le, &[KeyValue::Float64(20.0)]).unwrap(), 3);
    assert_eq!(index.count_equal(&[KeyValue::Float64(10.5)]).unwrap(), 0);
}

#[test]
fn prefix_key_matches_truncated_probes() {
    let rows = ["apple", "apricot", "banana", "apex"]
        .iter()
        .map(|s| vec![KeyValue::Utf8(s.to_string())])
        .collect();
    let mut source = VecRowSource::new(vec![text_spec("k", 0, 8)], rows);
    let def = IndexDefinition::new("k2", 0, false, vec![KeyPartDefinition::new("k").with_key_len(2)])
        .unwrap();
    let mut index = Index::build(&def, &mut source, IndexConfig::default()).unwrap();
    assert_eq!(index.count_equal(&["apartment".into()]).unwrap(), 3);
    let (rows, _) = seek_eq(&mut index, &["ap".into()]);
    assert_eq!(rows, vec![0, 1, 3]);
    assert_eq!(index.range(RangeBound::Gt, &["az".into()]).unwrap(), 1);
}

// ===== composite keys =====

#[test]
fn composite_scans() {
    let mut index = pairs();
    assert_eq!(seek_all(&mut index, SeekOp::First), vec![1, 3, 2, 0, 5, 4]);
    assert_eq!(seek_all(&mut index, SeekOp::Last), vec![4, 5, 0, 2, 3, 1]);
    assert_eq!(seek_all(&mut index, SeekOp::FirstDistinct), vec![1, 2, 0, 4]);
}

#[test]
fn partial_probe_groups_on_the_prefix() {
    let mut index = pairs();
    index.set_probe(&[KeyValue::Int32(2)]).unwrap();
    index.seek(SeekOp::Eq);
    assert_eq!(index.fetch(), Fetch::Row(2));
    assert_eq!(index.group_size(), 3);
    assert_eq!(index.current_value(0), Some(KeyValue::Int32(2)));
    assert_eq!(index.current_value(1), Some(KeyValue::Utf8("a".into())));
    assert_eq!(drain(&mut index), (vec![0, 5], Fetch::NoMatch));

    // Distinct values of the probed prefix only.
    assert_eq!(seek_all(&mut index, SeekOp::FirstDistinct), vec![1, 2, 4]);
}

#[test]
fn full_composite_probe() {
    let mut index = pairs();
    let probe = [KeyValue::Int32(2), "b".into()];
    index.set_probe(&probe).unwrap();
    index.seek(SeekOp::Eq);
    assert_eq!(index.fetch(), Fetch::Row(0));
    assert_eq!(index.group_size(), 2);
    assert_eq!(drain(&mut index), (vec![5], Fetch::NoMatch));

    assert_eq!(seek_eq(&mut index, &[KeyValue::Int32(2), "z".into()]).0, vec![]);
    assert_eq!(seek_eq(&mut index, &[KeyValue::Int32(4)]).0, vec![]);
    assert_eq!(seek_eq(&mut index, &[KeyValue::Int32(1), "x".into()]).0, vec![1, 3]);
}

#[test]
fn composite_greater_operators() {
    let mut index = pairs();
    index.set_probe(&[KeyValue::Int32(2), "a".into()]).unwrap();
    index.seek(SeekOp::Gt);
    assert_eq!(drain(&mut index), (vec![0, 5, 4], Fetch::End));

    index.reset();
    index.set_probe(&[KeyValue::Int32(1), "zz".into()]).unwrap();
    index.seek(SeekOp::Ge);
    assert_eq!(drain(&mut index), (vec![2, 0, 5, 4], Fetch::End));

    index.reset();
    index.set_probe(&[KeyValue::Int32(2)]).unwrap();
    index.seek(SeekOp::Gt);
    assert_eq!(drain(&mut index), (vec![4], Fetch::End));
}

#[test]
fn find_and_step_by_hand() {
    let mut index = pairs();
    assert_eq!(index.find(SeekOp::Eq, &[KeyValue::Int32(2)]).unwrap(), Some(2));
    assert_eq!(index.current(), Some(2));
    assert!(index.advance(true));
    assert!(index.advance(true));
    assert!(!index.advance(true));
    assert!(index.retreat());
    assert_eq!(index.current_value(1), Some(KeyValue::Utf8("b".into())));

    assert_eq!(index.find(SeekOp::Eq, &[KeyValue::Int32(9)]).unwrap(), None);
    assert_eq!(index.current(), None);
    assert_eq!(index.find(SeekOp::Ge, &[KeyValue::Int32(0)]).unwrap(), Some(0));
}

// ===== two-tier search =====

fn random_keys(seed: u64, n: usize, max: i32) -> Vec<i32> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n).map(|_| rng.random_range(0..max)).collect()
}

#[test]
fn block_search_matches_plain_search() {
    let keys = random_keys(42, 2_000, 5_000);
    let blocked_config = IndexConfig {
        block_threshold: Some(16),
        min_block_stride: 2,
        ..IndexConfig::default()
    };
    let plain_config = IndexConfig {
        block_threshold: None,
        ..IndexConfig::default()
    };
    let def = single_def("k", false);
    let mut blocked = Index::build(&def, &mut int_source(&keys), blocked_config).unwrap();
    let mut plain = Index::build(&def, &mut int_source(&keys), plain_config).unwrap();
    assert!(blocked.block_count() > 0);
    assert_eq!(plain.block_count(), 0);

    let probes = [-10, 0, 4_999, 5_000, 12_345]
        .into_iter()
        .chain((0..5_000).step_by(7))
        .chain(keys.iter().copied().take(200));
    for p in probes {
        let probe = [KeyValue::Int32(p)];
        let a = blocked.find(SeekOp::Eq, &probe).unwrap();
        let b = plain.find(SeekOp::Eq, &probe).unwrap();
        assert_eq!(a, b, "probe {p}");
        assert_eq!(blocked.group_size(), plain.group_size(), "probe {p}");
        assert_eq!(a.is_some(), keys.contains(&p), "probe {p}");
    }
}

#[test]
fn block_search_on_composite_leading_part() {
    let mut rng = StdRng::seed_from_u64(7);
    let rows: Vec<(i32, String)> = (0..1_500)
        .map(|_| {
            let b = (b'a' + rng.random_range(0..5u8)) as char;
            (rng.random_range(0..400), b.to_string())
        })
        .collect();
    let borrowed: Vec<(i32, &str)> = rows.iter().map(|(a, b)| (*a, b.as_str())).collect();

    let config = IndexConfig {
        block_threshold: Some(8),
        min_block_stride: 2,
        ..IndexConfig::default()
    };
    let def = pair_def("ab", false);
    let mut blocked = Index::build(&def, &mut pair_source(&borrowed), config).unwrap();
    let mut plain = Index::build(
        &def,
        &mut pair_source(&borrowed),
        IndexConfig {
            block_threshold: None,
            ..IndexConfig::default()
        },
    )
    .unwrap();
    assert!(blocked.block_count() > 0);

    for a in -2..402 {
        for b in ["a", "c", "e", "q"] {
            let probe = [KeyValue::Int32(a), b.into()];
            assert_eq!(
                blocked.find(SeekOp::Eq, &probe).unwrap(),
                plain.find(SeekOp::Eq, &probe).unwrap(),
                "probe ({a}, {b})"
            );
        }
    }
}

// ===== ranges =====

#[test]
fn range_matches_brute_force() {
    let keys = random_keys(1234, 800, 100);
    let mut index =
        Index::build(&single_def("k", false), &mut int_source(&keys), IndexConfig::default())
            .unwrap();

    for p in -1..=101 {
        let probe = [KeyValue::Int32(p)];
        let count = |f: &dyn Fn(i32) -> bool| keys.iter().filter(|&&k| f(k)).count();
        let gt = index.range(RangeBound::Gt, &probe).unwrap();
        let ge = index.range(RangeBound::Ge, &probe).unwrap();
        assert_eq!(gt, count(&|k| k > p), "gt {p}");
        assert_eq!(ge, count(&|k| k >= p), "ge {p}");
        assert_eq!(index.range(RangeBound::Lt, &probe).unwrap(), count(&|k| k < p), "lt {p}");
        assert_eq!(index.range(RangeBound::Le, &probe).unwrap(), count(&|k| k <= p), "le {p}");
        assert_eq!(ge - gt, count(&|k| k == p), "multiplicity {p}");
        assert_eq!(index.count_equal(&probe).unwrap(), ge - gt);
    }
}

#[test]
fn composite_range_matches_brute_force() {
    let mut rng = StdRng::seed_from_u64(99);
    let rows: Vec<(i32, String)> = (0..600)
        .map(|_| {
            let b = (b'a' + rng.random_range(0..6u8)) as char;
            (rng.random_range(0..30), b.to_string())
        })
        .collect();
    let borrowed: Vec<(i32, &str)> = rows.iter().map(|(a, b)| (*a, b.as_str())).collect();
    let mut index =
        Index::build(&pair_def("ab", false), &mut pair_source(&borrowed), IndexConfig::default())
            .unwrap();

    for a in -1..=31 {
        let prefix = [KeyValue::Int32(a)];
        let above = rows.iter().filter(|(x, _)| *x > a).count();
        let at = rows.iter().filter(|(x, _)| *x == a).count();
        assert_eq!(index.range(RangeBound::Gt, &prefix).unwrap(), above, "prefix gt {a}");
        assert_eq!(index.count_equal(&prefix).unwrap(), at, "prefix eq {a}");

        for b in ["a", "c", "f", "g"] {
            let probe = [KeyValue::Int32(a), b.into()];
            let key = (a, b);
            let gt = rows.iter().filter(|(x, y)| (*x, y.as_str()) > key).count();
            let le = rows.len() - gt;
            assert_eq!(index.range(RangeBound::Gt, &probe).unwrap(), gt, "gt ({a}, {b})");
            assert_eq!(index.range(RangeBound::Le, &probe).unwrap(), le, "le ({a}, {b})");
        }
    }
}

#[test]
fn range_leaves_the_cursor_alone() {
    let mut index = groups();
    index.set_probe(&[KeyValue::Int32(10)]).unwrap();
    index.seek(SeekOp::Eq);
    assert_eq!(index.fetch(), Fetch::Row(1));
    index.range(RangeBound::Gt, &[KeyValue::Int32(0)]).unwrap();
    assert_eq!(index.fetch(), Fetch::Row(3));
}

#[test]
fn empty_index_answers_everything_with_nothing() {
    let mut index =
        Index::build(&single_def("k", false), &mut int_source(&[]), IndexConfig::default())
            .unwrap();
    assert_eq!(index.range(RangeBound::Ge, &[KeyValue::Int32(1)]).unwrap(), 0);
    assert_eq!(seek_eq(&mut index, &[KeyValue::Int32(1)]), (vec![], Fetch::End));
    assert_eq!(seek_all(&mut index, SeekOp::Last), Vec::<u32>::new());
}
