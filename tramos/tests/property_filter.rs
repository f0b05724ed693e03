use proptest::prelude::*;
use std::rc::Rc;
use tramos::{DataStore, FilterEngine, FilterUpdate, Phase, Record, TagKind};

const SUBREGIONES: [&str; 3] = ["Oriente", "Norte", "Urabá"];
const MUNICIPIOS: [&str; 6] = ["Rionegro", "Guatapé", "Yarumal", "Turbo", "Apartadó", "Ñechí"];
const CIRCUITOS: [&str; 4] = ["C-1", "C-2", "C-3", "C-4"];

#[derive(Clone, Debug)]
enum Op {
    Search(u8),
    Subregion(u8),
    Municipio(u8),
    Circuito(u8),
    MinAvance(Option<u8>),
    MaxAvance(Option<u8>),
    Clear(u8),
    ClearAll,
    Recompute,
}

fn record_strategy() -> impl Strategy<Value = Record> {
    (
        proptest::option::of(0usize..SUBREGIONES.len()),
        0usize..MUNICIPIOS.len(),
        0usize..CIRCUITOS.len(),
        proptest::option::of(0u8..=100),
        0u16..5000,
    )
        .prop_map(|(s, m, c, avance, metros)| Record {
            subregion: s.map(|i| SUBREGIONES[i].to_string()),
            municipio: Some(MUNICIPIOS[m].to_string()),
            circuito: Some(CIRCUITOS[c].to_string()),
            avance: avance.map(|a| a as f64 / 100.0),
            longitud_tramo_km: Some(metros as f64 / 1000.0),
            ..Default::default()
        })
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        any::<u8>().prop_map(Op::Search),
        any::<u8>().prop_map(Op::Subregion),
        any::<u8>().prop_map(Op::Municipio),
        any::<u8>().prop_map(Op::Circuito),
        proptest::option::of(0u8..=100).prop_map(Op::MinAvance),
        proptest::option::of(0u8..=100).prop_map(Op::MaxAvance),
        any::<u8>().prop_map(Op::Clear),
        Just(Op::ClearAll),
        Just(Op::Recompute),
    ]
}

// Constraints only; no clears or resets.
fn constraint_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        any::<u8>().prop_map(Op::Search),
        any::<u8>().prop_map(Op::Subregion),
        any::<u8>().prop_map(Op::Municipio),
        any::<u8>().prop_map(Op::Circuito),
        (0u8..=100).prop_map(|v| Op::MinAvance(Some(v))),
        (0u8..=100).prop_map(|v| Op::MaxAvance(Some(v))),
    ]
}

// Picks from the list or, for index 0, the empty "all" value.
fn pick(list: &[&str], i: u8) -> String {
    match i as usize % (list.len() + 1) {
        0 => String::new(),
        n => list[n - 1].to_string(),
    }
}

fn apply_op(e: &FilterEngine, op: Op) {
    match op {
        Op::Search(i) => {
            let needle = pick(&["c-1", "ori", "GUAT", "zzz", "ñe"], i);
            e.set_filter(FilterUpdate::Search(needle));
        }
        Op::Subregion(i) => {
            e.set_filter(FilterUpdate::Subregion(pick(&SUBREGIONES, i)));
        }
        Op::Municipio(i) => {
            e.set_filter(FilterUpdate::Municipio(pick(&MUNICIPIOS, i)));
        }
        Op::Circuito(i) => {
            e.set_filter(FilterUpdate::Circuito(pick(&CIRCUITOS, i)));
        }
        Op::MinAvance(v) => {
            e.set_filter(FilterUpdate::MinAvance(v.map(f64::from)));
        }
        Op::MaxAvance(v) => {
            e.set_filter(FilterUpdate::MaxAvance(v.map(f64::from)));
        }
        Op::Clear(k) => {
            let kinds = [
                TagKind::Search,
                TagKind::Subregion,
                TagKind::Municipio,
                TagKind::Circuito,
                TagKind::Contratista,
                TagKind::Avance,
            ];
            e.clear_filter(kinds[k as usize % kinds.len()]);
        }
        Op::ClearAll => {
            e.clear_all();
        }
        Op::Recompute => {
            e.recompute();
        }
    }
}

fn assert_invariants(e: &FilterEngine) {
    let catalog = e.catalog();
    let records = catalog.store.records();
    let subset = e.subset();
    let state = e.state();
    let pred = state.predicate();

    // Ordered, in range, and exactly the matching records.
    let idx = subset.indices();
    assert!(idx.windows(2).all(|w| w[0] < w[1]), "indices not ascending");
    assert!(idx.iter().all(|&i| i < records.len()));
    let expected: Vec<usize> = (0..records.len()).filter(|&i| pred.matches(&records[i])).collect();
    assert_eq!(idx, expected.as_slice());

    // Municipio options are exactly those present under the selected subregion.
    if !state.subregion.is_empty() {
        let options = e.municipio_options();
        let mut expected: Vec<&String> = records
            .iter()
            .filter(|r| r.subregion.as_deref() == Some(state.subregion.as_str()))
            .filter_map(|r| r.municipio.as_ref())
            .collect();
        expected.sort();
        expected.dedup();
        let mut got: Vec<&String> = options.iter().collect();
        got.sort();
        assert_eq!(got, expected, "options under {}", state.subregion);
    }
    assert_eq!(e.phase(), Phase::Idle);
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 512, .. ProptestConfig::default() })]

    #[test]
    fn filter_sequences_keep_invariants(
        records in prop::collection::vec(record_strategy(), 0..40),
        seq in prop::collection::vec(op_strategy(), 1..25),
    ) {
        let e = Rc::new(FilterEngine::new(DataStore::new(records)));
        for op in seq {
            apply_op(&e, op);
            assert_invariants(&e);
        }
    }

    #[test]
    fn recompute_is_idempotent(
        records in prop::collection::vec(record_strategy(), 0..40),
        seq in prop::collection::vec(op_strategy(), 1..10),
    ) {
        let e = FilterEngine::new(DataStore::new(records));
        for op in seq {
            apply_op(&e, op);
        }
        let first = e.subset();
        e.recompute();
        prop_assert_eq!(first, e.subset());
    }

    #[test]
    fn clear_all_restores_every_record(
        records in prop::collection::vec(record_strategy(), 0..40),
        seq in prop::collection::vec(op_strategy(), 1..10),
    ) {
        let e = FilterEngine::new(DataStore::new(records));
        for op in seq {
            apply_op(&e, op);
        }
        e.clear_all();
        let s = e.subset();
        prop_assert_eq!(s.len(), s.total());
        prop_assert!(!s.is_filtered());
    }

    #[test]
    fn adding_a_constraint_never_grows_the_subset(
        records in prop::collection::vec(record_strategy(), 0..40),
        mut constraints in prop::collection::vec(constraint_strategy(), 1..8),
    ) {
        // A new subregion can drop the municipio and circuito picks, so it goes first.
        constraints.sort_by_key(|op| !matches!(op, Op::Subregion(_)));
        let mut seen = Vec::new();
        constraints.retain(|op| {
            let field = std::mem::discriminant(op);
            let fresh = !seen.contains(&field);
            seen.push(field);
            fresh
        });

        let e = FilterEngine::new(DataStore::new(records));
        let mut previous = e.subset();
        for op in constraints {
            apply_op(&e, op);
            let next = e.subset();
            prop_assert!(next.len() <= previous.len());
            prop_assert!(next.indices().iter().all(|i| previous.indices().contains(i)));
            previous = next;
        }
    }
}
