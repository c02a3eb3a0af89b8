use qsb_obs::{
    partition, verify_partition, GroupingMethod, Observable, ObservableSet, Pauli, PauliString,
};
use proptest::prelude::*;

fn build_set(rows: &[Vec<u8>]) -> ObservableSet {
    let observables = rows
        .iter()
        .enumerate()
        .map(|(idx, row)| {
            let symbols = row
                .iter()
                .map(|code| match code {
                    0 => Pauli::I,
                    1 => Pauli::X,
                    2 => Pauli::Y,
                    _ => Pauli::Z,
                })
                .collect();
            Observable::new(format!("o{idx}"), PauliString::new(symbols), 1.0)
        })
        .collect();
    ObservableSet::new(observables).unwrap()
}

fn random_rows() -> impl Strategy<Value = Vec<Vec<u8>>> {
    (1usize..6).prop_flat_map(|n| prop::collection::vec(prop::collection::vec(0u8..4, n), 1..24))
}

proptest! {
    #[test]
    fn every_method_covers_each_observable_once(rows in random_rows()) {
        let set = build_set(&rows);
        for method in [GroupingMethod::Greedy, GroupingMethod::SortedInsertion] {
            let groups = partition(&set, method).unwrap();
            let report = verify_partition(&set, &groups);
            prop_assert!(report.is_valid(), "{:?}: {:?}", method, report.violations);

            let mut indices: Vec<usize> = groups.iter().flat_map(|g| g.members().to_vec()).collect();
            indices.sort_unstable();
            prop_assert_eq!(indices, (0..set.len()).collect::<Vec<_>>());
        }
    }

    #[test]
    fn group_ids_follow_creation_order(rows in random_rows()) {
        let set = build_set(&rows);
        let groups = partition(&set, GroupingMethod::Greedy).unwrap();
        for (expected, group) in groups.iter().enumerate() {
            prop_assert_eq!(group.group_id(), expected);
            prop_assert!(!group.is_empty());
        }
    }
}
