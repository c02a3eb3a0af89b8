use qsb_obs::{
    ensure_valid_partition, partition, verify_partition, CommutingGroup, GroupingMethod,
    ObservableSet, PartitionSummary, PartitionViolation,
};

fn heisenberg_like() -> ObservableSet {
    ObservableSet::from_labels([
        ("z0", "ZIII", 1.0),
        ("xx01", "XXII", 0.5),
        ("zz01", "ZZII", 0.5),
        ("yy23", "IIYY", 0.5),
        ("zz23", "IIZZ", 0.5),
        ("xx23", "IIXX", 0.5),
        ("zzzz", "ZZZZ", 0.25),
    ])
    .unwrap()
}

#[test]
fn greedy_absorbs_against_every_member() {
    let set = heisenberg_like();
    let groups = partition(&set, GroupingMethod::Greedy).unwrap();
    assert_eq!(groups.len(), 4);

    // z0 seeds the first group; zz01 and yy23 commute with every member so far.
    assert_eq!(groups[0].members(), &[0, 2, 3]);
    assert_eq!(groups[0].shared_basis().to_string(), "ZZYY");
    assert_eq!(groups[1].members(), &[1, 4]);
    assert_eq!(groups[1].shared_basis().to_string(), "XXZZ");
    assert_eq!(groups[2].members(), &[5]);
    assert_eq!(groups[2].shared_basis().to_string(), "IIXX");
    assert_eq!(groups[2].measurement_basis().to_string(), "ZZXX");
    assert_eq!(groups[3].members(), &[6]);
    ensure_valid_partition(&set, &groups).unwrap();
}

#[test]
fn sorted_insertion_places_heavy_observables_first() {
    let set = ObservableSet::from_labels([
        ("x0", "XI", 1.0),
        ("x1", "IX", 1.0),
        ("xz", "XZ", 1.0),
        ("zx", "ZX", 1.0),
    ])
    .unwrap();

    let greedy = partition(&set, GroupingMethod::Greedy).unwrap();
    let sorted = partition(&set, GroupingMethod::SortedInsertion).unwrap();

    // Greedy pairs x0 with x1 first and then strands both weight-2 terms.
    assert_eq!(greedy.len(), 3);
    // Sorted insertion opens a group per weight-2 term and drops the light ones in.
    assert_eq!(sorted.len(), 2);
    assert_eq!(sorted[0].members(), &[2, 0]);
    assert_eq!(sorted[1].members(), &[3, 1]);
    assert!(verify_partition(&set, &sorted).is_valid());

    let summary = PartitionSummary::from_groups(&sorted);
    assert_eq!(summary.groups, 2);
    assert_eq!(summary.largest_group, 2);
    assert_eq!(summary.singleton_groups, 0);
    assert!((summary.compression_ratio - 2.0).abs() < 1e-12);

    let greedy_summary = PartitionSummary::from_groups(&greedy);
    assert_eq!(greedy_summary.singleton_groups, 2);
}

#[test]
fn conflicting_members_have_no_shared_basis() {
    let set = ObservableSet::from_labels([("xx", "XX", 1.0), ("yy", "YY", 1.0)]).unwrap();
    let err = CommutingGroup::new(0, vec![0, 1], &set).unwrap_err();
    assert_eq!(err.code(), "no-shared-basis");
    assert_eq!(err.info().context.get("qubit").map(String::as_str), Some("0"));
}

#[test]
fn verifier_reports_missing_and_duplicated_members() {
    let set = ObservableSet::from_labels([("a", "ZI", 1.0), ("b", "IZ", 1.0), ("c", "XI", 1.0)])
        .unwrap();
    let groups = vec![
        CommutingGroup::new(0, vec![0, 1], &set).unwrap(),
        CommutingGroup::new(1, vec![1], &set).unwrap(),
    ];
    let report = verify_partition(&set, &groups);
    assert!(report
        .violations
        .contains(&PartitionViolation::Duplicated { observable: 1 }));
    assert!(report
        .violations
        .contains(&PartitionViolation::Missing { observable: 2 }));
    let err = ensure_valid_partition(&set, &groups).unwrap_err();
    assert_eq!(err.code(), "invalid-partition");
}

#[test]
fn unknown_method_names_fail_fast() {
    assert_eq!(
        "sorted-insertion".parse::<GroupingMethod>().unwrap(),
        GroupingMethod::SortedInsertion
    );
    let err = "coloring".parse::<GroupingMethod>().unwrap_err();
    assert_eq!(err.code(), "unknown-grouping-method");
}
