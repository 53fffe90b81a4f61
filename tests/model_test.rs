//! Integration tests for Model construction and priority synthesis.

use rstest::rstest;

use ahp::domain::{
    DepthPolicy, DomainError, IdentityAllocator, Model, NodeKey, NodeKind, RawEntry, RawSpec,
};

const EPS: f64 = 1e-6;

fn assert_close(actual: &[f64], expected: &[f64]) {
    assert_eq!(actual.len(), expected.len(), "{actual:?} vs {expected:?}");
    for (a, e) in actual.iter().zip(expected) {
        assert!((a - e).abs() < 1e-3, "{actual:?} vs {expected:?}");
    }
}

/// Problem with two flat criteria and three alternatives.
fn two_criteria_model(ids: &mut IdentityAllocator) -> Model {
    let problem = ids.problem("car");
    let criteria = vec![ids.criterion("price"), ids.criterion("comfort")];
    let alternatives: Vec<_> = ["civic", "accord", "golf"]
        .into_iter()
        .map(|name| ids.alternative(name))
        .collect();
    Model::new(ids, problem, criteria, alternatives).unwrap()
}

#[rstest]
#[case(1)]
#[case(2)]
#[case(5)]
fn given_no_criteria_when_solving_then_uniform(#[case] n: usize) {
    // Arrange
    let mut ids = IdentityAllocator::new();
    let problem = ids.problem("goal");
    let alternatives: Vec<_> = (0..n).map(|_| ids.unnamed_alternative()).collect();
    let model = Model::new(&mut ids, problem, RawSpec::Absent, alternatives).unwrap();

    // Act
    let global = model.solve().unwrap();

    // Assert
    assert_close(&global, &vec![1.0 / n as f64; n]);
}

#[test]
fn given_two_criteria_with_weighted_problem_when_solving_then_priorities_match() {
    // Arrange
    let mut ids = IdentityAllocator::new();
    let mut model = two_criteria_model(&mut ids);
    let problem = model.problem().key().clone();
    for criterion in model.criteria_identities() {
        model
            .attach_comparison_matrix(&criterion, &vec![vec![1.0; 3]; 3])
            .unwrap();
    }

    // Act
    model
        .attach_comparison_matrix(&problem, &[vec![1.0, 2.0], vec![0.5, 1.0]])
        .unwrap();

    // Assert
    assert_close(&model.priority_vector(&problem).unwrap(), &[0.667, 0.333]);
    assert_close(&model.solve().unwrap(), &[1.0 / 3.0; 3]);
}

#[test]
fn given_judgments_when_ranking_then_best_alternative_first() {
    // Arrange
    let mut ids = IdentityAllocator::new();
    let mut model = two_criteria_model(&mut ids);
    let price = NodeKey::new("price", 0);
    let comfort = NodeKey::new("comfort", 1);
    // price: golf > civic > accord, consistent
    model
        .attach_comparison_matrix(
            &price,
            &[
                vec![1.0, 2.0, 0.5],
                vec![0.5, 1.0, 0.25],
                vec![2.0, 4.0, 1.0],
            ],
        )
        .unwrap();
    model.set_comparison(&comfort, 1, 0, 3.0).unwrap();

    // Act
    let ranking = model.ranking().unwrap();
    let global = model.solve().unwrap();

    // Assert
    assert!((global.iter().sum::<f64>() - 1.0).abs() < EPS);
    assert!(global.iter().all(|g| *g >= 0.0));
    assert_eq!(ranking.len(), 3);
    assert!(ranking.windows(2).all(|w| w[0].1 >= w[1].1));
    assert_eq!(ranking[0].0.name, "golf");
}

#[test]
fn given_unknown_key_when_finding_then_not_found() {
    // Arrange
    let mut ids = IdentityAllocator::new();
    let model = two_criteria_model(&mut ids);
    let missing = NodeKey::new("NonExistent", 9999);

    // Act
    let result = model.find(&missing);

    // Assert
    assert_eq!(result.unwrap_err(), DomainError::NotFound(missing));
}

#[rstest]
#[case("price")]
#[case("price#")]
#[case("#0")]
#[case("price#-1")]
fn given_malformed_key_string_when_finding_then_bad_key(#[case] key: &str) {
    let mut ids = IdentityAllocator::new();
    let model = two_criteria_model(&mut ids);

    assert!(matches!(model.find_str(key), Err(DomainError::BadKey(_))));
}

#[test]
fn given_key_string_when_finding_then_resolves_every_kind() {
    let mut ids = IdentityAllocator::new();
    let model = two_criteria_model(&mut ids);

    for key in ["car#0", "comfort#1", "golf#2"] {
        assert!(model.find_str(key).is_ok(), "{key}");
    }
}

#[test]
fn given_alternative_key_when_attaching_matrix_then_illegal_operation() {
    // Arrange
    let mut ids = IdentityAllocator::new();
    let mut model = two_criteria_model(&mut ids);

    // Act
    let result = model.attach_comparison_matrix(&NodeKey::new("civic", 0), &[vec![1.0]]);

    // Assert
    assert!(matches!(result, Err(DomainError::IllegalOperation(_))));
}

#[test]
fn given_invalid_matrix_when_attaching_then_previous_matrix_is_kept() {
    // Arrange
    let mut ids = IdentityAllocator::new();
    let mut model = two_criteria_model(&mut ids);
    let problem = model.problem().key().clone();
    model
        .attach_comparison_matrix(&problem, &[vec![1.0, 4.0], vec![0.25, 1.0]])
        .unwrap();

    // Act
    let result = model.attach_comparison_matrix(&problem, &[vec![1.0, 4.0], vec![4.0, 1.0]]);

    // Assert
    assert!(matches!(result, Err(DomainError::NotReciprocal { .. })));
    assert_eq!(
        model.comparison_matrix(&problem).unwrap().to_rows(),
        vec![vec![1.0, 4.0], vec![0.25, 1.0]]
    );
}

fn uneven_spec(ids: &mut IdentityAllocator) -> RawSpec {
    RawSpec::from(vec![
        RawEntry::branch(
            ids.criterion("quality"),
            vec![
                RawEntry::leaf(ids.criterion("engine")),
                RawEntry::leaf(ids.criterion("body")),
            ],
        ),
        RawEntry::leaf(ids.criterion("price")),
    ])
}

#[test]
fn given_uneven_depth_when_building_strict_then_depth_mismatch() {
    // Arrange
    let mut ids = IdentityAllocator::new();
    let problem = ids.problem("car");
    let criteria = uneven_spec(&mut ids);
    let alternatives = vec![ids.alternative("a"), ids.alternative("b")];

    // Act
    let result = Model::new(&mut ids, problem, criteria, alternatives);

    // Assert
    match result {
        Err(DomainError::DepthMismatch { depths }) => assert_eq!(depths, vec![1, 2]),
        other => panic!("expected depth mismatch, got {other:?}"),
    }
}

#[test]
fn given_uneven_depth_when_building_normalized_then_padded_with_placeholder() {
    // Arrange
    let mut ids = IdentityAllocator::new();
    let problem = ids.problem("car");
    let criteria = uneven_spec(&mut ids);
    let alternatives = vec![ids.alternative("a"), ids.alternative("b")];

    // Act
    let model = Model::builder(problem)
        .criteria(criteria)
        .alternatives(alternatives)
        .depth_policy(DepthPolicy::Normalize)
        .build(&mut ids)
        .unwrap();

    // Assert
    let placeholder = NodeKey::new("Dummy4", 4);
    let node = model.node(&placeholder).unwrap();
    assert_eq!(node.kind(), NodeKind::DummyCriterion);
    assert_eq!(node.children().len(), 1);
    assert_eq!(model.arena().depth(), 4);
    let global = model.solve().unwrap();
    assert!((global.iter().sum::<f64>() - 1.0).abs() < EPS);
}

#[test]
fn given_model_when_reporting_consistency_then_every_internal_node_listed() {
    // Arrange
    let mut ids = IdentityAllocator::new();
    let mut model = two_criteria_model(&mut ids);
    let comfort = NodeKey::new("comfort", 1);
    model
        .attach_comparison_matrix(
            &comfort,
            &[
                vec![1.0, 9.0, 1.0 / 9.0],
                vec![1.0 / 9.0, 1.0, 9.0],
                vec![9.0, 1.0 / 9.0, 1.0],
            ],
        )
        .unwrap();

    // Act
    let report = model.consistency_report(0.1).unwrap();

    // Assert
    let keys: Vec<String> = report.iter().map(|e| e.key.to_string()).collect();
    assert_eq!(keys, ["car#0", "price#0", "comfort#1"]);
    assert_eq!(report[0].ratio, Some(0.0));
    assert!(report[1].consistent);
    assert!(!report[2].consistent);
    assert!(model.consistency_ratio(&comfort).unwrap().unwrap() > 0.1);
}

#[test]
fn given_model_when_showing_then_tree_lists_alternatives_per_leaf() {
    let mut ids = IdentityAllocator::new();
    let model = two_criteria_model(&mut ids);

    let rendered = model.show();

    assert!(rendered.starts_with("car#0"));
    assert_eq!(rendered.matches("golf#2").count(), 2);
}

#[rstest]
#[case::problem_as_alternative(true)]
#[case::duplicate_alternative(false)]
fn given_bad_alternatives_when_building_then_invalid_alternatives(#[case] wrong_kind: bool) {
    let mut ids = IdentityAllocator::new();
    let problem = ids.problem("car");
    let a = ids.alternative("a");
    let alternatives: Vec<ahp::domain::Element> = if wrong_kind {
        vec![a.into(), ids.problem("other").into()]
    } else {
        vec![a.clone().into(), a.into()]
    };

    let result = Model::new(&mut ids, problem, RawSpec::Absent, alternatives);

    assert!(matches!(result, Err(DomainError::InvalidAlternatives(_))));
}

#[test]
fn given_empty_alternatives_when_building_then_invalid_alternatives() {
    let mut ids = IdentityAllocator::new();
    let problem = ids.problem("car");

    let result = Model::new(
        &mut ids,
        problem,
        RawSpec::Absent,
        Vec::<ahp::domain::Alternative>::new(),
    );

    assert!(matches!(result, Err(DomainError::InvalidAlternatives(_))));
}

#[test]
fn given_criterion_as_problem_when_building_then_invalid_problem() {
    let mut ids = IdentityAllocator::new();
    let not_a_problem = ids.criterion("c");
    let alternatives = vec![ids.alternative("a")];

    let result = Model::new(&mut ids, not_a_problem, RawSpec::Absent, alternatives);

    assert!(matches!(result, Err(DomainError::InvalidProblem(_))));
}

#[rstest]
#[case::problem_and_criterion("cost", "cost", "civic")]
#[case::criterion_and_alternative("car", "civic", "civic")]
#[case::problem_and_alternative("civic", "price", "civic")]
fn given_shared_name_and_id_across_kinds_when_building_then_duplicate_key(
    #[case] problem: &str,
    #[case] criterion: &str,
    #[case] alternative: &str,
) {
    // Arrange: every kind starts counting at 0
    let mut ids = IdentityAllocator::new();
    let problem = ids.problem(problem);
    let criteria = vec![ids.criterion(criterion), ids.criterion("comfort")];
    let alternatives = vec![ids.alternative(alternative), ids.alternative("golf")];

    // Act
    let result = Model::new(&mut ids, problem, criteria, alternatives);

    // Assert
    let err = result.unwrap_err();
    assert!(matches!(err, DomainError::DuplicateKey(ref key) if key.id == 0));
    assert!(err.is_structural());
}
