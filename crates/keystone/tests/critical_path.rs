//! Integration tests for the critical path service.
//!
//! These tests drive `CriticalPathService` end to end over in-memory stores:
//! dependency management, scheduling, blockers, delay impact, completion
//! dates and integrity checks.

mod common;

use chrono::NaiveDate;
use common::{chain, diamond, id, ids, service_with};
use keystone::config::EngineConfig;
use keystone::domain::{DependencyDirection, DependencyType, WorkItemStatus};
use keystone::error::Error;
use rstest::rstest;

// ========== Dependency Management ==========

#[tokio::test]
async fn test_self_dependency_rejected_before_lookup() {
    let service = service_with(&[], &[]).await;

    // Neither side exists, but the self-loop check comes first
    let err = service
        .add_dependency(&id("ghost"), &id("ghost"), DependencyType::Blocks, "t")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::SelfDependency(ref i) if i.as_str() == "ghost"));
}

#[rstest]
#[case::unknown_dependent("ghost", "A")]
#[case::unknown_dependency("A", "ghost")]
#[tokio::test]
async fn test_add_dependency_unknown_item(#[case] dependent: &str, #[case] dependency: &str) {
    let service = service_with(&[("A", 1)], &[]).await;
    let err = service
        .add_dependency(&id(dependent), &id(dependency), DependencyType::Blocks, "t")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::WorkItemNotFound(ref i) if i.as_str() == "ghost"));
}

#[tokio::test]
async fn test_add_dependency_duplicate_rejected() {
    let service = service_with(&[("A", 1), ("B", 1)], &[("A", "B")]).await;
    let err = service
        .add_dependency(&id("A"), &id("B"), DependencyType::RelatesTo, "t")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::DuplicateDependency { .. }));
}

#[tokio::test]
async fn test_add_dependency_allows_cycles_until_calculation() {
    let service = service_with(&[("A", 1), ("B", 1)], &[("A", "B")]).await;
    service
        .add_dependency(&id("B"), &id("A"), DependencyType::Blocks, "t")
        .await
        .unwrap();

    assert!(service.has_dependency(&id("B"), &id("A")).await.unwrap());
    assert!(service.calculate_critical_path().await.is_err());
}

#[tokio::test]
async fn test_remove_dependency_twice() {
    let service = service_with(&[("A", 1), ("B", 1)], &[("A", "B")]).await;

    assert!(service.remove_dependency(&id("A"), &id("B")).await.unwrap());
    assert!(!service.remove_dependency(&id("A"), &id("B")).await.unwrap());
    assert!(!service.has_dependency(&id("A"), &id("B")).await.unwrap());
}

#[tokio::test]
async fn test_get_dependency_by_pair() {
    let service = service_with(&[("A", 1), ("B", 1)], &[("A", "B")]).await;

    let edge = service.get_dependency(&id("A"), &id("B")).await.unwrap();
    assert_eq!(edge.created_by, "fixture");

    // Edges are directional
    let err = service.get_dependency(&id("B"), &id("A")).await.unwrap_err();
    assert!(matches!(err, Error::DependencyNotFound { .. }));
}

#[tokio::test]
async fn test_get_dependencies_by_direction() {
    let service = diamond().await;

    let incoming = service
        .get_dependencies(&id("D"), DependencyDirection::Incoming)
        .await
        .unwrap();
    let waits_on: Vec<_> = incoming.iter().map(|e| e.dependency_id.as_str()).collect();
    assert_eq!(waits_on, vec!["B", "C"]);

    let outgoing = service
        .get_dependencies(&id("A"), DependencyDirection::Outgoing)
        .await
        .unwrap();
    let waiting: Vec<_> = outgoing.iter().map(|e| e.dependent_id.as_str()).collect();
    assert_eq!(waiting, vec!["B", "C"]);
    assert!(outgoing.iter().all(|e| e.dep_type == DependencyType::Blocks));
}

#[rstest]
#[case::incoming(DependencyDirection::Incoming)]
#[case::outgoing(DependencyDirection::Outgoing)]
#[tokio::test]
async fn test_get_dependencies_unknown_item(#[case] direction: DependencyDirection) {
    let service = service_with(&[("A", 1)], &[]).await;

    let err = service
        .get_dependencies(&id("ghost"), direction)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::WorkItemNotFound(ref i) if i.as_str() == "ghost"));

    // A known item without edges is simply empty
    assert!(service.get_dependencies(&id("A"), direction).await.unwrap().is_empty());
}

// ========== Critical Path ==========

#[tokio::test]
async fn test_chain_critical_path() {
    let service = chain().await;

    let path = service.calculate_critical_path().await.unwrap();
    assert_eq!(ids(&path), vec!["C", "B", "A"]);

    let schedule = service.schedule().await.unwrap();
    assert_eq!(schedule.project_finish(), 6);
    assert_eq!(schedule.node(&id("B")).unwrap().earliest_finish, 5);
}

#[tokio::test]
async fn test_diamond_critical_path() {
    let service = diamond().await;

    let path = service.calculate_critical_path().await.unwrap();
    assert_eq!(ids(&path), vec!["A", "B", "D"]);

    let schedule = service.schedule().await.unwrap();
    assert_eq!(schedule.node(&id("D")).unwrap().earliest_finish, 7);
    assert_eq!(schedule.node(&id("C")).unwrap().slack, 3);
}

#[tokio::test]
async fn test_diamond_with_documented_durations() {
    // A (1) feeds B (5) and C (2), both of which feed D (1)
    let service = service_with(
        &[("A", 1), ("B", 5), ("C", 2), ("D", 1)],
        &[("B", "A"), ("C", "A"), ("D", "B"), ("D", "C")],
    )
    .await;

    let path = service.calculate_critical_path().await.unwrap();
    assert_eq!(ids(&path), vec!["A", "B", "D"]);

    let schedule = service.schedule().await.unwrap();
    assert_eq!(schedule.node(&id("D")).unwrap().earliest_finish, 7);
    assert_eq!(schedule.node(&id("C")).unwrap().slack, 3);
    assert_eq!(schedule.project_finish(), 7);
}

#[tokio::test]
async fn test_empty_project_has_empty_path() {
    let service = service_with(&[], &[]).await;
    assert!(service.calculate_critical_path().await.unwrap().is_empty());
    assert!(service.identify_parallel_paths().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_all_dependency_types_constrain_the_schedule() {
    let service = service_with(&[("A", 1), ("B", 2)], &[]).await;
    service
        .add_dependency(&id("A"), &id("B"), DependencyType::RelatesTo, "t")
        .await
        .unwrap();

    let path = service.calculate_critical_path().await.unwrap();
    assert_eq!(ids(&path), vec!["B", "A"]);
}

#[rstest]
#[case::two_items(&[("A", "B"), ("B", "A")], &["A", "B"])]
#[case::three_items(&[("A", "B"), ("B", "C"), ("C", "A")], &["A", "B", "C"])]
#[tokio::test]
async fn test_cycle_fails_with_members(
    #[case] edges: &[(&str, &str)],
    #[case] expected: &[&str],
) {
    let service = service_with(&[("A", 1), ("B", 1), ("C", 1)], edges).await;

    let err = service.calculate_critical_path().await.unwrap_err();
    match err {
        Error::CyclicDependency { cycle } => {
            let members: Vec<_> = cycle.iter().map(|i| i.as_str()).collect();
            assert_eq!(members, expected);
        }
        other => panic!("expected CyclicDependency, got {other:?}"),
    }
}

#[tokio::test]
async fn test_path_to_target_excludes_unrelated_branches() {
    // L is long but unrelated to T
    let service = service_with(&[("L", 10), ("T", 1), ("X", 2)], &[("T", "X")]).await;

    let project = service.calculate_critical_path().await.unwrap();
    assert_eq!(ids(&project), vec!["L"]);

    let to_target = service.calculate_critical_path_to(&id("T")).await.unwrap();
    assert_eq!(ids(&to_target), vec!["X", "T"]);
}

#[tokio::test]
async fn test_path_to_target_ignores_cycles_elsewhere() {
    let service = service_with(
        &[("P", 1), ("Q", 1), ("T", 1), ("X", 2)],
        &[("T", "X"), ("P", "Q"), ("Q", "P")],
    )
    .await;

    let to_target = service.calculate_critical_path_to(&id("T")).await.unwrap();
    assert_eq!(ids(&to_target), vec!["X", "T"]);
    assert!(matches!(
        service.calculate_critical_path().await,
        Err(Error::CyclicDependency { .. })
    ));
}

#[tokio::test]
async fn test_path_to_unknown_target() {
    let service = chain().await;
    let err = service
        .calculate_critical_path_to(&id("nope"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::WorkItemNotFound(_)));
}

#[tokio::test]
async fn test_scope_limit_is_enforced() {
    let service = chain().await.with_config(EngineConfig {
        max_scope_nodes: 2,
        ..EngineConfig::default()
    });

    let err = service.calculate_critical_path().await.unwrap_err();
    assert!(matches!(err, Error::ScopeTooLarge { size: 3, limit: 2 }));

    // The ancestors of B are only B and C
    let path = service.calculate_critical_path_to(&id("B")).await.unwrap();
    assert_eq!(ids(&path), vec!["C", "B"]);
}

#[tokio::test]
async fn test_parallel_paths_of_diamond() {
    let service = diamond().await;
    let chains = service.identify_parallel_paths().await.unwrap();

    let chains: Vec<Vec<&str>> = chains.iter().map(|c| ids(c)).collect();
    assert_eq!(chains, vec![vec!["A", "B", "D"], vec!["C"]]);
}

// ========== Blockers ==========

#[tokio::test]
async fn test_blocked_item_off_critical_path_is_not_a_blocker() {
    let service = diamond().await;
    service
        .mark_as_blocked(&id("C"), "waiting on design", None)
        .await
        .unwrap();

    assert!(service.identify_blockers().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_blockers_ordered_by_earliest_start() {
    let service = diamond().await;
    service
        .mark_as_blocked(&id("D"), "needs sign-off", Some("legal"))
        .await
        .unwrap();
    service
        .mark_as_blocked(&id("A"), "vendor outage", None)
        .await
        .unwrap();

    let blockers = service.identify_blockers().await.unwrap();
    assert_eq!(ids(&blockers), vec!["A", "D"]);

    let info = blockers[1].blocked.as_ref().unwrap();
    assert_eq!(info.reason, "needs sign-off");
    assert_eq!(info.blocked_by.as_deref(), Some("legal"));
}

#[tokio::test]
async fn test_unblock_returns_item_to_open() {
    let service = chain().await;
    service
        .mark_as_blocked(&id("B"), "flaky CI", None)
        .await
        .unwrap();

    let item = service.mark_as_unblocked(&id("B")).await.unwrap();
    assert_eq!(item.status, WorkItemStatus::Open);
    assert!(item.blocked.is_none());
    assert!(service.identify_blockers().await.unwrap().is_empty());
}

#[rstest]
#[case::block(true)]
#[case::unblock(false)]
#[tokio::test]
async fn test_blocking_unknown_item(#[case] block: bool) {
    let service = chain().await;
    let result = if block {
        service.mark_as_blocked(&id("nope"), "n/a", None).await
    } else {
        service.mark_as_unblocked(&id("nope")).await
    };
    assert!(matches!(result, Err(Error::WorkItemNotFound(_))));
}

#[tokio::test]
async fn test_find_blocking_items_by_fan_out() {
    // H blocks three items, G blocks two, F blocks one
    let service = service_with(
        &[
            ("F", 1),
            ("G", 1),
            ("H", 1),
            ("a", 1),
            ("b", 1),
            ("c", 1),
        ],
        &[
            ("a", "H"),
            ("b", "H"),
            ("c", "H"),
            ("a", "G"),
            ("b", "G"),
            ("c", "F"),
        ],
    )
    .await;

    let blocking = service.find_blocking_items().await.unwrap();
    assert_eq!(ids(&blocking), vec!["H", "G"]);
}

#[tokio::test]
async fn test_find_items_depending_on() {
    let service = diamond().await;

    let dependents = service.find_items_depending_on(&id("A")).await.unwrap();
    assert_eq!(ids(&dependents), vec!["B", "C"]);
    assert!(
        service
            .find_items_depending_on(&id("D"))
            .await
            .unwrap()
            .is_empty()
    );
    assert!(matches!(
        service.find_items_depending_on(&id("nope")).await,
        Err(Error::WorkItemNotFound(_))
    ));
}

// ========== Delay Impact ==========

#[tokio::test]
async fn test_zero_delay_has_no_impact() {
    let service = diamond().await;
    let impact = service.calculate_delay_impact(&id("A"), 0).await.unwrap();

    assert!(impact.affected.is_empty());
    assert_eq!(impact.original_project_finish, impact.delayed_project_finish);
}

#[tokio::test]
async fn test_delay_on_critical_item_moves_project() {
    let service = chain().await;
    let impact = service.calculate_delay_impact(&id("C"), 2).await.unwrap();

    let affected: Vec<_> = impact.affected.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(affected, vec!["B", "A"]);
    assert_eq!(impact.original_project_finish, 6);
    assert_eq!(impact.delayed_project_finish, 8);
}

#[tokio::test]
async fn test_delay_absorbed_by_slack() {
    let service = diamond().await;
    let impact = service.calculate_delay_impact(&id("C"), 2).await.unwrap();

    assert!(impact.affected.is_empty());
    assert_eq!(impact.delayed_project_finish, 7);
}

#[tokio::test]
async fn test_delay_of_unknown_item() {
    let service = diamond().await;
    assert!(matches!(
        service.calculate_delay_impact(&id("nope"), 1).await,
        Err(Error::WorkItemNotFound(_))
    ));
}

// ========== Completion Dates ==========

#[tokio::test]
async fn test_completion_dates_from_start() {
    let service = chain().await;
    let start = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();

    let dates = service.get_estimated_completion_dates(start).await.unwrap();
    assert_eq!(dates[&id("C")], NaiveDate::from_ymd_opt(2025, 3, 6).unwrap());
    assert_eq!(dates[&id("A")], NaiveDate::from_ymd_opt(2025, 3, 9).unwrap());
}

#[tokio::test]
async fn test_completion_dates_from_today_cover_open_items() {
    let service = chain().await;
    let dates = service
        .get_estimated_completion_dates_from_today()
        .await
        .unwrap();
    assert_eq!(dates.len(), 3);
    assert!(dates[&id("C")] < dates[&id("A")]);
}

// ========== Integrity ==========

#[tokio::test]
async fn test_check_integrity_passes_for_dag() {
    let service = diamond().await;
    service.check_integrity().await.unwrap();
}

#[tokio::test]
async fn test_check_integrity_reports_cycle() {
    let service = chain().await;
    service
        .add_dependency(&id("C"), &id("A"), DependencyType::ParentChild, "t")
        .await
        .unwrap();

    let err = service.check_integrity().await.unwrap_err();
    assert!(err.to_string().contains("Cyclic dependency"));
}
