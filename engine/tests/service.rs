use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use tokio_util::sync::CancellationToken;

use taskflow_engine::allocation::WorkloadOptimizationKind;
use taskflow_engine::critical_path::{PathSuggestion, RiskKind};
use taskflow_engine::repository::ScheduleRepository;
use taskflow_engine::{
    AllocationRequest, ConflictType, EngineConfig, EngineError, InMemoryStore, PlanningService,
    PredictionTarget, Project, ResolutionStrategy, Task, TaskStatus, Team, TeamMember,
};

fn dt(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 1, day)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

fn project(id: &str) -> Project {
    Project {
        id: id.to_string(),
        organization_id: "org".to_string(),
        name: format!("Project {id}"),
        start_date: dt(6, 9),
        deadline: None,
    }
}

fn task(id: &str, hours: f64, deps: &[&str]) -> Task {
    Task::new(id, id)
        .in_project("org", "p1")
        .with_estimate(hours)
        .with_dependencies(deps)
}

fn service_with(tasks: Vec<Task>, teams: Vec<Team>) -> (Arc<InMemoryStore>, PlanningService) {
    let store = Arc::new(InMemoryStore::new());
    store.put_project(project("p1")).unwrap();
    for task in tasks {
        store.put_task(task).unwrap();
    }
    for team in teams {
        store.put_team(team).unwrap();
    }
    let service = PlanningService::in_memory(store.clone(), EngineConfig::default());
    (store, service)
}

fn team(id: &str, members: Vec<TeamMember>) -> Team {
    Team {
        id: id.to_string(),
        organization_id: "org".to_string(),
        members,
    }
}

fn chain() -> Vec<Task> {
    vec![
        task("A", 2.0, &[]),
        task("B", 4.0, &["A"]),
        task("C", 1.0, &["B"]),
    ]
}

#[test]
fn test_generate_schedule_for_chain() {
    let (_, service) = service_with(chain(), Vec::new());
    let calendar = service.working_calendar();
    let generated = service
        .generate_schedule("p1", dt(6, 9), None, Some(calendar))
        .unwrap();

    let spans: Vec<(&str, NaiveDateTime, NaiveDateTime)> = generated
        .schedule
        .tasks
        .iter()
        .map(|t| (t.task_id.as_str(), t.start, t.end))
        .collect();
    assert_eq!(
        spans,
        vec![
            ("A", dt(6, 9), dt(6, 11)),
            ("B", dt(6, 11), dt(6, 15)),
            ("C", dt(6, 15), dt(6, 16)),
        ]
    );
    assert_eq!(generated.schedule.version, 1);

    let critical: Vec<&str> = generated
        .critical_path
        .tasks
        .iter()
        .map(|t| t.task_id.as_str())
        .collect();
    assert_eq!(critical, vec!["A", "B", "C"]);
    assert!((generated.critical_path.total_duration_hours - 7.0).abs() < 1e-9);
    assert!(generated.critical_path.tasks.iter().all(|t| t.float_hours.abs() < 1e-9));
    assert!(generated.conflicts.is_empty());
}

#[test]
fn test_calendar_gaps_are_not_counted_as_work() {
    let (_, service) = service_with(vec![task("long", 10.0, &[])], Vec::new());
    let calendar = service.working_calendar();
    let generated = service
        .generate_schedule("p1", dt(6, 9), None, Some(calendar))
        .unwrap();

    // One 8h day plus 2h: the task ends the next morning.
    assert_eq!(generated.schedule.end_date, dt(7, 11));
    let path = &generated.critical_path;
    assert!((path.total_duration_hours - 10.0).abs() < 1e-9);
    assert_eq!(path.start_date, dt(6, 9));
    assert_eq!(path.end_date, generated.schedule.end_date);

    let analysis = service.analyze_critical_path("p1").unwrap();
    assert!((analysis.critical_path.total_duration_hours - 10.0).abs() < 1e-9);
    assert_eq!(analysis.critical_path.end_date, dt(7, 11));
    assert!(!analysis
        .suggestions
        .iter()
        .any(|s| matches!(s, PathSuggestion::SplitTask { .. })));
}

#[test]
fn test_regenerating_supersedes_previous_schedule() {
    let (store, service) = service_with(chain(), Vec::new());
    service.generate_schedule("p1", dt(6, 9), None, None).unwrap();
    let second = service.generate_schedule("p1", dt(7, 9), None, None).unwrap();

    assert_eq!(second.schedule.version, 2);
    let stored = ScheduleRepository::find_by_project(store.as_ref(), "p1")
        .unwrap()
        .unwrap();
    assert_eq!(stored.start_date, dt(7, 9));
}

#[test]
fn test_cycle_is_reported_distinctly() {
    let tasks = vec![task("A", 1.0, &["B"]), task("B", 1.0, &["A"]), task("C", 1.0, &[])];
    let (store, service) = service_with(tasks, Vec::new());
    let err = service
        .generate_schedule("p1", dt(6, 9), None, None)
        .unwrap_err();

    match err {
        EngineError::CyclicDependency { tasks } => assert_eq!(tasks, vec!["A", "B"]),
        other => panic!("expected a cycle, got {other:?}"),
    }
    assert!(ScheduleRepository::find_by_project(store.as_ref(), "p1")
        .unwrap()
        .is_none());
}

#[test]
fn test_unusable_estimate_is_a_validation_error() {
    let (store, service) = service_with(vec![task("huge", f64::INFINITY, &[])], Vec::new());
    let err = service
        .generate_schedule("p1", dt(6, 9), None, None)
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
    assert!(ScheduleRepository::find_by_project(store.as_ref(), "p1")
        .unwrap()
        .is_none());
}

#[test]
fn test_unknown_project_is_not_found() {
    let (_, service) = service_with(Vec::new(), Vec::new());
    let err = service
        .generate_schedule("nope", dt(6, 9), None, None)
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound { kind: "project", .. }));
}

#[test]
fn test_shared_worker_overlap_detected_and_resolved() {
    let tasks = vec![
        task("t1", 2.0, &[]).with_assignee("W1"),
        task("t2", 2.0, &[]).with_assignee("W1"),
    ];
    let (_, service) = service_with(tasks, Vec::new());
    let generated = service.generate_schedule("p1", dt(6, 9), None, None).unwrap();

    assert_eq!(generated.conflicts.len(), 1);
    let conflict = &generated.conflicts[0];
    assert_eq!(conflict.conflict_type, ConflictType::Resource);
    assert_eq!(conflict.task_ids, vec!["t1", "t2"]);
    assert_eq!(conflict.resources, vec!["W1"]);

    // High severity is left alone unless the caller allows it.
    let automatic = service
        .resolve_conflicts(
            &generated.schedule,
            &generated.conflicts,
            &ResolutionStrategy::Automatic,
        )
        .unwrap();
    assert_eq!(automatic.unresolved.len(), 1);
    assert_eq!(automatic.schedule.version, generated.schedule.version);

    let outcome = service
        .resolve_conflicts(
            &generated.schedule,
            &generated.conflicts,
            &ResolutionStrategy::AllowHighSeverity,
        )
        .unwrap();
    assert!(outcome.unresolved.is_empty());
    assert_eq!(outcome.schedule.version, 2);
    let t2 = outcome.schedule.get("t2").unwrap();
    assert_eq!((t2.start, t2.end), (dt(6, 11), dt(6, 13)));
    assert!(service.detect_conflicts(&outcome.schedule).is_empty());
}

#[test]
fn test_stale_schedule_cannot_overwrite() {
    let (_, service) = service_with(chain(), Vec::new());
    let first = service.generate_schedule("p1", dt(6, 9), None, None).unwrap();
    service.generate_schedule("p1", dt(6, 9), None, None).unwrap();

    let err = service.optimize_schedule(&first.schedule, "time").unwrap_err();
    assert!(matches!(
        err,
        EngineError::VersionConflict {
            expected: 1,
            found: 2,
            ..
        }
    ));
}

#[test]
fn test_optimize_rejects_unknown_strategy() {
    let (_, service) = service_with(chain(), Vec::new());
    let generated = service.generate_schedule("p1", dt(6, 9), None, None).unwrap();
    let err = service
        .optimize_schedule(&generated.schedule, "fastest")
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidStrategy(name) if name == "fastest"));
}

#[test]
fn test_cancelled_call_persists_nothing() {
    let store = Arc::new(InMemoryStore::new());
    store.put_project(project("p1")).unwrap();
    for task in chain() {
        store.put_task(task).unwrap();
    }
    let cancel = CancellationToken::new();
    let service = PlanningService::in_memory(store.clone(), EngineConfig::default())
        .with_cancellation(cancel.clone());
    cancel.cancel();

    let err = service
        .generate_schedule("p1", dt(6, 9), None, None)
        .unwrap_err();
    assert!(matches!(err, EngineError::Cancelled));
    assert!(ScheduleRepository::find_by_project(store.as_ref(), "p1")
        .unwrap()
        .is_none());
}

#[test]
fn test_critical_path_analysis_flags_unassigned_work() {
    let (_, service) = service_with(chain(), Vec::new());
    service.generate_schedule("p1", dt(6, 9), None, None).unwrap();
    let analysis = service.analyze_critical_path("p1").unwrap();

    assert!(analysis.critical_path.contains("B"));
    assert_eq!(analysis.critical_path.start_date, dt(6, 9));
    assert_eq!(analysis.critical_path.end_date, dt(6, 16));
    let unassigned = analysis
        .risks
        .iter()
        .filter(|r| r.kind == RiskKind::Unassigned)
        .count();
    assert_eq!(unassigned, 3);
}

#[test]
fn test_project_completion_forecast() {
    let mut tasks = chain();
    tasks.push(
        task("done", 4.0, &[])
            .with_status(TaskStatus::Completed)
            .with_actual_hours(5.0),
    );
    let (_, service) = service_with(tasks, Vec::new());
    let forecast = service
        .predict_completion(&PredictionTarget::Project("p1".to_string()), dt(6, 9))
        .unwrap();

    // One sample overran by 25%.
    assert_eq!(forecast.history.sample_size, 1);
    assert!((forecast.history.variance_percent - 25.0).abs() < 1e-9);
    assert_eq!(forecast.tasks.len(), 3);

    let project = forecast.project.unwrap();
    // C finishes after 7h of work, stretched by 25%.
    assert_eq!(
        project.predicted_completion,
        dt(6, 9) + chrono::Duration::minutes(525)
    );
    assert_eq!(project.critical_tasks[0], "C");
}

#[test]
fn test_completed_task_forecast_is_certain() {
    let tasks = vec![task("done", 4.0, &[]).with_status(TaskStatus::Completed)];
    let (_, service) = service_with(tasks, Vec::new());
    let forecast = service
        .predict_completion(&PredictionTarget::Task("done".to_string()), dt(8, 12))
        .unwrap();
    assert_eq!(forecast.tasks.len(), 1);
    assert_eq!(forecast.tasks[0].predicted_completion, dt(8, 12));
    assert_eq!(forecast.tasks[0].confidence, 1.0);
    assert!(forecast.project.is_none());
}

fn allocation_request(strategy: &str) -> AllocationRequest {
    AllocationRequest {
        organization_id: "org".to_string(),
        project_id: Some("p1".to_string()),
        team_id: Some("team".to_string()),
        strategy: strategy.to_string(),
        max_tasks: None,
    }
}

#[test]
fn test_balanced_allocation_splits_evenly() {
    let tasks = (1..=4)
        .map(|i| task(&format!("t{i}"), 4.0, &[]))
        .chain([task("taken", 4.0, &[]).with_assignee("u1")])
        .collect();
    let members = vec![TeamMember::new("u1", 1.0), TeamMember::new("u2", 1.0)];
    let (_, service) = service_with(tasks, vec![team("team", members)]);

    let result = service
        .allocate_tasks(&allocation_request("balanced"))
        .unwrap();
    let pairs: Vec<(&str, &str)> = result
        .assignments
        .iter()
        .map(|a| (a.task_id.as_str(), a.assignee_id.as_str()))
        .collect();
    assert_eq!(
        pairs,
        vec![("t1", "u1"), ("t2", "u2"), ("t3", "u1"), ("t4", "u2")]
    );
    assert_eq!(result.summary.total_tasks, 4);

    let again = service
        .allocate_tasks(&allocation_request("balanced"))
        .unwrap();
    assert_eq!(result, again);
}

#[test]
fn test_allocation_errors() {
    let tasks = vec![task("t1", 4.0, &[])];
    let members = vec![TeamMember::new("u1", 1.0).inactive()];
    let (_, service) = service_with(tasks, vec![team("team", members)]);

    let err = service
        .allocate_tasks(&allocation_request("random"))
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidStrategy(_)));

    let err = service
        .allocate_tasks(&allocation_request("skill_based"))
        .unwrap_err();
    assert!(matches!(err, EngineError::CapacityExhausted(_)));

    let mut missing_team = allocation_request("balanced");
    missing_team.team_id = Some("ghost".to_string());
    let err = service.allocate_tasks(&missing_team).unwrap_err();
    assert!(matches!(err, EngineError::NotFound { kind: "team", .. }));
}

#[test]
fn test_max_tasks_caps_allocation() {
    let tasks = (1..=5).map(|i| task(&format!("t{i}"), 2.0, &[])).collect();
    let (_, service) = service_with(tasks, vec![team("team", vec![TeamMember::new("u1", 1.0)])]);
    let mut request = allocation_request("priority_based");
    request.max_tasks = Some(2);
    let result = service.allocate_tasks(&request).unwrap();
    assert_eq!(result.assignments.len(), 2);
}

#[test]
fn test_workload_report_and_rebalance() {
    let tasks = vec![
        task("a", 10.0, &[]).with_assignee("u1"),
        task("b", 6.0, &[])
            .with_assignee("u1")
            .with_status(TaskStatus::InProgress),
        task("c", 40.0, &[])
            .with_assignee("u2")
            .with_status(TaskStatus::Completed),
    ];
    let members = vec![TeamMember::new("u1", 1.0), TeamMember::new("u2", 1.0)];
    let (_, service) = service_with(tasks, vec![team("team", members)]);

    let report = service.analyze_team_workload("team").unwrap();
    assert_eq!(report.members[0].active_tasks, 2);
    assert!((report.members[0].current_load - 0.4).abs() < 1e-9);
    assert_eq!(report.members[1].current_load, 0.0);
    assert!((report.metrics.average_load - 0.2).abs() < 1e-9);
    assert_eq!(report.metrics.total_tasks, 2);

    let recs = service.optimize_workload("team", "balance").unwrap();
    assert_eq!(recs.len(), 1);
    assert_eq!(recs[0].kind, WorkloadOptimizationKind::Rebalance);
    assert_eq!(recs[0].members, vec!["u1", "u2"]);
}

#[test]
fn test_recommendation_prefers_idle_member() {
    let tasks = vec![
        task("new", 4.0, &[]),
        task("load", 36.0, &[]).with_assignee("busy"),
    ];
    let members = vec![TeamMember::new("busy", 1.0), TeamMember::new("idle", 1.0)];
    let (_, service) = service_with(tasks, vec![team("team", members)]);

    let recs = service.recommend_assignee("new", None).unwrap();
    let ids: Vec<&str> = recs.iter().map(|r| r.user_id.as_str()).collect();
    assert_eq!(ids, vec!["idle", "busy"]);
}

#[test]
fn test_reallocation_moves_work_to_better_suited_member() {
    let tasks = vec![task("wip", 4.0, &[])
        .with_assignee("stretched")
        .with_status(TaskStatus::InProgress)];
    let members = vec![
        TeamMember::new("stretched", 0.3),
        TeamMember::new("free", 1.0),
    ];
    let (_, service) = service_with(tasks, vec![team("team", members)]);

    let moves = service.reallocate_tasks("org", Some("team")).unwrap();
    assert_eq!(moves.len(), 1);
    assert_eq!(moves[0].task_id, "wip");
    assert_eq!(moves[0].to_assignee, "free");
}

#[test]
fn test_reallocation_moves_work_off_unavailable_member() {
    let tasks = vec![
        task("left", 4.0, &[])
            .with_assignee("gone")
            .with_status(TaskStatus::InProgress),
        task("idle", 4.0, &[])
            .with_assignee("zero")
            .with_status(TaskStatus::InProgress),
    ];
    let members = vec![
        TeamMember::new("gone", 1.0).inactive(),
        TeamMember::new("zero", 0.0),
        TeamMember::new("free", 0.5),
    ];
    let (_, service) = service_with(tasks, vec![team("team", members)]);

    let moves = service.reallocate_tasks("org", Some("team")).unwrap();
    let moved: Vec<(&str, &str)> = moves
        .iter()
        .map(|m| (m.task_id.as_str(), m.to_assignee.as_str()))
        .collect();
    assert_eq!(moved, vec![("left", "free"), ("idle", "free")]);
    assert!(moves.iter().all(|m| m.current_score == 0.0));
}
