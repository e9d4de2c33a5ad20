use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::model::{
    leave_type::LeaveType,
    request::{ExpenseDetails, LeaveDetails, RequestDetails, RequestKind, RequestStatus, TimesheetDetails},
    role::Role,
    user::User,
};
use crate::store::{WorkflowStore, memory::MemoryStore};
use crate::workflow::{
    Workflow,
    authz::Actor,
    error::WorkflowError,
    lifecycle::{LeavePatch, RequestPatch, TimesheetPatch},
    notify::{Notification, NotificationSink, WorkflowEvent},
};

const ADMIN: Actor = Actor { id: 1, role: Role::Admin };
const MANAGER: Actor = Actor { id: 2, role: Role::Manager };
const ALICE: Actor = Actor { id: 3, role: Role::Employee };
const BOB: Actor = Actor { id: 4, role: Role::Employee };
const CAROL: Actor = Actor { id: 5, role: Role::Employee };

const ANNUAL: u64 = 1;
const UNPAID: u64 = 2;

#[derive(Default)]
struct RecordingSink {
    seen: Mutex<Vec<Notification>>,
}

impl RecordingSink {
    fn events(&self) -> Vec<WorkflowEvent> {
        self.seen.lock().unwrap().iter().map(|n| n.event).collect()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn notify(&self, notification: &Notification) -> anyhow::Result<()> {
        self.seen.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

struct FailingSink;

#[async_trait]
impl NotificationSink for FailingSink {
    async fn notify(&self, _: &Notification) -> anyhow::Result<()> {
        anyhow::bail!("mail relay unreachable")
    }
}

/// Never finishes delivering
struct StalledSink;

#[async_trait]
impl NotificationSink for StalledSink {
    async fn notify(&self, _: &Notification) -> anyhow::Result<()> {
        futures::future::pending::<()>().await;
        Ok(())
    }
}

/// Lets spawned deliveries run
async fn settle() {
    actix_web::rt::time::sleep(Duration::from_millis(20)).await;
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn user(id: u64, role: Role, manager_id: Option<u64>) -> User {
    User {
        id,
        username: format!("user{id}"),
        role,
        manager_id,
        is_active: true,
    }
}

fn seeded_store() -> Arc<MemoryStore> {
    let store = MemoryStore::new();
    store.add_user(user(1, Role::Admin, None));
    store.add_user(user(2, Role::Manager, None));
    store.add_user(user(3, Role::Employee, Some(2)));
    store.add_user(user(4, Role::Employee, Some(2)));
    store.add_user(user(5, Role::Employee, None));
    store.add_leave_type(LeaveType {
        id: ANNUAL,
        code: "annual".into(),
        name: "Annual Leave".into(),
        max_days: 5,
        is_active: true,
        has_default_balance: true,
    });
    store.add_leave_type(LeaveType {
        id: UNPAID,
        code: "unpaid".into(),
        name: "Unpaid Leave".into(),
        max_days: 0,
        is_active: true,
        has_default_balance: false,
    });
    store.set_balance(3, ANNUAL, 2025, 5);
    Arc::new(store)
}

fn engine(store: Arc<MemoryStore>, sink: Arc<dyn NotificationSink>) -> Workflow {
    Workflow::new(store, sink, Duration::from_secs(60))
}

fn leave(leave_type_id: u64, start: NaiveDate, end: NaiveDate) -> RequestDetails {
    RequestDetails::Leave(LeaveDetails {
        leave_type_id,
        start_date: start,
        end_date: end,
        reason: "Family visit".into(),
        applied_at: None,
    })
}

fn timesheet(hours: f64) -> RequestDetails {
    RequestDetails::Timesheet(TimesheetDetails {
        project_id: 7,
        date: date(2025, 12, 1),
        hours,
        description: "Sprint work".into(),
    })
}

fn expense(amount: f64) -> RequestDetails {
    RequestDetails::Expense(ExpenseDetails {
        date: date(2025, 12, 1),
        amount,
        description: "Train ticket".into(),
        receipt_ref: Some("receipts/abc.pdf".into()),
    })
}

#[actix_web::test]
async fn approved_leave_debits_working_days_once() {
    let store = seeded_store();
    let wf = engine(store.clone(), Arc::new(RecordingSink::default()));

    // Mon 1 .. Wed 3 December 2025
    let draft = wf
        .create(&ALICE, None, leave(ANNUAL, date(2025, 12, 1), date(2025, 12, 3)))
        .await
        .unwrap();
    assert_eq!(draft.status, RequestStatus::Draft);
    assert_eq!(draft.owner_id, 3);

    let submitted = wf.submit(&ALICE, RequestKind::Leave, draft.id).await.unwrap();
    assert_eq!(submitted.status, RequestStatus::Submitted);
    assert!(submitted.details.as_leave().unwrap().applied_at.is_some());

    let approved = wf.approve(&MANAGER, RequestKind::Leave, draft.id).await.unwrap();
    assert_eq!(approved.status, RequestStatus::Approved);
    assert_eq!(approved.approver_id, Some(2));
    assert_eq!(store.find_balance(3, ANNUAL, 2025).await.unwrap(), Some(2));

    let again = wf.approve(&MANAGER, RequestKind::Leave, draft.id).await.unwrap_err();
    assert_eq!(
        again,
        WorkflowError::InvalidState("Only submitted leaves can be approved".into())
    );
    assert_eq!(store.find_balance(3, ANNUAL, 2025).await.unwrap(), Some(2));
}

#[actix_web::test]
async fn untracked_leave_never_touches_the_ledger() {
    let store = seeded_store();
    let wf = engine(store.clone(), Arc::new(RecordingSink::default()));

    let draft = wf
        .create(&ALICE, None, leave(UNPAID, date(2025, 12, 1), date(2025, 12, 31)))
        .await
        .unwrap();
    wf.submit(&ALICE, RequestKind::Leave, draft.id).await.unwrap();
    wf.approve(&ADMIN, RequestKind::Leave, draft.id).await.unwrap();

    assert_eq!(store.find_balance(3, UNPAID, 2025).await.unwrap(), None);
    assert_eq!(store.find_balance(3, ANNUAL, 2025).await.unwrap(), Some(5));
}

#[actix_web::test]
async fn leave_over_the_type_cap_is_rejected() {
    let wf = engine(seeded_store(), Arc::new(RecordingSink::default()));

    // 6 working days against a cap of 5
    let err = wf
        .create(&ALICE, None, leave(ANNUAL, date(2025, 12, 1), date(2025, 12, 8)))
        .await
        .unwrap_err();
    match err {
        WorkflowError::BusinessRule(msg) => assert!(msg.contains("exceeds the maximum of 5 days"), "{msg}"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[actix_web::test]
async fn leave_beyond_the_balance_states_the_shortfall() {
    let store = seeded_store();
    store.set_balance(3, ANNUAL, 2025, 1);
    let wf = engine(store.clone(), Arc::new(RecordingSink::default()));

    let err = wf
        .create(&ALICE, None, leave(ANNUAL, date(2025, 12, 1), date(2025, 12, 3)))
        .await
        .unwrap_err();
    match err {
        WorkflowError::BusinessRule(msg) => {
            assert!(msg.contains("requested 3 days"), "{msg}");
            assert!(msg.contains("available 1 days"), "{msg}");
            assert!(msg.contains("short by 2 days"), "{msg}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(
        store
            .list_requests(
                RequestKind::Leave,
                &crate::workflow::authz::ListScope::Owners { owner_ids: vec![3], status: None }
            )
            .await
            .unwrap()
            .is_empty()
    );
}

#[actix_web::test]
async fn weekend_only_leave_is_allowed_with_no_balance() {
    let store = seeded_store();
    let wf = engine(store.clone(), Arc::new(RecordingSink::default()));

    // Bob has no annual balance row at all
    let draft = wf
        .create(&BOB, None, leave(ANNUAL, date(2025, 12, 6), date(2025, 12, 7)))
        .await
        .unwrap();
    wf.submit(&BOB, RequestKind::Leave, draft.id).await.unwrap();
    wf.approve(&MANAGER, RequestKind::Leave, draft.id).await.unwrap();

    assert_eq!(store.find_balance(4, ANNUAL, 2025).await.unwrap(), Some(0));
}

#[actix_web::test]
async fn employee_cannot_act_on_a_colleagues_draft() {
    let wf = engine(seeded_store(), Arc::new(RecordingSink::default()));
    let draft = wf.create(&ALICE, None, timesheet(8.0)).await.unwrap();

    for err in [
        wf.submit(&BOB, RequestKind::Timesheet, draft.id).await.unwrap_err(),
        wf.get(&BOB, RequestKind::Timesheet, draft.id).await.unwrap_err(),
        wf.delete(&BOB, RequestKind::Timesheet, draft.id).await.unwrap_err(),
    ] {
        assert!(matches!(err, WorkflowError::Forbidden(_)), "{err:?}");
    }

    let create_for_other = wf.create(&ALICE, Some(4), timesheet(8.0)).await.unwrap_err();
    assert_eq!(
        create_for_other,
        WorkflowError::Forbidden("Employees can create timesheets only for themselves".into())
    );
}

#[actix_web::test]
async fn employees_cannot_decide() {
    let wf = engine(seeded_store(), Arc::new(RecordingSink::default()));
    let draft = wf.create(&ALICE, None, expense(10.0)).await.unwrap();
    wf.submit(&ALICE, RequestKind::Expense, draft.id).await.unwrap();

    let err = wf.approve(&BOB, RequestKind::Expense, draft.id).await.unwrap_err();
    assert!(matches!(err, WorkflowError::Forbidden(_)));
    let err = wf.approve(&ALICE, RequestKind::Expense, draft.id).await.unwrap_err();
    assert!(matches!(err, WorkflowError::Forbidden(_)));
}

#[actix_web::test]
async fn admin_cannot_create_for_self_and_must_name_a_target() {
    let wf = engine(seeded_store(), Arc::new(RecordingSink::default()));

    let own = wf.create(&ADMIN, Some(ADMIN.id), expense(10.0)).await.unwrap_err();
    match own {
        WorkflowError::Forbidden(msg) => assert!(msg.contains("their own expense"), "{msg}"),
        other => panic!("unexpected error: {other:?}"),
    }

    let untargeted = wf.create(&ADMIN, None, expense(10.0)).await.unwrap_err();
    assert!(matches!(untargeted, WorkflowError::Validation(_)));

    let for_carol = wf.create(&ADMIN, Some(5), expense(10.0)).await.unwrap();
    assert_eq!(for_carol.owner_id, 5);
}

#[actix_web::test]
async fn manager_creates_for_managed_employees_only() {
    let wf = engine(seeded_store(), Arc::new(RecordingSink::default()));

    let for_alice = wf.create(&MANAGER, Some(3), timesheet(4.0)).await.unwrap();
    assert_eq!(for_alice.owner_id, 3);

    let for_carol = wf.create(&MANAGER, Some(5), timesheet(4.0)).await.unwrap_err();
    assert!(matches!(for_carol, WorkflowError::Forbidden(_)));

    let missing = wf.create(&MANAGER, Some(99), timesheet(4.0)).await.unwrap_err();
    assert_eq!(missing, WorkflowError::NotFound("User not found".into()));
}

#[actix_web::test]
async fn manager_may_approve_outside_their_team() {
    let wf = engine(seeded_store(), Arc::new(RecordingSink::default()));

    // Carol has no manager
    let draft = wf.create(&CAROL, None, expense(42.0)).await.unwrap();
    wf.submit(&CAROL, RequestKind::Expense, draft.id).await.unwrap();

    let approved = wf.approve(&MANAGER, RequestKind::Expense, draft.id).await.unwrap();
    assert_eq!(approved.status, RequestStatus::Approved);
}

#[actix_web::test]
async fn only_drafts_can_be_changed() {
    let wf = engine(seeded_store(), Arc::new(RecordingSink::default()));
    let draft = wf.create(&ALICE, None, timesheet(8.0)).await.unwrap();
    wf.submit(&ALICE, RequestKind::Timesheet, draft.id).await.unwrap();

    let patch = RequestPatch::Timesheet(TimesheetPatch {
        hours: Some(6.0),
        ..Default::default()
    });
    assert_eq!(
        wf.update(&ALICE, RequestKind::Timesheet, draft.id, patch).await.unwrap_err(),
        WorkflowError::InvalidState("Only draft timesheets can be updated".into())
    );
    assert_eq!(
        wf.delete(&ALICE, RequestKind::Timesheet, draft.id).await.unwrap_err(),
        WorkflowError::InvalidState("Only draft timesheets can be deleted".into())
    );
    assert_eq!(
        wf.submit(&ALICE, RequestKind::Timesheet, draft.id).await.unwrap_err(),
        WorkflowError::InvalidState("Only draft timesheets can be submitted".into())
    );
}

#[actix_web::test]
async fn update_merges_fields_and_revalidates() {
    let wf = engine(seeded_store(), Arc::new(RecordingSink::default()));
    let draft = wf.create(&ALICE, None, timesheet(8.0)).await.unwrap();

    let updated = wf
        .update(
            &ALICE,
            RequestKind::Timesheet,
            draft.id,
            RequestPatch::Timesheet(TimesheetPatch {
                hours: Some(6.5),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
    match &updated.details {
        RequestDetails::Timesheet(t) => {
            assert_eq!(t.hours, 6.5);
            assert_eq!(t.description, "Sprint work");
        }
        other => panic!("unexpected details: {other:?}"),
    }

    let too_long = wf
        .update(
            &ALICE,
            RequestKind::Timesheet,
            draft.id,
            RequestPatch::Timesheet(TimesheetPatch {
                hours: Some(25.0),
                ..Default::default()
            }),
        )
        .await
        .unwrap_err();
    assert!(matches!(too_long, WorkflowError::Validation(_)));

    let empty = wf
        .update(
            &ALICE,
            RequestKind::Timesheet,
            draft.id,
            RequestPatch::Timesheet(TimesheetPatch::default()),
        )
        .await
        .unwrap_err();
    assert_eq!(empty, WorkflowError::Validation("No fields provided for update".into()));
}

#[actix_web::test]
async fn moving_leave_dates_rechecks_the_balance() {
    let wf = engine(seeded_store(), Arc::new(RecordingSink::default()));
    let draft = wf
        .create(&ALICE, None, leave(ANNUAL, date(2025, 12, 1), date(2025, 12, 2)))
        .await
        .unwrap();

    // same span, new reason: no re-check needed
    wf.update(
        &ALICE,
        RequestKind::Leave,
        draft.id,
        RequestPatch::Leave(LeavePatch {
            reason: Some("Moving house".into()),
            ..Default::default()
        }),
    )
    .await
    .unwrap();

    let err = wf
        .update(
            &ALICE,
            RequestKind::Leave,
            draft.id,
            RequestPatch::Leave(LeavePatch {
                end_date: Some(date(2025, 12, 10)),
                ..Default::default()
            }),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::BusinessRule(_)), "{err:?}");

    let backwards = wf
        .update(
            &ALICE,
            RequestKind::Leave,
            draft.id,
            RequestPatch::Leave(LeavePatch {
                start_date: Some(date(2025, 12, 5)),
                ..Default::default()
            }),
        )
        .await
        .unwrap_err();
    assert_eq!(
        backwards,
        WorkflowError::Validation("start_date cannot be after end_date".into())
    );
}

#[actix_web::test]
async fn patch_of_another_kind_is_rejected() {
    let wf = engine(seeded_store(), Arc::new(RecordingSink::default()));
    let draft = wf.create(&ALICE, None, expense(5.0)).await.unwrap();

    let err = wf
        .update(
            &ALICE,
            RequestKind::Expense,
            draft.id,
            RequestPatch::Timesheet(TimesheetPatch {
                hours: Some(1.0),
                ..Default::default()
            }),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Validation(_)));
}

#[actix_web::test]
async fn delete_removes_the_draft() {
    let wf = engine(seeded_store(), Arc::new(RecordingSink::default()));
    let draft = wf.create(&ALICE, None, expense(5.0)).await.unwrap();

    wf.delete(&ALICE, RequestKind::Expense, draft.id).await.unwrap();
    assert_eq!(
        wf.get(&ALICE, RequestKind::Expense, draft.id).await.unwrap_err(),
        WorkflowError::NotFound("Expense not found".into())
    );
}

#[actix_web::test]
async fn reject_requires_a_reason_and_keeps_status() {
    let wf = engine(seeded_store(), Arc::new(RecordingSink::default()));
    let draft = wf.create(&ALICE, None, expense(30.0)).await.unwrap();
    wf.submit(&ALICE, RequestKind::Expense, draft.id).await.unwrap();

    let err = wf.reject(&MANAGER, RequestKind::Expense, draft.id, "   ").await.unwrap_err();
    assert_eq!(err, WorkflowError::Validation("Rejection reason is required".into()));
    let current = wf.get(&ALICE, RequestKind::Expense, draft.id).await.unwrap();
    assert_eq!(current.status, RequestStatus::Submitted);

    let rejected = wf
        .reject(&MANAGER, RequestKind::Expense, draft.id, "  Missing receipt ")
        .await
        .unwrap();
    assert_eq!(rejected.status, RequestStatus::Rejected);
    assert_eq!(rejected.rejection_reason.as_deref(), Some("Missing receipt"));
    assert_eq!(rejected.approver_id, Some(2));
}

#[actix_web::test]
async fn invalid_fields_are_rejected_on_create() {
    let wf = engine(seeded_store(), Arc::new(RecordingSink::default()));

    for details in [timesheet(0.0), timesheet(24.5), expense(0.0), expense(-3.0)] {
        let err = wf.create(&ALICE, None, details).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)), "{err:?}");
    }

    let missing_type = wf
        .create(&ALICE, None, leave(99, date(2025, 12, 1), date(2025, 12, 1)))
        .await
        .unwrap_err();
    assert_eq!(missing_type, WorkflowError::NotFound("Leave type not found".into()));
}

#[actix_web::test]
async fn transitions_are_announced() {
    let sink = Arc::new(RecordingSink::default());
    let wf = engine(seeded_store(), sink.clone());

    let a = wf.create(&ALICE, None, expense(5.0)).await.unwrap();
    wf.submit(&ALICE, RequestKind::Expense, a.id).await.unwrap();
    wf.approve(&ADMIN, RequestKind::Expense, a.id).await.unwrap();

    let b = wf.create(&ALICE, None, expense(6.0)).await.unwrap();
    wf.submit(&ALICE, RequestKind::Expense, b.id).await.unwrap();
    wf.reject(&ADMIN, RequestKind::Expense, b.id, "Duplicate").await.unwrap();

    // a draft edit is not announced
    let c = wf.create(&ALICE, None, expense(7.0)).await.unwrap();
    wf.delete(&ALICE, RequestKind::Expense, c.id).await.unwrap();
    settle().await;

    assert_eq!(
        sink.events(),
        vec![
            WorkflowEvent::Created,
            WorkflowEvent::Submitted,
            WorkflowEvent::Approved,
            WorkflowEvent::Created,
            WorkflowEvent::Submitted,
            WorkflowEvent::Rejected,
            WorkflowEvent::Created,
        ]
    );
    let last = sink.seen.lock().unwrap()[5].clone();
    assert_eq!(last.owner_id, 3);
    assert_eq!(last.actor_id, 1);
}

#[actix_web::test]
async fn failing_sink_does_not_fail_the_transition() {
    let store = seeded_store();
    let wf = engine(store.clone(), Arc::new(FailingSink));

    let draft = wf
        .create(&ALICE, None, leave(ANNUAL, date(2025, 12, 1), date(2025, 12, 1)))
        .await
        .unwrap();
    wf.submit(&ALICE, RequestKind::Leave, draft.id).await.unwrap();
    let approved = wf.approve(&MANAGER, RequestKind::Leave, draft.id).await.unwrap();

    assert_eq!(approved.status, RequestStatus::Approved);
    assert_eq!(store.find_balance(3, ANNUAL, 2025).await.unwrap(), Some(4));
}

#[actix_web::test]
async fn transitions_do_not_wait_for_delivery() {
    let wf = engine(seeded_store(), Arc::new(StalledSink));

    let done = actix_web::rt::time::timeout(Duration::from_secs(2), async {
        let draft = wf.create(&ALICE, None, expense(12.0)).await?;
        wf.submit(&ALICE, RequestKind::Expense, draft.id).await?;
        wf.approve(&MANAGER, RequestKind::Expense, draft.id).await
    })
    .await
    .expect("a stalled sink held up the transition");

    assert_eq!(done.unwrap().status, RequestStatus::Approved);
}

#[actix_web::test]
async fn list_scopes_follow_the_role() {
    let wf = engine(seeded_store(), Arc::new(RecordingSink::default()));

    let alice_draft = wf
        .create(&ALICE, None, leave(UNPAID, date(2025, 12, 1), date(2025, 12, 1)))
        .await
        .unwrap();
    let bob_leave = wf
        .create(&BOB, None, leave(UNPAID, date(2025, 12, 2), date(2025, 12, 2)))
        .await
        .unwrap();
    wf.submit(&BOB, RequestKind::Leave, bob_leave.id).await.unwrap();
    let manager_leave = wf
        .create(&MANAGER, None, leave(UNPAID, date(2025, 12, 3), date(2025, 12, 3)))
        .await
        .unwrap();
    wf.submit(&MANAGER, RequestKind::Leave, manager_leave.id).await.unwrap();

    let ids = |requests: Vec<crate::model::request::Request>| {
        let mut ids: Vec<u64> = requests.iter().map(|r| r.id).collect();
        ids.sort_unstable();
        ids
    };

    // employees see their own, whatever the status
    assert_eq!(ids(wf.list(&ALICE, RequestKind::Leave, None).await.unwrap()), vec![alice_draft.id]);
    assert!(wf.list(&ALICE, RequestKind::Leave, Some("submitted")).await.unwrap().is_empty());

    // the manager queue holds other people's submitted leave
    assert_eq!(ids(wf.list(&MANAGER, RequestKind::Leave, None).await.unwrap()), vec![bob_leave.id]);
    // the admin queue includes the manager's own request
    assert_eq!(
        ids(wf.list(&ADMIN, RequestKind::Leave, None).await.unwrap()),
        vec![bob_leave.id, manager_leave.id]
    );

    // "all" widens to own plus managed, drafts included
    assert_eq!(
        ids(wf.list(&MANAGER, RequestKind::Leave, Some("all")).await.unwrap()),
        vec![alice_draft.id, bob_leave.id, manager_leave.id]
    );
    assert!(wf.list(&ADMIN, RequestKind::Leave, Some("all")).await.unwrap().is_empty());

    let err = wf.list(&ALICE, RequestKind::Leave, Some("pending")).await.unwrap_err();
    assert!(matches!(err, WorkflowError::Validation(_)));
}

#[actix_web::test]
async fn balances_follow_the_view_rules() {
    let wf = engine(seeded_store(), Arc::new(RecordingSink::default()));

    let own = wf.leave_balances(&ALICE, None, 2025).await.unwrap();
    assert_eq!(own.len(), 1);
    assert_eq!(own[0].balance, 5);

    assert!(wf.leave_balances(&MANAGER, Some(3), 2025).await.is_ok());
    assert!(matches!(
        wf.leave_balances(&BOB, Some(3), 2025).await.unwrap_err(),
        WorkflowError::Forbidden(_)
    ));
    assert!(matches!(
        wf.leave_balances(&MANAGER, Some(5), 2025).await.unwrap_err(),
        WorkflowError::Forbidden(_)
    ));
}

#[actix_web::test]
async fn only_admins_adjust_and_add_holidays() {
    let wf = engine(seeded_store(), Arc::new(RecordingSink::default()));

    assert!(matches!(
        wf.adjust_balance(&MANAGER, 3, ANNUAL, 2, 2025).await.unwrap_err(),
        WorkflowError::Forbidden(_)
    ));
    assert_eq!(wf.adjust_balance(&ADMIN, 3, ANNUAL, 2, 2025).await.unwrap(), 7);
    assert_eq!(
        wf.adjust_balance(&ADMIN, 3, 42, 2, 2025).await.unwrap_err(),
        WorkflowError::NotFound("Leave type not found".into())
    );

    assert!(matches!(
        wf.add_holiday(&ALICE, "Day off", date(2025, 12, 2), false).await.unwrap_err(),
        WorkflowError::Forbidden(_)
    ));
}

#[actix_web::test]
async fn adding_a_holiday_shortens_later_leave() {
    let wf = engine(seeded_store(), Arc::new(RecordingSink::default()));

    assert_eq!(wf.working_days(date(2025, 12, 1), date(2025, 12, 5)).await.unwrap(), 5);
    wf.add_holiday(&ADMIN, "Founders day", date(2025, 12, 3), false).await.unwrap();
    assert_eq!(wf.working_days(date(2025, 12, 1), date(2025, 12, 5)).await.unwrap(), 4);

    // five calendar weekdays now cost four days, within the cap and balance
    let draft = wf
        .create(&ALICE, None, leave(ANNUAL, date(2025, 12, 1), date(2025, 12, 5)))
        .await
        .unwrap();
    assert_eq!(draft.status, RequestStatus::Draft);

    assert!(matches!(
        wf.working_days(date(2025, 12, 5), date(2025, 12, 1)).await.unwrap_err(),
        WorkflowError::Validation(_)
    ));
}

#[actix_web::test]
async fn oversized_leave_ranges_are_rejected_before_counting() {
    let wf = engine(seeded_store(), Arc::new(RecordingSink::default()));

    // neither a capped nor an untracked type gets as far as the calendar
    for leave_type in [ANNUAL, UNPAID] {
        let err = wf
            .create(&ALICE, None, leave(leave_type, date(-100000, 1, 1), date(100000, 12, 31)))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(m) if m.contains("exceeds the maximum")));
    }

    let draft = wf
        .create(&ALICE, None, leave(UNPAID, date(2025, 12, 1), date(2025, 12, 2)))
        .await
        .unwrap();
    let err = wf
        .update(
            &ALICE,
            RequestKind::Leave,
            draft.id,
            RequestPatch::Leave(LeavePatch {
                end_date: Some(date(2040, 12, 31)),
                ..Default::default()
            }),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Validation(_)));

    let err = wf.working_days(date(2000, 1, 1), date(2030, 1, 1)).await.unwrap_err();
    assert!(matches!(err, WorkflowError::Validation(_)));
}
