use crate::api::holidays::CreateHoliday;
use crate::api::leave::{AdjustBalance, AdjustedBalance, InitializeBalances, WorkingDays};
use crate::api::requests::{
    CreateExpense, CreateLeave, CreatePayload, CreateTimesheet, RejectBody, UpdatePayload,
};
use crate::model::{
    holiday::Holiday,
    leave_balance::LeaveBalance,
    leave_type::LeaveType,
    request::{ExpenseDetails, LeaveDetails, RequestStatus, TimesheetDetails},
    role::Role,
};
use crate::workflow::ledger::{InitOutcome, InitStatus, UserInitOutcome};
use crate::workflow::lifecycle::{ExpensePatch, LeavePatch, TimesheetPatch};
use utoipa::Modify;
use utoipa::OpenApi;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Approval Workflow API",
        version = "1.0.0",
        description = r#"
## Timesheet, expense and leave approvals

Every request moves through the same lifecycle:
`draft` → `submitted` → `approved` | `rejected`.

- Employees create, edit and submit their own requests
- Managers act for themselves and their team, and decide on submitted requests
- Admins act on other users' requests and decide on any submitted request

Approving a leave debits the working days it covers from the owner's balance
for that leave type and year. Weekends and holidays are not counted.

### Security
All endpoints require a **JWT Bearer** token carrying `user_id` and `role`.

Collections are addressed as `/api/{kind}` where `kind` is `timesheets`,
`expenses` or `leaves`.
"#,
    ),
    paths(
        crate::api::requests::create_request,
        crate::api::requests::list_requests,
        crate::api::requests::get_request,
        crate::api::requests::update_request,
        crate::api::requests::delete_request,
        crate::api::requests::submit_request,
        crate::api::requests::approve_request,
        crate::api::requests::reject_request,

        crate::api::leave::list_leave_types,
        crate::api::leave::list_balances,
        crate::api::leave::adjust_balance,
        crate::api::leave::initialize_balances,
        crate::api::leave::working_days,

        crate::api::holidays::list_holidays,
        crate::api::holidays::create_holiday
    ),
    components(
        schemas(
            CreatePayload,
            CreateTimesheet,
            CreateExpense,
            CreateLeave,
            UpdatePayload,
            TimesheetPatch,
            ExpensePatch,
            LeavePatch,
            RejectBody,
            TimesheetDetails,
            ExpenseDetails,
            LeaveDetails,
            RequestStatus,
            Role,
            LeaveType,
            LeaveBalance,
            AdjustBalance,
            AdjustedBalance,
            InitializeBalances,
            InitStatus,
            InitOutcome,
            UserInitOutcome,
            WorkingDays,
            Holiday,
            CreateHoliday
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Requests", description = "Timesheet, expense and leave lifecycle"),
        (name = "Leave", description = "Leave types, balances and working days"),
        (name = "Holidays", description = "Holiday calendar"),
    )
)]
pub struct ApiDoc;
