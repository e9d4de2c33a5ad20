use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, MySql, MySqlPool, Transaction, mysql::MySqlRow};

use crate::model::{
    holiday::Holiday,
    leave_balance::LeaveBalance,
    leave_type::LeaveType,
    request::{
        ExpenseDetails, LeaveDetails, Request, RequestDetails, RequestKind, RequestStatus,
        TimesheetDetails,
    },
    role::Role,
    user::User,
};
use crate::store::{Transition, WorkflowStore};
use crate::workflow::{
    authz::ListScope,
    error::{WorkflowError, WorkflowResult},
};

const TIMESHEET_COLUMNS: &str = "id, user_id, project_id, date, hours, description, \
     status, approver_id, rejection_reason, created_at, updated_at";
const EXPENSE_COLUMNS: &str = "id, user_id, date, amount, description, receipt_ref, \
     status, approver_id, rejection_reason, created_at, updated_at";
const LEAVE_COLUMNS: &str = "id, user_id, leave_type_id, start_date, end_date, reason, applied_at, \
     status, approver_id, rejection_reason, created_at, updated_at";

// Helper enum for typed SQLx binding
enum FilterValue {
    U64(u64),
    Str(String),
}

#[derive(FromRow)]
struct UserRow {
    id: u64,
    username: String,
    role: String,
    manager_id: Option<u64>,
    is_active: bool,
}

impl TryFrom<UserRow> for User {
    type Error = WorkflowError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = Role::from_str(&row.role)
            .map_err(|_| WorkflowError::Internal(format!("user {} has unknown role '{}'", row.id, row.role)))?;
        Ok(User {
            id: row.id,
            username: row.username,
            role,
            manager_id: row.manager_id,
            is_active: row.is_active,
        })
    }
}

#[derive(FromRow)]
struct TimesheetRow {
    id: u64,
    user_id: u64,
    project_id: u64,
    date: NaiveDate,
    hours: f64,
    description: String,
    status: String,
    approver_id: Option<u64>,
    rejection_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct ExpenseRow {
    id: u64,
    user_id: u64,
    date: NaiveDate,
    amount: f64,
    description: String,
    receipt_ref: Option<String>,
    status: String,
    approver_id: Option<u64>,
    rejection_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct LeaveRow {
    id: u64,
    user_id: u64,
    leave_type_id: u64,
    start_date: NaiveDate,
    end_date: NaiveDate,
    reason: String,
    applied_at: Option<DateTime<Utc>>,
    status: String,
    approver_id: Option<u64>,
    rejection_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn parse_status(id: u64, raw: &str) -> WorkflowResult<RequestStatus> {
    RequestStatus::from_str(raw)
        .map_err(|_| WorkflowError::Internal(format!("request {id} has unknown status '{raw}'")))
}

impl TryFrom<TimesheetRow> for Request {
    type Error = WorkflowError;

    fn try_from(row: TimesheetRow) -> Result<Self, Self::Error> {
        Ok(Request {
            id: row.id,
            owner_id: row.user_id,
            status: parse_status(row.id, &row.status)?,
            approver_id: row.approver_id,
            rejection_reason: row.rejection_reason,
            created_at: row.created_at,
            updated_at: row.updated_at,
            details: RequestDetails::Timesheet(TimesheetDetails {
                project_id: row.project_id,
                date: row.date,
                hours: row.hours,
                description: row.description,
            }),
        })
    }
}

impl TryFrom<ExpenseRow> for Request {
    type Error = WorkflowError;

    fn try_from(row: ExpenseRow) -> Result<Self, Self::Error> {
        Ok(Request {
            id: row.id,
            owner_id: row.user_id,
            status: parse_status(row.id, &row.status)?,
            approver_id: row.approver_id,
            rejection_reason: row.rejection_reason,
            created_at: row.created_at,
            updated_at: row.updated_at,
            details: RequestDetails::Expense(ExpenseDetails {
                date: row.date,
                amount: row.amount,
                description: row.description,
                receipt_ref: row.receipt_ref,
            }),
        })
    }
}

impl TryFrom<LeaveRow> for Request {
    type Error = WorkflowError;

    fn try_from(row: LeaveRow) -> Result<Self, Self::Error> {
        Ok(Request {
            id: row.id,
            owner_id: row.user_id,
            status: parse_status(row.id, &row.status)?,
            approver_id: row.approver_id,
            rejection_reason: row.rejection_reason,
            created_at: row.created_at,
            updated_at: row.updated_at,
            details: RequestDetails::Leave(LeaveDetails {
                leave_type_id: row.leave_type_id,
                start_date: row.start_date,
                end_date: row.end_date,
                reason: row.reason,
                applied_at: row.applied_at,
            }),
        })
    }
}

async fn fetch_rows<R>(pool: &MySqlPool, sql: &str, args: &[FilterValue]) -> Result<Vec<R>, sqlx::Error>
where
    R: for<'r> FromRow<'r, MySqlRow> + Send + Unpin,
{
    let mut query = sqlx::query_as::<_, R>(sql);
    for arg in args {
        query = match arg {
            FilterValue::U64(v) => query.bind(*v),
            FilterValue::Str(s) => query.bind(s.clone()),
        };
    }
    query.fetch_all(pool).await
}

fn into_requests<R>(rows: Vec<R>) -> WorkflowResult<Vec<Request>>
where
    Request: TryFrom<R, Error = WorkflowError>,
{
    rows.into_iter().map(Request::try_from).collect()
}

/// Adds `delta` inside an open transaction and returns the new balance
async fn upsert_balance(
    tx: &mut Transaction<'_, MySql>,
    user_id: u64,
    leave_type_id: u64,
    delta: i32,
    year: i32,
) -> Result<i32, sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO leave_balances (user_id, leave_type_id, year, balance)
        VALUES (?, ?, ?, ?)
        ON DUPLICATE KEY UPDATE balance = balance + VALUES(balance)
        "#,
    )
    .bind(user_id)
    .bind(leave_type_id)
    .bind(year)
    .bind(delta)
    .execute(&mut **tx)
    .await?;

    sqlx::query_scalar::<_, i32>(
        "SELECT balance FROM leave_balances WHERE user_id = ? AND leave_type_id = ? AND year = ?",
    )
    .bind(user_id)
    .bind(leave_type_id)
    .bind(year)
    .fetch_one(&mut **tx)
    .await
}

pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn fetch_requests(
        &self,
        kind: RequestKind,
        where_sql: &str,
        args: &[FilterValue],
    ) -> WorkflowResult<Vec<Request>> {
        let columns = match kind {
            RequestKind::Timesheet => TIMESHEET_COLUMNS,
            RequestKind::Expense => EXPENSE_COLUMNS,
            RequestKind::Leave => LEAVE_COLUMNS,
        };
        let sql = format!(
            "SELECT {} FROM {} {} ORDER BY created_at DESC, id DESC",
            columns,
            kind.table(),
            where_sql
        );
        tracing::debug!(sql = %sql, "Fetching requests");

        match kind {
            RequestKind::Timesheet => into_requests(fetch_rows::<TimesheetRow>(&self.pool, &sql, args).await?),
            RequestKind::Expense => into_requests(fetch_rows::<ExpenseRow>(&self.pool, &sql, args).await?),
            RequestKind::Leave => into_requests(fetch_rows::<LeaveRow>(&self.pool, &sql, args).await?),
        }
    }
}

#[async_trait]
impl WorkflowStore for MySqlStore {
    async fn find_user(&self, id: u64) -> WorkflowResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, role, manager_id, is_active FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn managed_user_ids(&self, manager_id: u64) -> WorkflowResult<Vec<u64>> {
        Ok(sqlx::query_scalar::<_, u64>(
            "SELECT id FROM users WHERE manager_id = ? AND is_active = TRUE ORDER BY id",
        )
        .bind(manager_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn active_user_ids(&self) -> WorkflowResult<Vec<u64>> {
        Ok(
            sqlx::query_scalar::<_, u64>("SELECT id FROM users WHERE is_active = TRUE ORDER BY id")
                .fetch_all(&self.pool)
                .await?,
        )
    }

    async fn insert_request(&self, owner_id: u64, details: &RequestDetails) -> WorkflowResult<Request> {
        let now = Utc::now();
        let draft = RequestStatus::Draft.as_str();

        let result = match details {
            RequestDetails::Timesheet(t) => {
                sqlx::query(
                    r#"
                    INSERT INTO timesheets
                        (user_id, project_id, date, hours, description, status, created_at, updated_at)
                    VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(owner_id)
                .bind(t.project_id)
                .bind(t.date)
                .bind(t.hours)
                .bind(&t.description)
                .bind(draft)
                .bind(now)
                .bind(now)
                .execute(&self.pool)
                .await?
            }
            RequestDetails::Expense(e) => {
                sqlx::query(
                    r#"
                    INSERT INTO expenses
                        (user_id, date, amount, description, receipt_ref, status, created_at, updated_at)
                    VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(owner_id)
                .bind(e.date)
                .bind(e.amount)
                .bind(&e.description)
                .bind(&e.receipt_ref)
                .bind(draft)
                .bind(now)
                .bind(now)
                .execute(&self.pool)
                .await?
            }
            RequestDetails::Leave(l) => {
                sqlx::query(
                    r#"
                    INSERT INTO leaves
                        (user_id, leave_type_id, start_date, end_date, reason, status, created_at, updated_at)
                    VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(owner_id)
                .bind(l.leave_type_id)
                .bind(l.start_date)
                .bind(l.end_date)
                .bind(&l.reason)
                .bind(draft)
                .bind(now)
                .bind(now)
                .execute(&self.pool)
                .await?
            }
        };

        let kind = details.kind();
        let id = result.last_insert_id();
        self.find_request(kind, id)
            .await?
            .ok_or_else(|| WorkflowError::Internal(format!("{kind} {id} vanished after insert")))
    }

    async fn find_request(&self, kind: RequestKind, id: u64) -> WorkflowResult<Option<Request>> {
        let mut rows = self
            .fetch_requests(kind, "WHERE id = ?", &[FilterValue::U64(id)])
            .await?;
        Ok(rows.pop())
    }

    async fn update_draft(&self, id: u64, details: &RequestDetails) -> WorkflowResult<bool> {
        let now = Utc::now();
        let draft = RequestStatus::Draft.as_str();

        let result = match details {
            RequestDetails::Timesheet(t) => {
                sqlx::query(
                    r#"
                    UPDATE timesheets
                    SET project_id = ?, date = ?, hours = ?, description = ?, updated_at = ?
                    WHERE id = ? AND status = ?
                    "#,
                )
                .bind(t.project_id)
                .bind(t.date)
                .bind(t.hours)
                .bind(&t.description)
                .bind(now)
                .bind(id)
                .bind(draft)
                .execute(&self.pool)
                .await?
            }
            RequestDetails::Expense(e) => {
                sqlx::query(
                    r#"
                    UPDATE expenses
                    SET date = ?, amount = ?, description = ?, receipt_ref = ?, updated_at = ?
                    WHERE id = ? AND status = ?
                    "#,
                )
                .bind(e.date)
                .bind(e.amount)
                .bind(&e.description)
                .bind(&e.receipt_ref)
                .bind(now)
                .bind(id)
                .bind(draft)
                .execute(&self.pool)
                .await?
            }
            RequestDetails::Leave(l) => {
                sqlx::query(
                    r#"
                    UPDATE leaves
                    SET leave_type_id = ?, start_date = ?, end_date = ?, reason = ?, updated_at = ?
                    WHERE id = ? AND status = ?
                    "#,
                )
                .bind(l.leave_type_id)
                .bind(l.start_date)
                .bind(l.end_date)
                .bind(&l.reason)
                .bind(now)
                .bind(id)
                .bind(draft)
                .execute(&self.pool)
                .await?
            }
        };

        Ok(result.rows_affected() > 0)
    }

    async fn delete_draft(&self, kind: RequestKind, id: u64) -> WorkflowResult<bool> {
        let sql = format!("DELETE FROM {} WHERE id = ? AND status = ?", kind.table());
        let result = sqlx::query(&sql)
            .bind(id)
            .bind(RequestStatus::Draft.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn transition(&self, change: &Transition) -> WorkflowResult<bool> {
        let mut set_clause = vec!["status = ?", "updated_at = ?"];
        if change.decision.is_some() {
            set_clause.push("approver_id = ?");
            set_clause.push("rejection_reason = ?");
        }
        if change.applied_at.is_some() {
            set_clause.push("applied_at = ?");
        }
        let sql = format!(
            "UPDATE {} SET {} WHERE id = ? AND status = ?",
            change.kind.table(),
            set_clause.join(", ")
        );

        let mut tx = self.pool.begin().await?;

        let mut query = sqlx::query(&sql)
            .bind(change.to.as_str())
            .bind(Utc::now());
        if let Some(decision) = &change.decision {
            query = query
                .bind(decision.approver_id)
                .bind(decision.rejection_reason.clone());
        }
        if let Some(applied_at) = change.applied_at {
            query = query.bind(applied_at);
        }
        let result = query
            .bind(change.id)
            .bind(change.from.as_str())
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        if let Some(debit) = change.debit {
            let balance =
                upsert_balance(&mut tx, debit.user_id, debit.leave_type_id, -debit.days, debit.year).await?;
            tracing::debug!(
                user_id = debit.user_id,
                leave_type_id = debit.leave_type_id,
                year = debit.year,
                balance,
                "Leave balance debited"
            );
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn list_requests(&self, kind: RequestKind, scope: &ListScope) -> WorkflowResult<Vec<Request>> {
        let mut where_sql = String::from("WHERE 1=1");
        let mut args: Vec<FilterValue> = Vec::new();

        match scope {
            ListScope::Owners { owner_ids, status } => {
                if owner_ids.is_empty() {
                    return Ok(Vec::new());
                }
                let placeholders = vec!["?"; owner_ids.len()].join(", ");
                where_sql.push_str(&format!(" AND user_id IN ({placeholders})"));
                args.extend(owner_ids.iter().map(|id| FilterValue::U64(*id)));

                if let Some(status) = status {
                    where_sql.push_str(" AND status = ?");
                    args.push(FilterValue::Str(status.to_string()));
                }
            }
            ListScope::AwaitingDecision { exclude_owner } => {
                where_sql.push_str(" AND status = ? AND user_id <> ?");
                args.push(FilterValue::Str(RequestStatus::Submitted.to_string()));
                args.push(FilterValue::U64(*exclude_owner));
            }
        }

        self.fetch_requests(kind, &where_sql, &args).await
    }

    async fn find_leave_type(&self, id: u64) -> WorkflowResult<Option<LeaveType>> {
        Ok(sqlx::query_as::<_, LeaveType>(
            "SELECT id, code, name, max_days, is_active, has_default_balance FROM leave_types WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn active_leave_types(&self) -> WorkflowResult<Vec<LeaveType>> {
        Ok(sqlx::query_as::<_, LeaveType>(
            r#"
            SELECT id, code, name, max_days, is_active, has_default_balance
            FROM leave_types
            WHERE is_active = TRUE
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?)
    }

    async fn find_balance(&self, user_id: u64, leave_type_id: u64, year: i32) -> WorkflowResult<Option<i32>> {
        Ok(sqlx::query_scalar::<_, i32>(
            "SELECT balance FROM leave_balances WHERE user_id = ? AND leave_type_id = ? AND year = ?",
        )
        .bind(user_id)
        .bind(leave_type_id)
        .bind(year)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn balances_for_user(&self, user_id: u64, year: i32) -> WorkflowResult<Vec<LeaveBalance>> {
        Ok(sqlx::query_as::<_, LeaveBalance>(
            r#"
            SELECT user_id, leave_type_id, year, balance
            FROM leave_balances
            WHERE user_id = ? AND year = ?
            ORDER BY leave_type_id
            "#,
        )
        .bind(user_id)
        .bind(year)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn adjust_balance(&self, user_id: u64, leave_type_id: u64, delta: i32, year: i32) -> WorkflowResult<i32> {
        let mut tx = self.pool.begin().await?;
        let balance = upsert_balance(&mut tx, user_id, leave_type_id, delta, year).await?;
        tx.commit().await?;
        Ok(balance)
    }

    async fn insert_balance_if_absent(&self, balance: &LeaveBalance) -> WorkflowResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT IGNORE INTO leave_balances (user_id, leave_type_id, year, balance)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(balance.user_id)
        .bind(balance.leave_type_id)
        .bind(balance.year)
        .bind(balance.balance)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn holidays_for_year(&self, year: i32) -> WorkflowResult<Vec<Holiday>> {
        Ok(sqlx::query_as::<_, Holiday>(
            r#"
            SELECT id, name, date, is_recurring
            FROM holidays
            WHERE is_recurring = TRUE OR YEAR(date) = ?
            "#,
        )
        .bind(year)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn all_holidays(&self) -> WorkflowResult<Vec<Holiday>> {
        Ok(sqlx::query_as::<_, Holiday>(
            "SELECT id, name, date, is_recurring FROM holidays ORDER BY date",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    async fn insert_holiday(&self, name: &str, date: NaiveDate, is_recurring: bool) -> WorkflowResult<Holiday> {
        let result = sqlx::query("INSERT INTO holidays (name, date, is_recurring) VALUES (?, ?, ?)")
            .bind(name)
            .bind(date)
            .bind(is_recurring)
            .execute(&self.pool)
            .await?;

        Ok(Holiday {
            id: result.last_insert_id(),
            name: name.to_string(),
            date,
            is_recurring,
        })
    }
}
