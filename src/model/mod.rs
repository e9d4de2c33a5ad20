pub mod holiday;
pub mod leave_balance;
pub mod leave_type;
pub mod request;
pub mod role;
pub mod user;
