pub mod holidays;
pub mod leave;
pub mod requests;
