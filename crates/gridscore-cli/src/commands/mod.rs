pub mod check;
pub mod schedule;
