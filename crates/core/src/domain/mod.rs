pub mod budget;
pub mod decision;
pub mod employee;
pub mod expense;
