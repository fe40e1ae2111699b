pub mod banner;
pub mod check;
pub mod client;
pub mod config;
pub mod convert;
pub mod curie;
pub mod errors;
pub mod github;
pub mod nameres;
pub mod nodenorm;
pub mod result;
pub mod row;
pub mod runner;
pub mod sources;

pub use check::{Check, Endpoints, Service, Test};
pub use convert::row_to_tests;
pub use result::{ResultKind, TestResult};
pub use row::Row;
