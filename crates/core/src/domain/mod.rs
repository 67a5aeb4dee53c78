pub mod contract;
pub mod genre;
pub mod movie;
