pub mod approval;
pub mod audit;
pub mod membership;
pub mod recovery;
pub mod user;
