pub mod criteria;
pub mod filters;
pub mod intent;
pub mod vehicle;
