mod component;
pub mod rows;

pub use component::PlanTables;
