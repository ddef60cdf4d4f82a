//! Row structs (`FromRow`) and input DTOs, one module per table family.

pub mod category;
pub mod entity;
pub mod link;
pub mod video;
pub mod workout;
