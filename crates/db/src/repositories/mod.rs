//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async query methods
//! that accept an executor (`&PgPool` or a transaction's connection) as
//! the first argument.

pub mod category_repo;
pub mod entity_repo;
pub mod link_repo;
pub mod video_repo;
pub mod workout_repo;

pub use category_repo::CategoryRepo;
pub use entity_repo::EntityRepo;
pub use link_repo::LinkRepo;
pub use video_repo::VideoRepo;
pub use workout_repo::WorkoutRepo;
