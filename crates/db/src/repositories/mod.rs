//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod drawing_repo;
pub mod entity_repo;

pub use drawing_repo::DrawingRepo;
pub use entity_repo::LinkedEntityRepo;
