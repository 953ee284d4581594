//! Domain logic for map drawings: geometry normalization, label anchors,
//! privacy filtering, approval state, and the drawing store.

pub mod approval;
pub mod centroid;
pub mod dates;
pub mod drawing;
pub mod entity;
pub mod error;
pub mod geometry;
pub mod privacy;
pub mod roles;
pub mod session;
pub mod store;
pub mod types;
