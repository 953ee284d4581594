pub mod approval;
pub mod drawing;
pub mod entity;
