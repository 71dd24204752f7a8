//! Application services layer: ports, rendering, pagination and jobs.

pub mod comments;
pub mod error;
pub mod excerpt;
pub mod jobs;
pub mod pagination;
pub mod render;
pub mod repos;
