//! GPX format driver: hierarchical COPY import of GPS exchange files into
//! up to six related tables (waypoints, routes and their points, tracks
//! with their segments and points).

pub mod driver;
mod parser;
pub mod tables;

pub use driver::GpxDriver;
