//! Model definitions

pub mod lstm;

pub use lstm::{PointsNet, PointsNetConfig};
