pub mod viewer;

pub use viewer::{Actor, ViewerContext};
