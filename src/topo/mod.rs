//! 拓扑构建模块

pub mod dumbbell;

pub use dumbbell::{build_dumbbell, DumbbellOpts};
