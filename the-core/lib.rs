pub mod interval;
pub mod wrap;
