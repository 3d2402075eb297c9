pub mod humanize;
pub use humanize::mem2str;

pub mod statistics;
pub use statistics::{mean, stddev};
