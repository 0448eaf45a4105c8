pub mod constants;
pub mod context;
pub mod math;
pub mod meta;
pub mod playstyle;
pub mod rating;
pub mod structures;
