mod lines;

pub use lines::Lines;
