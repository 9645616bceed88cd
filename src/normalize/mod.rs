pub mod checks;
pub mod lexicon;
pub mod numbers;
pub mod rules;

pub use checks::*;
pub use rules::*;
