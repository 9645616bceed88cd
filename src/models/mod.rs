pub mod diagnostics;
pub mod flags;
pub mod span;
pub mod token;
pub mod transcript;
pub mod unit;

pub use diagnostics::*;
pub use flags::*;
pub use span::*;
pub use token::*;
pub use transcript::*;
pub use unit::*;
