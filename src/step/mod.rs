pub mod action;
pub mod definition;
pub mod expression;
pub mod operator;

pub use action::*;
pub use definition::*;
pub use expression::*;
pub use operator::*;
