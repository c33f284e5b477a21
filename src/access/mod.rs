//! Role- and local-time-windowed access evaluation.
//!
//! The evaluator is a pure decision function over (principal, action class,
//! optional target task, current time). Rules are independent predicates
//! evaluated in a fixed, documented order with first-match-wins semantics;
//! see [`AccessEvaluator`].

mod evaluator;
pub(crate) mod rules;

pub use evaluator::{AccessDenied, AccessEvaluator, ActionClass, BusinessHours};
