//! Arithmetic CAPTCHA challenges issued to blocked addresses.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// A question/expected-answer pair proving non-automated retry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptchaChallenge {
    /// Question shown to the client.
    pub question: String,
    /// Expected answer, compared verbatim against the answer header.
    pub answer: String,
}

/// Generates a small addition challenge.
#[must_use]
pub fn arithmetic_challenge() -> CaptchaChallenge {
    let mut rng = rand::rng();
    let a: u32 = rng.random_range(1..=9);
    let b: u32 = rng.random_range(1..=9);
    CaptchaChallenge {
        question: format!("What is {a} + {b}?"),
        answer: (a + b).to_string(),
    }
}
