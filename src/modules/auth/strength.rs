use zxcvbn::zxcvbn;

/// Highest score a strength checker may report
pub const MAX_SCORE: u8 = 4;

/// Outcome of measuring a candidate password
#[derive(Debug, Clone, PartialEq)]
pub struct Strength {
    pub score: u8, // 0 (trivially guessable) ..= 4 (very unguessable)
    pub feedback: Vec<String>,
}

/// Estimates how guessable a password is on a 0..=4 scale
pub trait StrengthChecker: Send + Sync {
    fn measure(&self, password: &str) -> Strength;
}

/// Checker backed by zxcvbn's pattern matching and guess estimation
#[derive(Debug, Default, Clone)]
pub struct ZxcvbnStrengthChecker;

impl ZxcvbnStrengthChecker {
    pub fn new() -> Self {
        Self
    }
}

impl StrengthChecker for ZxcvbnStrengthChecker {
    fn measure(&self, password: &str) -> Strength {
        let entropy = match zxcvbn(password, &[]) {
            Ok(entropy) => entropy,
            // zxcvbn refuses blank passwords
            Err(e) => {
                return Strength {
                    score: 0,
                    feedback: vec![e.to_string()],
                }
            }
        };

        let mut feedback = Vec::new();
        if let Some(hints) = entropy.feedback() {
            if let Some(warning) = hints.warning() {
                feedback.push(warning.to_string());
            }
            feedback.extend(hints.suggestions().iter().map(|s| s.to_string()));
        }

        Strength {
            score: entropy.score().min(MAX_SCORE),
            feedback,
        }
    }
}
