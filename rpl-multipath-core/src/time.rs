use logos::{Lexer, Logos};
use std::{fmt, str::FromStr, time::Duration};
use thiserror::Error;

/// The period of the congestion detection timer.
///
/// The interval is a power-of-two number of seconds, `2^exponent` with
/// the exponent at most [`MAX_EXPONENT`](Self::MAX_EXPONENT). Parsing and
/// [`DetectionInterval::new`] accept any [`Duration`]; anything else is
/// refused by [`MultipathConfig::validate`].
///
/// [`MultipathConfig::validate`]: crate::MultipathConfig::validate
///
/// ```
/// # use rpl_multipath_core::DetectionInterval;
/// # use std::time::Duration;
/// let interval = DetectionInterval::from_exponent(5).unwrap();
/// assert_eq!(interval.into_duration(), Duration::from_secs(32));
/// assert_eq!(interval.to_string(), "32s");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DetectionInterval(Duration);

/// Error returned when a [`DetectionInterval`] cannot be built or parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntervalError {
    #[error("detection interval exponent {exponent} is above the maximum of {max}")]
    ExponentTooLarge { exponent: u8, max: u8 },
    #[error("Failed to parse: {input}")]
    Lexer { input: String },
    #[error("Expecting interval to start with a number, cannot parse {input}")]
    ExpectedNumber { input: String },
    #[error("Expecting a measure, failed to parse: {input}")]
    ExpectedMeasure { input: String },
    #[error("number out of range in {input}")]
    Overflow { input: String },
}

impl DetectionInterval {
    /// Largest accepted exponent: `2^15` seconds is a little over 9 hours.
    pub const MAX_EXPONENT: u8 = 15;

    pub const fn new(duration: Duration) -> Self {
        Self(duration)
    }

    /// `2^exponent` seconds.
    pub fn from_exponent(exponent: u8) -> Result<Self, IntervalError> {
        if exponent > Self::MAX_EXPONENT {
            return Err(IntervalError::ExponentTooLarge {
                exponent,
                max: Self::MAX_EXPONENT,
            });
        }
        Ok(Self(Duration::from_secs(1 << exponent)))
    }

    #[inline]
    pub fn into_duration(self) -> Duration {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// The `n` such that the interval is `2^n` seconds, if there is one
    /// within [`MAX_EXPONENT`](Self::MAX_EXPONENT).
    ///
    /// ```
    /// # use rpl_multipath_core::DetectionInterval;
    /// # use std::time::Duration;
    /// assert_eq!("32s".parse::<DetectionInterval>().unwrap().exponent(), Some(5));
    /// assert_eq!("1500ms".parse::<DetectionInterval>().unwrap().exponent(), None);
    /// assert_eq!(DetectionInterval::new(Duration::from_secs(1 << 20)).exponent(), None);
    /// ```
    pub fn exponent(&self) -> Option<u8> {
        if self.0.subsec_nanos() != 0 {
            return None;
        }
        let secs = self.0.as_secs();
        if !secs.is_power_of_two() {
            return None;
        }
        let exponent = u8::try_from(secs.trailing_zeros()).ok()?;
        (exponent <= Self::MAX_EXPONENT).then_some(exponent)
    }
}

impl Default for DetectionInterval {
    fn default() -> Self {
        crate::defaults::DEFAULT_DETECTION_INTERVAL
    }
}

impl From<DetectionInterval> for Duration {
    fn from(value: DetectionInterval) -> Self {
        value.into_duration()
    }
}

impl From<Duration> for DetectionInterval {
    fn from(value: Duration) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for DetectionInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        <Duration as fmt::Debug>::fmt(&self.0, f)
    }
}

impl FromStr for DetectionInterval {
    type Err = IntervalError;

    /// Parses a sum of measures such as `"32s"`, `"1m 4s"` or `"500ms"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut lex = Lexer::new(s);

        let mut total = Duration::ZERO;

        while let Some(next) = lex.next() {
            let number: Token = next.map_err(|()| IntervalError::Lexer {
                input: s.to_owned(),
            })?;

            if number != Token::Value {
                return Err(IntervalError::ExpectedNumber {
                    input: s.to_owned(),
                });
            }
            let number: u64 = lex.slice().parse().map_err(|_| IntervalError::Overflow {
                input: s.to_owned(),
            })?;

            let Some(Ok(measure)) = lex.next() else {
                return Err(IntervalError::ExpectedMeasure {
                    input: s.to_owned(),
                });
            };
            let duration = match measure {
                Token::MilliSeconds => Duration::from_millis(number),
                Token::Seconds => Duration::from_secs(number),
                Token::Minutes => number
                    .checked_mul(60)
                    .map(Duration::from_secs)
                    .ok_or_else(|| IntervalError::Overflow {
                        input: s.to_owned(),
                    })?,
                Token::Value => {
                    return Err(IntervalError::ExpectedMeasure {
                        input: s.to_owned(),
                    });
                }
            };
            total = total
                .checked_add(duration)
                .ok_or_else(|| IntervalError::Overflow {
                    input: s.to_owned(),
                })?;
        }

        Ok(Self(total))
    }
}

#[derive(Logos, Debug, PartialEq)]
#[logos(skip r"[ \t\n\f]+")]
enum Token {
    #[token("ms")]
    MilliSeconds,
    #[token("s")]
    Seconds,
    #[token("m")]
    Minutes,

    #[regex("[0-9]+")]
    Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logos_lexer() {
        let mut lex = Token::lexer("32s");

        assert_eq!(lex.next(), Some(Ok(Token::Value)));
        assert_eq!(lex.span(), 0..2);
        assert_eq!(lex.slice(), "32");

        assert_eq!(lex.next(), Some(Ok(Token::Seconds)));
        assert_eq!(lex.span(), 2..3);
    }

    #[test]
    fn parse() {
        let DetectionInterval(duration) = "32s".parse().unwrap();
        assert_eq!(duration.as_secs(), 32);

        let DetectionInterval(duration) = "1m 4s 1000ms".parse().unwrap();
        assert_eq!(duration.as_secs(), 65);
    }

    #[test]
    fn parse_missing_measure() {
        assert!(matches!(
            "32".parse::<DetectionInterval>(),
            Err(IntervalError::ExpectedMeasure { .. })
        ));
    }

    #[test]
    fn parse_starting_with_measure() {
        assert!(matches!(
            "s".parse::<DetectionInterval>(),
            Err(IntervalError::ExpectedNumber { .. })
        ));
    }

    #[test]
    fn exponent() {
        assert_eq!(
            DetectionInterval::from_exponent(0).unwrap().into_duration(),
            Duration::from_secs(1)
        );
        assert_eq!(
            DetectionInterval::from_exponent(DetectionInterval::MAX_EXPONENT)
                .unwrap()
                .into_duration(),
            Duration::from_secs(32_768)
        );
        assert!(DetectionInterval::from_exponent(16).is_err());
    }

    #[test]
    fn exponent_of_duration() {
        for exponent in 0..=DetectionInterval::MAX_EXPONENT {
            let interval = DetectionInterval::from_exponent(exponent).unwrap();
            assert_eq!(interval.exponent(), Some(exponent));
        }
        assert_eq!(DetectionInterval::new(Duration::ZERO).exponent(), None);
        assert_eq!(DetectionInterval::new(Duration::from_secs(48)).exponent(), None);
        assert_eq!(
            DetectionInterval::new(Duration::from_secs(1 << 16)).exponent(),
            None
        );
        assert_eq!("1m 4s".parse::<DetectionInterval>().unwrap().exponent(), Some(6));
    }

    #[test]
    fn display() {
        assert_eq!(
            DetectionInterval::new(Duration::from_millis(1500)).to_string(),
            "1.5s"
        );
    }
}
