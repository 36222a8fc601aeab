use std::{error::Error, fmt::Display, num::ParseIntError, ops::RangeInclusive, str::FromStr};

use serde::{Deserialize, Serialize};

/// An inclusive range of tag lengths, denoted (min)-(max) or (length)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LengthRange {
    pub min: usize,
    pub max: usize,
}

impl LengthRange {
    pub fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }
}

impl Default for LengthRange {
    fn default() -> Self {
        Self { min: 4, max: 10 }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LengthRangeParseError {
    MalformedMin(ParseIntError),
    MalformedMax(ParseIntError),
    Empty,
}

impl Display for LengthRangeParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LengthRangeParseError::MalformedMin(e) => {
                write!(f, "Failed to parse length range minimum {e}")
            }
            LengthRangeParseError::MalformedMax(e) => {
                write!(f, "Failed to parse length range maximum {e}")
            }
            LengthRangeParseError::Empty => write!(f, "An empty length range was given"),
        }
    }
}

impl Error for LengthRangeParseError {}

impl FromStr for LengthRange {
    type Err = LengthRangeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(LengthRangeParseError::Empty);
        }
        let (min_s, max_s) = if let Some((min_s, max_s)) = s.split_once('-') {
            (min_s.trim(), max_s.trim())
        } else if let Some((min_s, max_s)) = s.split_once(':') {
            (min_s.trim(), max_s.trim())
        } else {
            (s, s)
        };
        let min = min_s
            .parse()
            .map_err(LengthRangeParseError::MalformedMin)?;
        let max = max_s
            .parse()
            .map_err(LengthRangeParseError::MalformedMax)?;
        Ok(Self::new(min, max))
    }
}

impl Display for LengthRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

impl TryFrom<String> for LengthRange {
    type Error = LengthRangeParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<LengthRange> for String {
    fn from(value: LengthRange) -> Self {
        value.to_string()
    }
}

impl From<RangeInclusive<usize>> for LengthRange {
    fn from(value: RangeInclusive<usize>) -> Self {
        Self::new(*value.start(), *value.end())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_length_fromstr() -> Result<(), LengthRangeParseError> {
        let r: LengthRange = "4-10".parse()?;
        assert_eq!(r, LengthRange::new(4, 10));

        let r: LengthRange = "5:7".parse()?;
        assert_eq!(r, LengthRange::new(5, 7));

        let r: LengthRange = "6".parse()?;
        assert_eq!(r, LengthRange::new(6, 6));

        // Inverted ranges parse, the tagger parameters reject them
        let r: LengthRange = "10-4".parse()?;
        assert_eq!(r, (10..=4).into());
        assert_eq!(r.to_string(), "10-4");
        Ok(())
    }

    #[test]
    fn test_length_fromstr_malformed() {
        assert!(matches!(
            "a-5".parse::<LengthRange>(),
            Err(LengthRangeParseError::MalformedMin(_))
        ));
        let err = "4-".parse::<LengthRange>().unwrap_err();
        assert!(err
            .to_string()
            .starts_with("Failed to parse length range maximum"));
        assert_eq!("".parse::<LengthRange>(), Err(LengthRangeParseError::Empty));
    }
}
