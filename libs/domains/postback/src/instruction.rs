//! `METHOD,TARGET` postback instructions as carried on the topic.

use crate::error::ParseError;
use std::fmt;
use std::str::FromStr;

/// Separates the method from the target
pub const DELIMITER: char = ',';

/// One decoded postback: HTTP method and absolute target URL.
///
/// The method is upper-cased; the target is kept verbatim, commas included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryInstruction {
    pub method: String,
    pub target: String,
}

impl DeliveryInstruction {
    pub fn new(method: impl AsRef<str>, target: impl Into<String>) -> Self {
        Self {
            method: method.as_ref().to_uppercase(),
            target: target.into(),
        }
    }

    /// Split on the first delimiter only.
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        let (method, target) = raw
            .split_once(DELIMITER)
            .ok_or_else(|| ParseError::MissingDelimiter(raw.to_string()))?;

        if method.trim().is_empty() {
            return Err(ParseError::EmptyMethod(raw.to_string()));
        }

        Ok(Self::new(method, target))
    }

    /// Decode a raw queue payload
    pub fn from_payload(payload: &[u8]) -> Result<Self, ParseError> {
        let raw = std::str::from_utf8(payload).map_err(|_| ParseError::InvalidUtf8)?;
        Self::parse(raw)
    }
}

impl FromStr for DeliveryInstruction {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Wire format, `METHOD,TARGET`
impl fmt::Display for DeliveryInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.method, DELIMITER, self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comma_inside_target_is_preserved() {
        let instruction = DeliveryInstruction::parse("GET,http://x/y?a=1,b=2").unwrap();
        assert_eq!(instruction.method, "GET");
        assert_eq!(instruction.target, "http://x/y?a=1,b=2");
    }

    #[test]
    fn test_method_is_upper_cased() {
        let instruction: DeliveryInstruction = "post,http://h/p".parse().unwrap();
        assert_eq!(instruction.method, "POST");
        assert_eq!(instruction.target, "http://h/p");
    }

    #[test]
    fn test_target_is_not_interpreted() {
        let instruction = DeliveryInstruction::parse("get, http://h/p?x=%20,,").unwrap();
        assert_eq!(instruction.target, " http://h/p?x=%20,,");
    }

    #[test]
    fn test_missing_delimiter() {
        assert_eq!(
            DeliveryInstruction::parse("GET http://h/p"),
            Err(ParseError::MissingDelimiter("GET http://h/p".to_string()))
        );
    }

    #[test]
    fn test_empty_method() {
        assert!(matches!(
            DeliveryInstruction::parse(",http://h/p"),
            Err(ParseError::EmptyMethod(_))
        ));
    }

    #[test]
    fn test_from_payload_rejects_invalid_utf8() {
        assert_eq!(
            DeliveryInstruction::from_payload(&[b'G', 0xff, b',']),
            Err(ParseError::InvalidUtf8)
        );
    }

    #[test]
    fn test_display_matches_wire_format() {
        let raw = "POST,http://h/p?a=1,b=2";
        let instruction = DeliveryInstruction::parse(raw).unwrap();
        assert_eq!(instruction.to_string(), raw);
    }
}
