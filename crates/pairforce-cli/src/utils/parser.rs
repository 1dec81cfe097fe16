use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid --set format: '{0}'. Expected KEY=VALUE.")]
    MissingEquals(String),

    #[error("Key cannot be empty in '{0}'.")]
    EmptyKey(String),

    #[error("Invalid {expected} value for {key}: '{value}'")]
    InvalidValue {
        key: String,
        value: String,
        expected: &'static str,
    },
}

/// Splits `KEY=VALUE` at the first `=`, trimming whitespace around both halves.
pub fn parse_key_value(pair: &str) -> Result<(&str, &str), ParseError> {
    let (key, value) = pair
        .split_once('=')
        .ok_or_else(|| ParseError::MissingEquals(pair.to_string()))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(ParseError::EmptyKey(pair.to_string()));
    }
    Ok((key, value.trim()))
}

pub fn parse_f64(key: &str, value: &str) -> Result<f64, ParseError> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ParseError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            expected: "float",
        })
}

pub fn parse_bool(key: &str, value: &str) -> Result<bool, ParseError> {
    value.parse::<bool>().map_err(|_| ParseError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        expected: "boolean",
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_value_splits_at_first_equals() {
        assert_eq!(parse_key_value("a=b=c"), Ok(("a", "b=c")));
        assert_eq!(parse_key_value(" scale = 0.5 "), Ok(("scale", "0.5")));
    }

    #[test]
    fn key_value_requires_equals_and_key() {
        assert_eq!(
            parse_key_value("scale"),
            Err(ParseError::MissingEquals("scale".to_string()))
        );
        assert_eq!(
            parse_key_value("=1"),
            Err(ParseError::EmptyKey("=1".to_string()))
        );
    }

    #[test]
    fn floats_must_be_finite() {
        assert_eq!(parse_f64("k", "1e-3"), Ok(1e-3));
        assert!(parse_f64("k", "inf").is_err());
        assert!(parse_f64("k", "abc").is_err());
    }

    #[test]
    fn booleans_parse_true_and_false() {
        assert_eq!(parse_bool("flag", "true"), Ok(true));
        assert!(matches!(
            parse_bool("flag", "yes"),
            Err(ParseError::InvalidValue {
                expected: "boolean",
                ..
            })
        ));
    }
}
