//! # Command Scripts
//!
//! Parsing of key scripts used by the headless runner and tests.

use crate::{DelveError, DelveResult, PlayerIntent};

/// Parses a key script into intents.
///
/// Whitespace and commas are ignored so scripts can be grouped for readability.
/// Any other unknown key is an error naming its offset.
///
/// # Examples
///
/// ```
/// use delve::{parse_script, Direction, PlayerIntent};
///
/// let intents = parse_script("dd s, f").unwrap();
/// assert_eq!(intents.len(), 4);
/// assert_eq!(intents[2], PlayerIntent::Step(Direction::South));
/// assert!(parse_script("dx").is_err());
/// ```
pub fn parse_script(script: &str) -> DelveResult<Vec<PlayerIntent>> {
    script
        .chars()
        .enumerate()
        .filter(|(_, key)| !key.is_whitespace() && *key != ',')
        .map(|(offset, key)| {
            PlayerIntent::from_key(key).ok_or_else(|| {
                DelveError::InvalidAction(format!(
                    "unknown key '{}' at offset {} in script",
                    key, offset
                ))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Direction;

    #[test]
    fn test_parse_empty_script() {
        assert!(parse_script("").unwrap().is_empty());
        assert!(parse_script("  \n ").unwrap().is_empty());
    }

    #[test]
    fn test_parse_mixed_keys() {
        let intents = parse_script("wasd hjkl .f").unwrap();
        assert_eq!(intents.len(), 10);
        assert_eq!(intents[0], PlayerIntent::Step(Direction::North));
        assert_eq!(intents[4], PlayerIntent::Step(Direction::West));
        assert_eq!(intents[9], PlayerIntent::Skip);
    }

    #[test]
    fn test_parse_reports_bad_key() {
        match parse_script("dd?") {
            Err(DelveError::InvalidAction(message)) => assert!(message.contains("offset 2")),
            other => panic!("expected InvalidAction, got {:?}", other),
        }
    }
}
