use crate::Category;

/// One agent lifecycle event read from the signal file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentEvent {
    /// Unix timestamp in milliseconds, as written by the hook
    pub occurred_at: i64,
    pub category: Category,
}

/// Parse a signal record of the form `"<epoch-ms> <category>"`.
///
/// Surrounding whitespace is ignored. The record is split on the first space
/// only, so anything after it must be exactly a category token.
pub fn parse_event_line(content: &str) -> Option<AgentEvent> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return None;
    }

    let (timestamp, category) = trimmed.split_once(' ')?;
    let occurred_at = timestamp.parse::<i64>().ok()?;
    let category = category.parse::<Category>().ok()?;

    Some(AgentEvent {
        occurred_at,
        category,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_valid_record() {
        assert_eq!(
            parse_event_line("1707834567890 complete"),
            Some(AgentEvent {
                occurred_at: 1707834567890,
                category: Category::Complete,
            })
        );
    }

    #[test]
    fn test_parses_every_category() {
        for category in Category::ALL {
            let event = parse_event_line(&format!("1000000000000 {category}"))
                .unwrap_or_else(|| panic!("should parse {category}"));
            assert_eq!(event.category, category);
            assert_eq!(event.occurred_at, 1000000000000);
        }
    }

    #[test]
    fn test_ignores_surrounding_whitespace() {
        let expected = Some(AgentEvent {
            occurred_at: 1707834567890,
            category: Category::Complete,
        });
        assert_eq!(parse_event_line("1707834567890 complete\n"), expected);
        assert_eq!(parse_event_line("  1707834567890 complete \r\n"), expected);
    }

    #[test]
    fn test_rejects_empty_and_whitespace() {
        assert_eq!(parse_event_line(""), None);
        assert_eq!(parse_event_line("  "), None);
        assert_eq!(parse_event_line("\n"), None);
    }

    #[test]
    fn test_rejects_missing_separator() {
        assert_eq!(parse_event_line("1707834567890complete"), None);
        assert_eq!(parse_event_line("complete"), None);
        assert_eq!(parse_event_line("1707834567890"), None);
    }

    #[test]
    fn test_rejects_non_numeric_timestamp() {
        assert_eq!(parse_event_line("abc complete"), None);
        assert_eq!(parse_event_line("12abc complete"), None);
        assert_eq!(parse_event_line("1.5 complete"), None);
    }

    #[test]
    fn test_rejects_unknown_category() {
        assert_eq!(parse_event_line("1000 unknown"), None);
        assert_eq!(parse_event_line("1000 COMPLETE"), None);
        assert_eq!(parse_event_line("1000  complete"), None);
        assert_eq!(parse_event_line("1000 complete extra"), None);
    }
}
