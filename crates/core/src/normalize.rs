//! Raw message text cleanup.
//!
//! Slack delivers mention markup inline (`<@U12345>` or `<@W12345|name>`).
//! The pipeline only cares about the words around those tokens.

/// Strip mention tokens and surrounding whitespace from raw event text.
///
/// An empty result is not an error; it means the message carried nothing
/// actionable and downstream stages short-circuit.
pub fn normalize_text(raw: &str) -> String {
    let mut output = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(start) = rest.find("<@") {
        let (before, tail) = rest.split_at(start);
        output.push_str(before);
        match tail.find('>') {
            Some(end) => rest = &tail[end + 1..],
            None => {
                // Unterminated token; keep the text as-is rather than eat it.
                output.push_str(tail);
                rest = "";
            }
        }
    }
    output.push_str(rest);

    output.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::normalize_text;

    #[test]
    fn strips_mention_tokens_anywhere_in_the_string() {
        assert_eq!(normalize_text("<@U123ABC> what is the leave policy"), "what is the leave policy");
        assert_eq!(normalize_text("hey <@U123ABC> hello"), "hey  hello".trim());
        assert_eq!(normalize_text("tail mention <@W99|ops-bot>"), "tail mention");
    }

    #[test]
    fn trims_whitespace() {
        assert_eq!(normalize_text("   spaced out \n"), "spaced out");
    }

    #[test]
    fn mention_only_message_normalizes_to_empty() {
        assert_eq!(normalize_text("<@U123ABC>"), "");
        assert_eq!(normalize_text("  <@U1> <@U2>  "), "");
    }

    #[test]
    fn unterminated_mention_is_preserved() {
        assert_eq!(normalize_text("broken <@U123"), "broken <@U123");
    }

    #[test]
    fn empty_input_stays_empty() {
        assert_eq!(normalize_text(""), "");
    }
}
