//! Deterministic answers that never need a provider round trip.

use chrono::{DateTime, Local};

/// Answer a date or time question directly from the server clock.
///
/// Recognition is keyword co-occurrence over the lowercased text; the two
/// intents are disjoint and date wins when both match. `None` hands control
/// to the next pipeline stage.
pub fn resolve_local_fact(text: &str, now: DateTime<Local>) -> Option<String> {
    let lowered = text.to_lowercase();

    let asks_date =
        lowered.contains("date") && (lowered.contains("today") || lowered.contains("current"));
    if asks_date {
        return Some(format!("Today's date is {}.", now.format("%B %d, %Y")));
    }

    let asks_time =
        lowered.contains("time") && (lowered.contains("now") || lowered.contains("current"));
    if asks_time {
        return Some(format!("The current time is {}.", now.format("%I:%M %p")));
    }

    None
}

#[cfg(test)]
mod tests {
    use chrono::{Local, TimeZone};

    use super::resolve_local_fact;

    fn fixed_now() -> chrono::DateTime<Local> {
        Local.with_ymd_and_hms(2025, 6, 5, 14, 30, 0).unwrap()
    }

    #[test]
    fn answers_todays_date() {
        let reply = resolve_local_fact("what's today's date", fixed_now());
        assert_eq!(reply.as_deref(), Some("Today's date is June 05, 2025."));
    }

    #[test]
    fn answers_current_date_variant() {
        let reply = resolve_local_fact("Current DATE please", fixed_now());
        assert_eq!(reply.as_deref(), Some("Today's date is June 05, 2025."));
    }

    #[test]
    fn answers_current_time() {
        let reply = resolve_local_fact("what time is it now?", fixed_now());
        assert_eq!(reply.as_deref(), Some("The current time is 02:30 PM."));
    }

    #[test]
    fn requires_keyword_co_occurrence() {
        assert_eq!(resolve_local_fact("let's set a date for lunch", fixed_now()), None);
        assert_eq!(resolve_local_fact("time flies", fixed_now()), None);
        assert_eq!(resolve_local_fact("what is the leave policy", fixed_now()), None);
    }
}
