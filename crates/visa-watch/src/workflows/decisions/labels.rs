use super::domain::DateLabel;
use chrono::{Duration, NaiveDate};

pub const DEFAULT_LOOKBACK_DAYS: u32 = 3;

/// Labels for `today` and the preceding days, most recent first.
pub fn date_labels(today: NaiveDate, lookback_days: u32) -> Vec<DateLabel> {
    (0..i64::from(lookback_days))
        .filter_map(|offset| today.checked_sub_signed(Duration::days(offset)))
        .map(format_label)
        .collect()
}

/// `9 June 2025`: no leading zero on the day, full month name.
pub fn format_label(date: NaiveDate) -> DateLabel {
    DateLabel::new(date.format("%-d %B %Y").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    fn strings(labels: &[DateLabel]) -> Vec<&str> {
        labels.iter().map(DateLabel::as_str).collect()
    }

    #[test]
    fn produces_three_labels_without_leading_zero() {
        let labels = date_labels(date(2025, 6, 9), DEFAULT_LOOKBACK_DAYS);
        assert_eq!(
            strings(&labels),
            vec!["9 June 2025", "8 June 2025", "7 June 2025"]
        );
    }

    #[test]
    fn crosses_month_and_leap_day_boundaries() {
        let labels = date_labels(date(2024, 3, 1), DEFAULT_LOOKBACK_DAYS);
        assert_eq!(
            strings(&labels),
            vec!["1 March 2024", "29 February 2024", "28 February 2024"]
        );
    }

    #[test]
    fn keeps_two_digit_days_intact() {
        let labels = date_labels(date(2025, 1, 11), 2);
        assert_eq!(strings(&labels), vec!["11 January 2025", "10 January 2025"]);
    }

    #[test]
    fn crosses_year_boundary() {
        let labels = date_labels(date(2025, 1, 1), 2);
        assert_eq!(strings(&labels), vec!["1 January 2025", "31 December 2024"]);
    }
}
