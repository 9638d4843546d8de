//! Schedule evaluation for scheduled triggers.

use argus_core::Trigger;
use argus_core::enums::Frequency;
use chrono::{DateTime, Duration, Utc};

/// Length of one schedule period. Months count as 30 days. `None` when the
/// period does not fit in a [`Duration`].
#[must_use]
pub fn period(frequency: Frequency, interval: u32) -> Option<Duration> {
    let interval = i64::from(interval.max(1));
    match frequency {
        Frequency::Minutes => Duration::try_minutes(interval),
        Frequency::Hourly => Duration::try_hours(interval),
        Frequency::Daily => Duration::try_days(interval),
        Frequency::Weekly => Duration::try_weeks(interval),
        Frequency::Monthly => Duration::try_days(interval.checked_mul(30)?),
    }
}

/// When a trigger next fires, given its last run. `None` for triggers that
/// are not scheduled, and for schedules whose next run lies beyond the
/// representable calendar. A scheduled workflow that never ran is due now.
#[must_use]
pub fn next_due(
    trigger: &Trigger,
    last_run: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    let Trigger::Scheduled {
        frequency,
        interval,
    } = trigger
    else {
        return None;
    };
    let Some(last) = last_run else {
        return Some(now);
    };
    let next = period(*frequency, *interval).and_then(|p| last.checked_add_signed(p));
    if next.is_none() {
        tracing::warn!(
            frequency = ?frequency,
            interval,
            "schedule period overflows; workflow will not run again"
        );
    }
    next
}

#[must_use]
pub fn is_due(trigger: &Trigger, last_run: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    next_due(trigger, last_run, now).is_some_and(|due| due <= now)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use rstest::rstest;

    use super::*;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, hour, minute, 0).unwrap()
    }

    fn scheduled(frequency: Frequency, interval: u32) -> Trigger {
        Trigger::Scheduled {
            frequency,
            interval,
        }
    }

    #[rstest]
    #[case(Frequency::Minutes, 15, Duration::minutes(15))]
    #[case(Frequency::Hourly, 2, Duration::hours(2))]
    #[case(Frequency::Daily, 1, Duration::days(1))]
    #[case(Frequency::Weekly, 2, Duration::days(14))]
    #[case(Frequency::Monthly, 1, Duration::days(30))]
    #[case(Frequency::Daily, 0, Duration::days(1))]
    fn periods(#[case] frequency: Frequency, #[case] interval: u32, #[case] expected: Duration) {
        assert_eq!(period(frequency, interval), Some(expected));
    }

    #[test]
    fn oversized_interval_is_never_due_again() {
        let trigger = scheduled(Frequency::Daily, 200_000_000);
        assert!(!is_due(&trigger, Some(at(9, 0)), at(9, 0)));
        assert!(next_due(&trigger, Some(at(9, 0)), at(9, 0)).is_none());
        // Never run: still due once.
        assert!(is_due(&trigger, None, at(9, 0)));
        assert!(period(Frequency::Monthly, u32::MAX).is_none());
    }

    #[test]
    fn never_run_is_due() {
        assert!(is_due(&scheduled(Frequency::Weekly, 1), None, at(9, 0)));
    }

    #[test]
    fn due_after_one_period() {
        let trigger = scheduled(Frequency::Hourly, 1);
        assert!(!is_due(&trigger, Some(at(9, 0)), at(9, 59)));
        assert!(is_due(&trigger, Some(at(9, 0)), at(10, 0)));
        assert_eq!(next_due(&trigger, Some(at(9, 0)), at(9, 30)), Some(at(10, 0)));
    }

    #[test]
    fn manual_and_event_triggers_are_never_due() {
        assert!(!is_due(&Trigger::Manual, None, at(9, 0)));
        let event = Trigger::Event {
            name: "new_case".to_string(),
        };
        assert!(next_due(&event, None, at(9, 0)).is_none());
    }
}
