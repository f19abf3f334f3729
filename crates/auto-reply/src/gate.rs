//! Business-hours gate.
//!
//! The `schedules` setting holds one window per weekday. An event arriving
//! outside today's window gets the connection's out-of-hours message instead
//! of automation. No entry for today, a blank window or no message configured
//! means the gate lets everything through.

use std::sync::Arc;

use {
    chrono::{Datelike, Local, Timelike, Utc, Weekday},
    helpline_common::types::{Connection, ScheduleEntry, setting_keys},
    helpline_tickets::Store,
    tracing::warn,
};

use crate::Result;

/// Wall-clock weekday and minute of day in the configured timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalClock {
    pub weekday: Weekday,
    pub minutes: u32,
}

impl LocalClock {
    #[must_use]
    pub fn new(weekday: Weekday, hour: u32, minute: u32) -> Self {
        Self {
            weekday,
            minutes: hour * 60 + minute,
        }
    }

    /// Now in `timezone` (an IANA name, or "local"). Unknown names fall back
    /// to local time.
    #[must_use]
    pub fn now(timezone: &str) -> Self {
        if !timezone.is_empty()
            && timezone != "local"
            && let Ok(tz) = timezone.parse::<chrono_tz::Tz>()
        {
            let dt = Utc::now().with_timezone(&tz);
            return Self::new(dt.weekday(), dt.hour(), dt.minute());
        }
        let dt = Local::now();
        Self::new(dt.weekday(), dt.hour(), dt.minute())
    }
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

/// Whether `now` falls outside the window configured for its weekday.
#[must_use]
pub fn is_out_of_hours(entries: &[ScheduleEntry], now: LocalClock) -> bool {
    let today = weekday_name(now.weekday);
    let Some(entry) = entries
        .iter()
        .find(|e| e.weekday_en.trim().eq_ignore_ascii_case(today))
    else {
        return false;
    };
    let Some((start, end)) = entry.window_minutes() else {
        return false;
    };

    let within = if start <= end {
        now.minutes >= start && now.minutes < end
    } else {
        // Overnight window, e.g. 22:00-06:00.
        now.minutes >= start || now.minutes < end
    };
    !within
}

pub struct BusinessHoursGate {
    store: Arc<dyn Store>,
    timezone: String,
}

impl BusinessHoursGate {
    pub fn new(store: Arc<dyn Store>, timezone: impl Into<String>) -> Self {
        Self {
            store,
            timezone: timezone.into(),
        }
    }

    /// The out-of-hours message to send now, if any.
    pub async fn out_of_hours_message(&self, connection: &Connection) -> Result<Option<String>> {
        self.check_at(connection, LocalClock::now(&self.timezone))
            .await
    }

    pub async fn check_at(
        &self,
        connection: &Connection,
        now: LocalClock,
    ) -> Result<Option<String>> {
        let Some(text) = connection
            .out_of_hours
            .as_deref()
            .filter(|t| !t.trim().is_empty())
        else {
            return Ok(None);
        };
        let Some(raw) = self.store.get_setting(setting_keys::SCHEDULES).await? else {
            return Ok(None);
        };
        let entries: Vec<ScheduleEntry> = match serde_json::from_str(&raw) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "ignoring unreadable schedules setting");
                return Ok(None);
            },
        };
        Ok(is_out_of_hours(&entries, now).then(|| text.to_string()))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        helpline_common::types::Catalog,
        helpline_tickets::{CatalogStore, InMemoryStore},
        rstest::rstest,
    };

    fn entry(day: &str, start: &str, end: &str) -> ScheduleEntry {
        ScheduleEntry {
            weekday_en: day.into(),
            start_time: start.into(),
            end_time: end.into(),
        }
    }

    #[rstest]
    #[case(Weekday::Mon, 7, 59, true)]
    #[case(Weekday::Mon, 8, 0, false)]
    #[case(Weekday::Mon, 17, 59, false)]
    #[case(Weekday::Mon, 18, 0, true)]
    #[case(Weekday::Tue, 3, 0, false)] // no entry for tuesday
    #[case(Weekday::Sat, 23, 0, false)] // overnight window
    #[case(Weekday::Sat, 12, 0, true)]
    #[case(Weekday::Sun, 12, 0, false)] // blank window
    fn windows(#[case] day: Weekday, #[case] h: u32, #[case] m: u32, #[case] out: bool) {
        let entries = vec![
            entry("monday", "08:00", "18:00"),
            entry("Saturday", "22:00", "06:00"),
            entry("sunday", "", ""),
        ];
        assert_eq!(is_out_of_hours(&entries, LocalClock::new(day, h, m)), out);
    }

    #[test]
    fn end_of_day_is_inclusive_of_last_minute() {
        let entries = vec![entry("friday", "09:00", "24:00")];
        assert!(!is_out_of_hours(
            &entries,
            LocalClock::new(Weekday::Fri, 23, 59)
        ));
    }

    async fn gate(schedules: &str) -> BusinessHoursGate {
        let store = Arc::new(InMemoryStore::new());
        store
            .replace_catalog(&Catalog {
                settings: vec![(setting_keys::SCHEDULES.into(), schedules.into())],
                ..Catalog::default()
            })
            .await
            .unwrap();
        BusinessHoursGate::new(store, "local")
    }

    fn connection(out_of_hours: Option<&str>) -> Connection {
        Connection {
            id: 1,
            name: "main".into(),
            out_of_hours: out_of_hours.map(Into::into),
            ..Connection::default()
        }
    }

    #[tokio::test]
    async fn closed_hours_yield_the_message() {
        let gate =
            gate(r#"[{"weekdayEn":"monday","startTime":"08:00","endTime":"18:00"}]"#).await;
        let night = LocalClock::new(Weekday::Mon, 22, 0);
        assert_eq!(
            gate.check_at(&connection(Some("We are closed")), night)
                .await
                .unwrap()
                .as_deref(),
            Some("We are closed")
        );
        assert_eq!(gate.check_at(&connection(None), night).await.unwrap(), None);
    }

    #[tokio::test]
    async fn unreadable_schedules_let_events_through() {
        let gate = gate("not json").await;
        let night = LocalClock::new(Weekday::Mon, 22, 0);
        assert_eq!(
            gate.check_at(&connection(Some("closed")), night)
                .await
                .unwrap(),
            None
        );
    }

    #[test]
    fn unknown_timezone_falls_back_to_local() {
        let _ = LocalClock::now("Mars/Olympus_Mons");
        let clock = LocalClock::now("America/Sao_Paulo");
        assert!(clock.minutes < 24 * 60);
    }
}
