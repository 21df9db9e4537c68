// src/common/clock.rs

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc};

/// Relógio de parede do serviço. Todos os "dias" (agenda, calendário, lavagens de hoje)
/// são datas locais neste fuso fixo.
#[derive(Debug, Clone, Copy)]
pub struct LocalClock {
    offset: FixedOffset,
}

/// Janela [00:00:00.000, 23:59:59.999] de um dia local, em UTC para as queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl LocalClock {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn from_offset_minutes(minutes: i32) -> Option<Self> {
        FixedOffset::east_opt(minutes * 60).map(Self::new)
    }

    pub fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    pub fn today(&self) -> NaiveDate {
        self.local_date(self.now())
    }

    pub fn local_date(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.offset).date_naive()
    }

    pub fn local_datetime(&self, at: DateTime<Utc>) -> NaiveDateTime {
        at.with_timezone(&self.offset).naive_local()
    }

    /// Início (meia-noite local) de um dia.
    pub fn start_of_day(&self, day: NaiveDate) -> DateTime<Utc> {
        let midnight = day.and_time(NaiveTime::MIN);
        // Offset fixo: a conversão é sempre única
        self.offset
            .from_local_datetime(&midnight)
            .single()
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
    }

    pub fn day_window(&self, day: NaiveDate) -> DayWindow {
        let start = self.start_of_day(day);
        DayWindow {
            start,
            end: start + Duration::days(1) - Duration::milliseconds(1),
        }
    }

    /// Janela que cobre vários dias locais, do primeiro ao último inclusive.
    pub fn range_window(&self, first: NaiveDate, last: NaiveDate) -> DayWindow {
        DayWindow {
            start: self.day_window(first).start,
            end: self.day_window(last).end,
        }
    }

    /// Hora curta "HH:MM" usada nos registros de lavagem.
    pub fn wash_time(&self, at: DateTime<Utc>) -> String {
        self.local_datetime(at).format("%H:%M").to_string()
    }
}

impl Default for LocalClock {
    fn default() -> Self {
        Self::new(Utc.fix())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_window_uses_local_midnight() {
        let clock = LocalClock::from_offset_minutes(240).unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        let window = clock.day_window(day);

        assert_eq!(window.start, Utc.with_ymd_and_hms(2024, 3, 6, 20, 0, 0).unwrap());
        assert_eq!(
            window.end,
            Utc.with_ymd_and_hms(2024, 3, 7, 19, 59, 59).unwrap() + Duration::milliseconds(999)
        );
    }

    #[test]
    fn late_utc_evening_is_next_local_day() {
        let clock = LocalClock::from_offset_minutes(240).unwrap();
        let at = Utc.with_ymd_and_hms(2024, 3, 6, 21, 30, 0).unwrap();
        assert_eq!(clock.local_date(at), NaiveDate::from_ymd_opt(2024, 3, 7).unwrap());
        assert_eq!(clock.wash_time(at), "01:30");
    }
}
