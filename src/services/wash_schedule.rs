// src/services/wash_schedule.rs
//
// Regras puras de agenda: dia de rodízio, status do cliente para o lavador
// e o calendário mensal. Nada aqui toca o banco; as datas já chegam no fuso local.

use std::collections::HashSet;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use uuid::Uuid;

use crate::models::{
    auth::WashPattern,
    car::Car,
    wash::{CalendarEntry, WashStatus},
};

// ============================================================================
//  1. DIA DE RODÍZIO
// ============================================================================

/// Data mais recente `<= date` cujo dia da semana pertence ao rodízio (olha até 6 dias para trás).
pub fn last_scheduled_day(pattern: WashPattern, date: NaiveDate) -> Option<NaiveDate> {
    (0..=6)
        .filter_map(|back| date.checked_sub_signed(Duration::days(back)))
        .find(|day| pattern.includes(day.weekday()))
}

// ============================================================================
//  2. STATUS DO CLIENTE (PAINEL DO LAVADOR)
// ============================================================================

/// Decide se uma lavagem pertence ao carro resolvido do cliente.
#[derive(Debug, Clone, Copy)]
pub struct CarMatcher {
    car_id: Uuid,
    single_car: bool,
}

impl CarMatcher {
    pub fn new(car_id: Uuid, owned_cars: usize) -> Self {
        Self {
            car_id,
            single_car: owned_cars == 1,
        }
    }

    /// Lavagem sem carro só conta quando o cliente tem um único carro.
    pub fn matches(&self, record_car: Option<Uuid>) -> bool {
        match record_car {
            Some(id) => id == self.car_id,
            None => self.single_car,
        }
    }
}

/// `washed_days`: dias locais com lavagem do carro. `subscribed_on`: dia em que a
/// assinatura foi criada; dias de rodízio anteriores a ele não contam como perdidos.
///
/// `None` significa que o cliente não precisa aparecer (última lavagem já feita).
pub fn resolve_status(
    pattern: WashPattern,
    today: NaiveDate,
    subscribed_on: NaiveDate,
    washed_days: &HashSet<NaiveDate>,
) -> Option<WashStatus> {
    if washed_days.contains(&today) {
        return Some(WashStatus::Washed);
    }

    let missed = |day: NaiveDate| day >= subscribed_on && !washed_days.contains(&day);

    let last = last_scheduled_day(pattern, today)?;
    if last == today {
        // Uma lavagem perdida no dia de rodízio anterior tem prioridade sobre a de hoje.
        // Devolver `Scheduled` aqui esconderia a pendência até o próximo rodízio.
        let previous = today
            .pred_opt()
            .and_then(|yesterday| last_scheduled_day(pattern, yesterday));
        return match previous {
            Some(day) if missed(day) => Some(WashStatus::Pending),
            _ => Some(WashStatus::Scheduled),
        };
    }

    missed(last).then_some(WashStatus::Pending)
}

// ============================================================================
//  3. CARRO DE UMA LAVAGEM ANTIGA
// ============================================================================

/// Lavagens antigas não guardam o carro: pertencem ao único carro que já existia
/// na hora da lavagem. Com zero ou vários candidatos fica sem carro.
pub fn resolve_record_car(
    record_car: Option<Uuid>,
    washed_at: DateTime<Utc>,
    cars: &[Car],
) -> Option<Uuid> {
    if record_car.is_some() {
        return record_car;
    }
    let mut candidates = cars.iter().filter(|car| car.created_at <= washed_at);
    match (candidates.next(), candidates.next()) {
        (Some(only), None) => Some(only.id),
        _ => None,
    }
}

// ============================================================================
//  4. CALENDÁRIO MENSAL
// ============================================================================

/// Evento que alimenta o calendário. Lavagens e agendamentos concluídos marcam o
/// dia como lavado; um agendamento qualquer só fornece o horário.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionEvent {
    Washed {
        day: NaiveDate,
        wash_time: Option<String>,
    },
    ScheduleCompleted {
        day: NaiveDate,
        start_time: Option<String>,
    },
    ScheduleSlot {
        day: NaiveDate,
        start_time: Option<String>,
    },
}

impl CompletionEvent {
    pub fn day(&self) -> NaiveDate {
        match self {
            CompletionEvent::Washed { day, .. }
            | CompletionEvent::ScheduleCompleted { day, .. }
            | CompletionEvent::ScheduleSlot { day, .. } => *day,
        }
    }

    fn completes(&self) -> bool {
        !matches!(self, CompletionEvent::ScheduleSlot { .. })
    }

    fn slot_time(&self) -> Option<&str> {
        match self {
            CompletionEvent::ScheduleCompleted { start_time, .. }
            | CompletionEvent::ScheduleSlot { start_time, .. } => start_time.as_deref(),
            CompletionEvent::Washed { .. } => None,
        }
    }

    fn wash_time(&self) -> Option<&str> {
        match self {
            CompletionEvent::Washed { wash_time, .. } => wash_time.as_deref(),
            _ => None,
        }
    }
}

/// Mês pedido (0..=11) e ano, já saneados.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthRef {
    pub year: i32,
    pub month0: u32,
}

impl MonthRef {
    /// Mês fora de 0..=11 é limitado; valores não numéricos ou anos inválidos
    /// caem no mês/ano de `today`.
    pub fn parse(month: Option<&str>, year: Option<&str>, today: NaiveDate) -> Self {
        let month0 = month
            .and_then(|m| m.trim().parse::<i64>().ok())
            .map(|m| m.clamp(0, 11) as u32)
            .unwrap_or(today.month0());

        let year = year
            .and_then(|y| y.trim().parse::<i32>().ok())
            .filter(|y| NaiveDate::from_ymd_opt(*y, 1, 1).is_some())
            .unwrap_or(today.year());

        Self { year, month0 }
    }

    pub fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month0 + 1, 1)
    }

    pub fn last_day(&self) -> Option<NaiveDate> {
        let first = self.first_day()?;
        let next = first.checked_add_months(chrono::Months::new(1))?;
        next.pred_opt()
    }
}

#[derive(Debug, Clone)]
pub struct CalendarInput<'a> {
    pub pattern: WashPattern,
    pub month: MonthRef,
    pub today: NaiveDate,
    /// Primeiro dia coberto pela assinatura
    pub active_start: NaiveDate,
    /// Presente apenas quando a assinatura está pausada
    pub hold_boundary: Option<NaiveDate>,
    pub events: &'a [CompletionEvent],
}

pub fn build_month(input: &CalendarInput<'_>) -> Vec<CalendarEntry> {
    let Some(first) = input.month.first_day() else {
        return Vec::new();
    };

    first
        .iter_days()
        .take_while(|day| day.month() == first.month())
        .filter(|day| input.pattern.includes(day.weekday()))
        .filter(|day| *day >= input.active_start)
        .filter(|day| input.hold_boundary.is_none_or(|boundary| *day <= boundary))
        .map(|day| calendar_entry(day, input))
        .collect()
}

fn calendar_entry(day: NaiveDate, input: &CalendarInput<'_>) -> CalendarEntry {
    let events: Vec<&CompletionEvent> = input.events.iter().filter(|e| e.day() == day).collect();

    let status = if events.iter().any(|e| e.completes()) {
        WashStatus::Washed
    } else if day < input.today {
        WashStatus::Pending
    } else {
        WashStatus::Scheduled
    };

    // Horário do agendamento (o último registrado no dia); senão o da lavagem
    let slot_time = events.iter().rev().find_map(|e| e.slot_time());
    let scheduled_time = match (slot_time, status) {
        (Some(time), _) => Some(time.to_string()),
        (None, WashStatus::Washed) => events.iter().find_map(|e| e.wash_time()).map(str::to_string),
        (None, _) => None,
    };

    CalendarEntry {
        date: day.format("%Y-%m-%d").to_string(),
        display_date: day.format("%b %-d").to_string(),
        day_name: day.format("%a").to_string(),
        status,
        scheduled_time,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::car::CarType;
    use chrono::TimeZone;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn days(list: &[NaiveDate]) -> HashSet<NaiveDate> {
        list.iter().copied().collect()
    }

    fn car(created: DateTime<Utc>) -> Car {
        Car {
            id: Uuid::new_v4(),
            client_id: Uuid::nil(),
            make: "Toyota".into(),
            model: "Yaris".into(),
            year: 2021,
            car_type: CarType::Hatchback,
            license_plate: "D 12345".into(),
            color: "White".into(),
            photo: None,
            created_at: created,
        }
    }

    // --- dia de rodízio ---

    #[test]
    fn rotation_day_is_found_within_a_week() {
        // 2024-03-07 é quinta-feira
        let thursday = d(2024, 3, 7);
        assert_eq!(last_scheduled_day(WashPattern::TueThuSat, thursday), Some(thursday));
        assert_eq!(last_scheduled_day(WashPattern::MonWedFri, thursday), Some(d(2024, 3, 6)));
        // domingo olha para o sábado / sexta anteriores
        let sunday = d(2024, 3, 10);
        assert_eq!(last_scheduled_day(WashPattern::TueThuSat, sunday), Some(d(2024, 3, 9)));
        assert_eq!(last_scheduled_day(WashPattern::MonWedFri, sunday), Some(d(2024, 3, 8)));
    }

    // --- status do cliente ---

    #[test]
    fn thursday_wash_resolves_to_washed() {
        let thursday = d(2024, 3, 7);
        let status = resolve_status(WashPattern::TueThuSat, thursday, d(2024, 1, 1), &days(&[thursday]));
        assert_eq!(status, Some(WashStatus::Washed));
    }

    #[test]
    fn thursday_without_tuesday_wash_is_pending() {
        let thursday = d(2024, 3, 7);
        let status = resolve_status(WashPattern::TueThuSat, thursday, d(2024, 1, 1), &days(&[]));
        assert_eq!(status, Some(WashStatus::Pending));
    }

    #[test]
    fn thursday_after_tuesday_wash_is_scheduled() {
        let thursday = d(2024, 3, 7);
        let status = resolve_status(WashPattern::TueThuSat, thursday, d(2024, 1, 1), &days(&[d(2024, 3, 5)]));
        assert_eq!(status, Some(WashStatus::Scheduled));
    }

    #[test]
    fn wednesday_is_pending_only_when_monday_was_missed() {
        let wednesday = d(2024, 3, 6);
        let monday = d(2024, 3, 4);
        let since = d(2024, 1, 1);

        assert_eq!(
            resolve_status(WashPattern::MonWedFri, wednesday, since, &days(&[])),
            Some(WashStatus::Pending)
        );
        assert_eq!(
            resolve_status(WashPattern::MonWedFri, wednesday, since, &days(&[monday])),
            Some(WashStatus::Scheduled)
        );
    }

    #[test]
    fn off_day_omits_clients_already_washed() {
        // sexta para Tue/Thu/Sat: último dia é quinta
        let friday = d(2024, 3, 8);
        let since = d(2024, 1, 1);
        assert_eq!(resolve_status(WashPattern::TueThuSat, friday, since, &days(&[d(2024, 3, 7)])), None);
        assert_eq!(
            resolve_status(WashPattern::TueThuSat, friday, since, &days(&[])),
            Some(WashStatus::Pending)
        );
    }

    #[test]
    fn days_before_subscription_are_not_missed() {
        let thursday = d(2024, 3, 7);
        let status = resolve_status(WashPattern::TueThuSat, thursday, thursday, &days(&[]));
        assert_eq!(status, Some(WashStatus::Scheduled));
    }

    #[test]
    fn unassigned_records_match_only_single_car_clients() {
        let car_id = Uuid::new_v4();
        assert!(CarMatcher::new(car_id, 1).matches(None));
        assert!(!CarMatcher::new(car_id, 2).matches(None));
        assert!(CarMatcher::new(car_id, 2).matches(Some(car_id)));
        assert!(!CarMatcher::new(car_id, 1).matches(Some(Uuid::new_v4())));
    }

    // --- carro de lavagens antigas ---

    #[test]
    fn legacy_record_belongs_to_the_only_car_existing_at_wash_time() {
        let first = car(Utc.with_ymd_and_hms(2024, 1, 10, 8, 0, 0).unwrap());
        let second = car(Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap());
        let cars = vec![first.clone(), second];

        let washed_feb = Utc.with_ymd_and_hms(2024, 2, 14, 9, 30, 0).unwrap();
        assert_eq!(resolve_record_car(None, washed_feb, &cars), Some(first.id));

        let washed_mar = Utc.with_ymd_and_hms(2024, 3, 5, 9, 30, 0).unwrap();
        assert_eq!(resolve_record_car(None, washed_mar, &cars), None);

        let explicit = Uuid::new_v4();
        assert_eq!(resolve_record_car(Some(explicit), washed_mar, &cars), Some(explicit));
    }

    // --- calendário ---

    fn march_input<'a>(events: &'a [CompletionEvent]) -> CalendarInput<'a> {
        CalendarInput {
            pattern: WashPattern::TueThuSat,
            month: MonthRef { year: 2024, month0: 2 },
            today: d(2024, 3, 14),
            active_start: d(2024, 3, 1),
            hold_boundary: None,
            events,
        }
    }

    #[test]
    fn month_lists_rotation_days_with_derived_status() {
        let events = vec![
            CompletionEvent::Washed { day: d(2024, 3, 5), wash_time: Some("09:15".into()) },
            CompletionEvent::ScheduleCompleted { day: d(2024, 3, 7), start_time: None },
            CompletionEvent::ScheduleSlot { day: d(2024, 3, 16), start_time: Some("10:00".into()) },
        ];
        let entries = build_month(&march_input(&events));

        // Tue/Thu/Sat em março de 2024: 2,5,7,9,12,14,16,19,21,23,26,28,30
        assert_eq!(entries.len(), 13);
        let by_date = |date: &str| entries.iter().find(|e| e.date == date).unwrap();

        let tue = by_date("2024-03-05");
        assert_eq!(tue.status, WashStatus::Washed);
        assert_eq!(tue.scheduled_time.as_deref(), Some("09:15"));
        assert_eq!(tue.display_date, "Mar 5");
        assert_eq!(tue.day_name, "Tue");

        assert_eq!(by_date("2024-03-07").status, WashStatus::Washed);
        assert_eq!(by_date("2024-03-09").status, WashStatus::Pending);
        assert_eq!(by_date("2024-03-14").status, WashStatus::Scheduled);

        let slot = by_date("2024-03-16");
        assert_eq!(slot.status, WashStatus::Scheduled);
        assert_eq!(slot.scheduled_time.as_deref(), Some("10:00"));
    }

    #[test]
    fn days_before_activation_are_skipped() {
        let mut input = march_input(&[]);
        input.active_start = d(2024, 3, 20);
        let dates: Vec<String> = build_month(&input).into_iter().map(|e| e.date).collect();
        assert_eq!(dates, vec!["2024-03-21", "2024-03-23", "2024-03-26", "2024-03-28", "2024-03-30"]);
    }

    #[test]
    fn held_subscription_hides_days_after_the_hold() {
        let mut input = march_input(&[]);
        input.hold_boundary = Some(d(2024, 3, 12));
        let entries = build_month(&input);

        assert!(entries.iter().all(|e| e.date.as_str() <= "2024-03-12"));
        // o próprio dia da pausa continua no calendário
        let boundary = entries.last().unwrap();
        assert_eq!(boundary.date, "2024-03-12");
        assert_eq!(boundary.status, WashStatus::Pending);
    }

    #[test]
    fn month_and_year_inputs_are_sanitised() {
        let today = d(2024, 3, 7);
        assert_eq!(MonthRef::parse(Some("14"), Some("2023"), today), MonthRef { year: 2023, month0: 11 });
        assert_eq!(MonthRef::parse(Some("-3"), None, today), MonthRef { year: 2024, month0: 0 });
        assert_eq!(MonthRef::parse(Some("abc"), Some("x"), today), MonthRef { year: 2024, month0: 2 });
        assert_eq!(MonthRef::parse(None, Some("999999"), today), MonthRef { year: 2024, month0: 2 });
    }

    #[test]
    fn month_bounds_cover_february_in_leap_years() {
        let feb = MonthRef { year: 2024, month0: 1 };
        assert_eq!(feb.first_day(), Some(d(2024, 2, 1)));
        assert_eq!(feb.last_day(), Some(d(2024, 2, 29)));
    }
}
