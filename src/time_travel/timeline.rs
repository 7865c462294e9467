//! Month timeline of the game year
//!
//! Months `0..=11` can be selected up to the furthest month the simulation
//! clock has reached. Every accepted selection, and every clock update, emits
//! the first calendar day of the selected month.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use std::cmp::Ordering;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::debug;

pub const MONTHS_PER_YEAR: u32 = 12;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimelineError {
    #[error("month {month} is not unlocked yet (furthest unlocked: {furthest})")]
    FutureMonth { month: u32, furthest: u32 },
    #[error("month index {0} is outside 0..=11")]
    InvalidMonth(u32),
    #[error("game year {0} is out of range")]
    InvalidYear(i32),
}

#[derive(Debug)]
pub struct MonthTimeline {
    year: i32,
    months: Vec<NaiveDate>,
    selected: u32,
    furthest_unlocked: u32,
    tx: broadcast::Sender<NaiveDate>,
}

impl MonthTimeline {
    pub fn new(year: i32) -> Result<Self, TimelineError> {
        let months = (1..=MONTHS_PER_YEAR)
            .map(|month| NaiveDate::from_ymd_opt(year, month, 1))
            .collect::<Option<Vec<_>>>()
            .ok_or(TimelineError::InvalidYear(year))?;
        let (tx, _) = broadcast::channel(16);
        Ok(Self {
            year,
            months,
            selected: 0,
            furthest_unlocked: 0,
            tx,
        })
    }

    /// Month-changed notifications
    pub fn subscribe(&self) -> broadcast::Receiver<NaiveDate> {
        self.tx.subscribe()
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn selected(&self) -> u32 {
        self.selected
    }

    pub fn furthest_unlocked(&self) -> u32 {
        self.furthest_unlocked
    }

    /// First day of the selected month
    pub fn selected_date(&self) -> NaiveDate {
        self.months[self.selected as usize]
    }

    /// e.g. "March"
    pub fn selected_month_name(&self) -> String {
        self.selected_date().format("%B").to_string()
    }

    pub fn is_future_month(&self, index: u32) -> bool {
        index > self.furthest_unlocked
    }

    /// Select a month. Rejected months leave the selection untouched and emit nothing.
    pub fn select_month(&mut self, index: u32) -> Result<NaiveDate, TimelineError> {
        if index >= MONTHS_PER_YEAR {
            return Err(TimelineError::InvalidMonth(index));
        }
        if self.is_future_month(index) {
            return Err(TimelineError::FutureMonth {
                month: index,
                furthest: self.furthest_unlocked,
            });
        }
        self.selected = index;
        Ok(self.emit_selected())
    }

    /// Month index of `date` if it lies in an unlocked month of the game year
    pub fn unlocked_month(&self, date: NaiveDate) -> Result<u32, TimelineError> {
        if date.year() != self.year {
            return Err(TimelineError::InvalidYear(date.year()));
        }
        let month = date.month0();
        if self.is_future_month(month) {
            return Err(TimelineError::FutureMonth {
                month,
                furthest: self.furthest_unlocked,
            });
        }
        Ok(month)
    }

    /// Unlock months up to the clock's current month and pull the selection back
    /// if it lies beyond that. Always re-emits the selected month.
    ///
    /// A clock past the game year unlocks every month; one before it unlocks January only.
    pub fn on_clock_update(&mut self, game_time: NaiveDateTime) -> NaiveDate {
        self.furthest_unlocked = match game_time.year().cmp(&self.year) {
            Ordering::Greater => MONTHS_PER_YEAR - 1,
            Ordering::Less => 0,
            Ordering::Equal => game_time.month0().min(MONTHS_PER_YEAR - 1),
        };
        if self.selected > self.furthest_unlocked {
            debug!(
                from = self.selected,
                to = self.furthest_unlocked,
                "Clamping selected month to clock"
            );
            self.selected = self.furthest_unlocked;
        }
        self.emit_selected()
    }

    fn emit_selected(&self) -> NaiveDate {
        let date = self.selected_date();
        // No subscribers is fine
        let _ = self.tx.send(date);
        date
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::TryRecvError;

    fn game_time(month: u32, day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, month, day)
            .and_then(|d| d.and_hms_opt(9, 30, 0))
            .expect("valid date")
    }

    fn day(month: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, month, 1).expect("valid date")
    }

    #[test]
    fn future_month_is_rejected_without_notification() {
        let mut timeline = MonthTimeline::new(2023).expect("valid year");
        timeline.on_clock_update(game_time(3, 15));
        let mut rx = timeline.subscribe();

        let err = timeline.select_month(5).expect_err("June is locked in March");

        assert_eq!(
            err,
            TimelineError::FutureMonth {
                month: 5,
                furthest: 2
            }
        );
        assert_eq!(timeline.selected(), 0);
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn allowed_month_emits_once_with_first_day() {
        let mut timeline = MonthTimeline::new(2023).expect("valid year");
        timeline.on_clock_update(game_time(3, 15));
        let mut rx = timeline.subscribe();

        let date = timeline.select_month(2).expect("March is unlocked");

        assert_eq!(date, day(3));
        assert_eq!(rx.try_recv().expect("one notification"), day(3));
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
        assert_eq!(timeline.selected_month_name(), "March");
    }

    #[test]
    fn clock_update_clamps_selection_and_reemits() {
        let mut timeline = MonthTimeline::new(2023).expect("valid year");
        timeline.on_clock_update(game_time(6, 1));
        timeline.select_month(5).expect("June is unlocked");
        let mut rx = timeline.subscribe();

        // Clock reset back to February
        timeline.on_clock_update(game_time(2, 1));

        assert_eq!(timeline.selected(), 1);
        assert_eq!(timeline.furthest_unlocked(), 1);
        assert_eq!(rx.try_recv().expect("re-emitted"), day(2));
    }

    #[test]
    fn clock_past_game_year_unlocks_every_month() {
        let mut timeline = MonthTimeline::new(2023).expect("valid year");
        timeline.on_clock_update(game_time(11, 20));
        timeline.select_month(10).expect("November is unlocked");

        let rollover = NaiveDate::from_ymd_opt(2024, 1, 2)
            .and_then(|d| d.and_hms_opt(9, 30, 0))
            .expect("valid date");
        timeline.on_clock_update(rollover);

        assert_eq!(timeline.furthest_unlocked(), 11);
        assert_eq!(timeline.selected(), 10);
        assert_eq!(timeline.select_month(11), Ok(day(12)));
    }

    #[test]
    fn unlocked_month_checks_year_and_gate() {
        let mut timeline = MonthTimeline::new(2023).expect("valid year");
        timeline.on_clock_update(game_time(3, 15));

        assert_eq!(timeline.unlocked_month(day(2)), Ok(1));
        assert_eq!(
            timeline.unlocked_month(day(11)),
            Err(TimelineError::FutureMonth {
                month: 10,
                furthest: 2
            })
        );
        assert_eq!(
            timeline.unlocked_month(NaiveDate::from_ymd_opt(2022, 3, 1).expect("valid date")),
            Err(TimelineError::InvalidYear(2022))
        );
    }

    #[test]
    fn out_of_range_index_is_invalid() {
        let mut timeline = MonthTimeline::new(2023).expect("valid year");
        assert_eq!(
            timeline.select_month(12),
            Err(TimelineError::InvalidMonth(12))
        );
        assert!(MonthTimeline::new(i32::MAX).is_err());
    }
}
