//! War calendar: turn counter to simulated date mapping
//!
//! Turn 0 is the week of 1992-04-06; each turn advances one week. The
//! capability step curves key off this mapping, and bots receive the current
//! date through their decision context.

use serde::{Deserialize, Serialize};

use crate::core::types::Turn;

/// Days in each month of a non-leap year
const MONTH_DAYS: [u32; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

/// A simulated calendar date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

/// Maps turns onto the simulated calendar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarCalendar {
    epoch: WarDate,
}

impl WarCalendar {
    /// The reference scenario epoch: 6 April 1992.
    pub fn reference() -> Self {
        Self {
            epoch: WarDate {
                year: 1992,
                month: 4,
                day: 6,
            },
        }
    }

    pub fn date_for_turn(&self, turn: Turn) -> WarDate {
        let mut year = self.epoch.year;
        let mut month = self.epoch.month;
        let mut day = self.epoch.day;
        let mut remaining = turn * 7;
        while remaining > 0 {
            let in_month = days_in_month(year, month);
            let left_in_month = u64::from(in_month - day);
            if remaining <= left_in_month {
                day += remaining as u32;
                remaining = 0;
            } else {
                remaining -= left_in_month + 1;
                day = 1;
                month += 1;
                if month > 12 {
                    month = 1;
                    year += 1;
                }
            }
        }
        WarDate { year, month, day }
    }

    pub fn year_for_turn(&self, turn: Turn) -> i32 {
        self.date_for_turn(turn).year
    }
}

impl Default for WarCalendar {
    fn default() -> Self {
        Self::reference()
    }
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn days_in_month(year: i32, month: u32) -> u32 {
    if month == 2 && is_leap_year(year) {
        29
    } else {
        MONTH_DAYS[(month - 1) as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_zero_is_epoch() {
        let cal = WarCalendar::reference();
        assert_eq!(
            cal.date_for_turn(0),
            WarDate {
                year: 1992,
                month: 4,
                day: 6
            }
        );
    }

    #[test]
    fn test_one_turn_is_one_week() {
        let cal = WarCalendar::reference();
        assert_eq!(
            cal.date_for_turn(1),
            WarDate {
                year: 1992,
                month: 4,
                day: 13
            }
        );
        assert_eq!(
            cal.date_for_turn(4),
            WarDate {
                year: 1992,
                month: 5,
                day: 4
            }
        );
    }

    #[test]
    fn test_year_boundaries() {
        let cal = WarCalendar::reference();
        // 52 weeks after the epoch lands in April 1993.
        assert_eq!(cal.year_for_turn(52), 1993);
        assert_eq!(cal.date_for_turn(52).month, 4);
        // Turn 104 (two years in) is the April 1994 milestone.
        assert_eq!(cal.year_for_turn(104), 1994);
        // Turn 188 lands in the post-accord window, late 1995.
        let post_accord = cal.date_for_turn(188);
        assert_eq!(post_accord.year, 1995);
        assert!(post_accord.month >= 11);
    }

    #[test]
    fn test_leap_year_february() {
        assert!(is_leap_year(1992));
        assert!(!is_leap_year(1993));
        assert_eq!(days_in_month(1996, 2), 29);
        assert_eq!(days_in_month(1995, 2), 28);
    }
}
