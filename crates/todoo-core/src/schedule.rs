//! Schedule store: wall-clock time base plus the published activity
//! sequence, and the cursor-based selection over it.
//!
//! Incoming schedules are staged in a draft and swapped in atomically on
//! [`ScheduleStore::publish`], so the display task never observes a
//! half-written sequence.

use heapless::Vec;

use crate::layout;

/// Upper bound on activities per schedule (the wire count is one byte).
pub const MAX_ACTIVITIES: usize = 256;

/// Minutes in one day.
pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// Schedule staging errors.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ScheduleError {
    /// Activity written outside the announced draft slots, or with no
    /// draft open.
    OutOfOrder,
    /// Publish attempted before every announced activity arrived.
    Incomplete,
}

/// Wall-clock time of day, 24-hour.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Default)]
pub struct TimeOfDay {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl TimeOfDay {
    /// Validates the component ranges.
    pub fn new(hour: u8, minute: u8, second: u8) -> Option<Self> {
        if hour >= 24 || minute >= 60 || second >= 60 {
            return None;
        }

        Some(Self {
            hour,
            minute,
            second,
        })
    }

    /// Seconds since midnight.
    pub fn second_of_day(self) -> u32 {
        u32::from(self.hour) * 3600 + u32::from(self.minute) * 60 + u32::from(self.second)
    }

    /// Minutes since midnight.
    pub fn minute_of_day(self) -> u32 {
        u32::from(self.hour) * 60 + u32::from(self.minute)
    }
}

/// One scheduled activity with its flash-resident picture.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Activity {
    /// Weekday, 0 = Monday through 6 = Sunday.
    pub weekday: u8,
    pub start: TimeOfDay,
    pub end: TimeOfDay,
    /// Address of the bound picture in external flash.
    pub pic_addr: u32,
}

impl Activity {
    /// Start instant in minutes since Monday midnight.
    pub fn start_minute(&self) -> u32 {
        u32::from(self.weekday) * MINUTES_PER_DAY + self.start.minute_of_day()
    }

    /// End instant in minutes since Monday midnight.
    pub fn end_minute(&self) -> u32 {
        u32::from(self.weekday) * MINUTES_PER_DAY + self.end.minute_of_day()
    }
}

/// Header parameters of the most recent transfer.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Default)]
pub struct ScheduleParams {
    pub theme: u8,
    pub transition: u8,
    /// Weekday of the device clock, 0 = Monday.
    pub weekday: u8,
    pub time: TimeOfDay,
    pub activity_count: u8,
}

/// Result of a cursor scan over the activity sequence.
///
/// `previous == next` means the clock sits inside activity `previous`;
/// otherwise the clock sits in the gap between `previous` and `next`,
/// where `next` may be one past the end of the sequence.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Selection {
    pub previous: usize,
    pub next: usize,
}

/// Scans forward from `cursor` for the activity pair bracketing
/// `current_minute` (minutes since Monday midnight).
///
/// Assumes activities are sorted by start instant, which the wire
/// format guarantees. The scan never moves backwards; callers keep the
/// returned `previous` as the next cursor.
pub fn select_activity(activities: &[Activity], current_minute: u32, cursor: usize) -> Selection {
    let mut previous = cursor;
    let mut next = cursor;

    for (i, activity) in activities.iter().enumerate().skip(cursor) {
        if current_minute < activity.start_minute() {
            break;
        }

        previous = i;
        next = if current_minute < activity.end_minute() {
            i
        } else {
            i + 1
        };
    }

    Selection { previous, next }
}

/// Duration in seconds of the selected slot.
///
/// Inside an activity this is its own length; in a gap it is the idle
/// time until the next activity starts. Past the end of the sequence
/// there is nothing to count down, so the duration is zero.
pub fn slot_duration_seconds(activities: &[Activity], selection: Selection) -> u32 {
    let Some(previous) = activities.get(selection.previous) else {
        return 0;
    };

    if selection.previous == selection.next {
        return previous
            .end
            .second_of_day()
            .saturating_sub(previous.start.second_of_day());
    }

    match activities.get(selection.next) {
        Some(next) => next
            .start
            .second_of_day()
            .saturating_sub(previous.end.second_of_day()),
        None => 0,
    }
}

type Activities = Vec<Activity, MAX_ACTIVITIES>;

/// Shared schedule state.
#[derive(Default)]
pub struct ScheduleStore {
    params: ScheduleParams,
    published: Option<Activities>,
    draft: Option<Activities>,
}

impl ScheduleStore {
    pub const fn new() -> Self {
        Self {
            params: ScheduleParams {
                theme: 0,
                transition: 0,
                weekday: 0,
                time: TimeOfDay {
                    hour: 0,
                    minute: 0,
                    second: 0,
                },
                activity_count: 0,
            },
            published: None,
            draft: None,
        }
    }

    pub fn params(&self) -> &ScheduleParams {
        &self.params
    }

    /// Published activities, if a schedule has been received.
    pub fn activities(&self) -> Option<&[Activity]> {
        self.published.as_deref()
    }

    /// Device clock position in minutes since Monday midnight.
    pub fn current_minute(&self) -> u32 {
        u32::from(self.params.weekday) * MINUTES_PER_DAY + self.params.time.minute_of_day()
    }

    /// Adopts new header parameters and opens an empty draft.
    pub fn begin_schedule(&mut self, params: ScheduleParams) {
        self.params = params;
        self.draft = Some(Vec::new());
    }

    /// Appends activity `index` to the open draft. Activities must
    /// arrive in order, exactly as many as the header announced.
    pub fn set_activity(
        &mut self,
        index: usize,
        weekday: u8,
        start: TimeOfDay,
        end: TimeOfDay,
    ) -> Result<(), ScheduleError> {
        let announced = usize::from(self.params.activity_count);
        let draft = self.draft.as_mut().ok_or(ScheduleError::OutOfOrder)?;

        if index != draft.len() || index >= announced {
            return Err(ScheduleError::OutOfOrder);
        }

        let activity = Activity {
            weekday,
            start,
            end,
            pic_addr: layout::activity_pic_addr(index),
        };

        draft.push(activity).map_err(|_| ScheduleError::OutOfOrder)
    }

    /// Swaps the completed draft in as the published schedule.
    pub fn publish(&mut self) -> Result<(), ScheduleError> {
        let draft = self.draft.take().ok_or(ScheduleError::Incomplete)?;

        if draft.len() != usize::from(self.params.activity_count) {
            self.draft = Some(draft);
            return Err(ScheduleError::Incomplete);
        }

        self.published = Some(draft);
        Ok(())
    }

    /// Advances the device clock by one second, carrying through
    /// minutes, hours and the weekday.
    pub fn tick(&mut self) {
        let time = &mut self.params.time;

        time.second = (time.second + 1) % 60;
        if time.second != 0 {
            return;
        }

        time.minute = (time.minute + 1) % 60;
        if time.minute != 0 {
            return;
        }

        time.hour = (time.hour + 1) % 24;
        if time.hour == 0 {
            self.params.weekday = (self.params.weekday + 1) % 7;
        }
    }
}
