//! Tick counter and the day/month calendar that gates daily and monthly
//! vehicle bookkeeping.

use bevy::prelude::*;
use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::config::{DAYS_PER_MONTH, MONTHS_PER_YEAR, STARTING_YEAR, TICKS_PER_DAY};
use crate::SimulationSet;

/// Global tick counter incremented each FixedUpdate. Journey timing reads it.
#[derive(Resource, Default, Debug, Clone, Copy, Serialize, Deserialize, Encode, Decode)]
pub struct TickCounter(pub u64);

impl crate::Saveable for TickCounter {
    const SAVE_KEY: &'static str = "tick_counter";

    fn save_to_bytes(&self) -> Option<Vec<u8>> {
        (self.0 != 0).then(|| bitcode::encode(&self.0))
    }

    fn load_from_bytes(bytes: &[u8]) -> Self {
        TickCounter(crate::decode_or_warn(Self::SAVE_KEY, bytes))
    }
}

#[derive(Resource, Clone, Debug, Serialize, Deserialize, Encode, Decode)]
pub struct GameCalendar {
    pub ticks_into_day: u32,
    pub day_of_month: u32,
    pub month: u32,
    pub year: u16,
    /// Set for exactly the tick that closes a day.
    pub new_day: bool,
    /// Set for exactly the tick that closes a month.
    pub new_month: bool,
}

impl Default for GameCalendar {
    fn default() -> Self {
        Self {
            ticks_into_day: 0,
            day_of_month: 0,
            month: 0,
            year: STARTING_YEAR,
            new_day: false,
            new_month: false,
        }
    }
}

impl GameCalendar {
    pub fn advance(&mut self) {
        self.new_day = false;
        self.new_month = false;
        self.ticks_into_day += 1;
        if self.ticks_into_day < TICKS_PER_DAY {
            return;
        }
        self.ticks_into_day = 0;
        self.new_day = true;
        self.day_of_month += 1;
        if self.day_of_month < DAYS_PER_MONTH {
            return;
        }
        self.day_of_month = 0;
        self.new_month = true;
        self.month += 1;
        if self.month >= MONTHS_PER_YEAR {
            self.month = 0;
            self.year = self.year.saturating_add(1);
        }
    }
}

impl crate::Saveable for GameCalendar {
    const SAVE_KEY: &'static str = "game_calendar";

    fn save_to_bytes(&self) -> Option<Vec<u8>> {
        Some(bitcode::encode(self))
    }

    fn load_from_bytes(bytes: &[u8]) -> Self {
        crate::decode_or_warn(Self::SAVE_KEY, bytes)
    }
}

pub fn advance_calendar(mut tick: ResMut<TickCounter>, mut calendar: ResMut<GameCalendar>) {
    tick.0 = tick.0.wrapping_add(1);
    calendar.advance();
}

pub struct CalendarPlugin;

impl Plugin for CalendarPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<TickCounter>()
            .init_resource::<GameCalendar>()
            .add_systems(
                FixedUpdate,
                advance_calendar.in_set(SimulationSet::PreSim),
            );
        crate::register_saveable::<TickCounter>(app);
        crate::register_saveable::<GameCalendar>(app);
    }
}
