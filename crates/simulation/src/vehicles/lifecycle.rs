//! Daily and monthly bookkeeping: reliability decay and breakdowns, cargo
//! ageing, crash timers, running costs and profit history.

use bevy::prelude::*;

use crate::config::*;
use crate::objects::TransportMode;

use super::train::Train;
use super::types::*;
use super::update::SimContext;

/// What the daily update wants done with the vehicle afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DailyOutcome {
    Keep,
    /// Crashed or stuck long enough that its AI owner sells it.
    AutoSell,
}

/// Days until the next breakdown for a car of `reliability` (0..=65535).
/// Less reliable cars draw shorter countdowns.
pub fn next_breakdown_timer(reliability: u16, draw: u16) -> u16 {
    let scaled = reliability as u32 / 256;
    let mut factor = scaled * scaled / 16;
    let jitter = draw as u32 * (factor / 2) / 65536;
    factor -= factor / 4;
    factor += jitter;
    factor.max(MIN_BREAKDOWN_TIMER as u32).min(u16::MAX as u32 - 1) as u16
}

impl Train {
    pub fn on_new_day(&mut self, ctx: &mut SimContext) -> DailyOutcome {
        self.update_breakdowns(ctx);

        for car in &mut self.cars {
            for cargo in [&mut car.front.secondary_cargo, &mut car.body.primary_cargo] {
                if cargo.qty != 0 {
                    cargo.num_days = cargo.num_days.saturating_add(1);
                }
            }
        }

        if self.head.status.is_terminal() {
            self.head.crash_timer = self.head.crash_timer.saturating_add(1);
            let ai_owned = ctx
                .companies
                .get(self.head.owner)
                .is_some_and(|c| !c.is_player && c.thought_for(self.head.id).is_some());
            if ai_owned && self.head.crash_timer >= AI_SELL_CRASHED_VEHICLE_DAYS {
                return DailyOutcome::AutoSell;
            }
        }

        if self.head.mode == TransportMode::Road
            && self.head.status == Status::Stopped
            && self.head.command_stop
        {
            self.head.stopped_days = self.head.stopped_days.saturating_add(1);
            if self.head.stopped_days >= RESTART_STOPPED_ROAD_VEHICLE_DAYS {
                info!("restarting road vehicle {:?} left stopped", self.head.id);
                self.head.command_stop = false;
                self.head.stopped_days = 0;
            }
        } else {
            self.head.stopped_days = 0;
        }
        DailyOutcome::Keep
    }

    fn update_breakdowns(&mut self, ctx: &mut SimContext) {
        let status = self.head.status;
        for car in &mut self.cars {
            let front = &mut car.front;
            if front.reliability == 0 {
                continue;
            }
            if ctx.settings.breakdowns_enabled {
                match front.breakdown {
                    Breakdown::BrokenDown { days_left } => {
                        let days_left = days_left.saturating_sub(1);
                        front.breakdown = if days_left == 0 {
                            Breakdown::None
                        } else {
                            Breakdown::BrokenDown { days_left }
                        };
                    }
                    Breakdown::Pending if status.can_break_down() => {
                        front.breakdown = Breakdown::BrokenDown {
                            days_left: BREAKDOWN_DURATION_DAYS,
                        };
                    }
                    Breakdown::Pending => {}
                    Breakdown::None => {
                        if front.breakdown_timer != BREAKDOWN_TIMER_DISABLED {
                            front.breakdown_timer = front.breakdown_timer.saturating_sub(1);
                            if front.breakdown_timer == 0 {
                                front.breakdown = Breakdown::Pending;
                                front.breakdown_timer =
                                    next_breakdown_timer(front.reliability, ctx.rng.next_u16());
                            }
                        }
                    }
                }
            }

            let obsolete = ctx
                .objects
                .vehicle(front.object_id)
                .is_some_and(|o| ctx.year >= o.obsolete_year);
            let loss = if obsolete {
                RELIABILITY_LOSS_PER_DAY_OBSOLETE
            } else {
                RELIABILITY_LOSS_PER_DAY
            };
            front.reliability = front.reliability.saturating_sub(loss).max(RELIABILITY_FLOOR);
        }

        self.recompute_totals(ctx.objects);
        if self.head.status == Status::BrokenDown && !self.veh2.is_broken_down {
            self.head.status = Status::Travelling;
        }
    }

    /// Charge running costs, roll the profit history and decay the resale
    /// value.
    pub fn on_new_month(&mut self, ctx: &mut SimContext) {
        let cost: i64 = self
            .cars
            .iter()
            .filter_map(|c| ctx.objects.vehicle(c.front.object_id))
            .map(|o| o.running_cost)
            .sum();
        ctx.companies.apply_payment(self.head.owner, -cost);

        self.veh2.profit.rotate_right(1);
        self.veh2.profit[0] = self.veh2.cur_month_revenue - cost;
        self.veh2.cur_month_revenue = 0;

        for car in &mut self.cars {
            car.front.refund_cost -= car.front.refund_cost / 128;
        }
    }
}
