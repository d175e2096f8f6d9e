use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::config::{BREAKDOWN_TIMER_DISABLED, ROUTING_RING_SIZE};
use crate::ids::{CargoId, CompanyId, Money, StationId, VehicleId};
use crate::objects::{CargoCapacity, TransportMode, VehicleType};
use crate::orders::OrderCursor;
use crate::signals::{SignalClaim, SignalRef};
use crate::world::Pos3;

// =============================================================================
// Status
// =============================================================================

/// Where a vehicle is in its state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode)]
pub enum Status {
    Stopped,
    Travelling,
    Approaching,
    WaitingAtSignal,
    Unloading,
    Loading,
    BrokenDown,
    Crashed,
    Stuck,
    // Aircraft only.
    Landing,
    Taxiing1,
    Taxiing2,
    TakingOff,
}

impl Status {
    /// Sink states: the vehicle only counts days until it is sold.
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Crashed | Status::Stuck)
    }

    /// States in which a pending breakdown may strike.
    pub fn can_break_down(self) -> bool {
        matches!(
            self,
            Status::Travelling
                | Status::Approaching
                | Status::BrokenDown
                | Status::Landing
                | Status::Taxiing1
                | Status::Taxiing2
                | Status::TakingOff
        )
    }
}

/// What the command layer shows for a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisplayStatus {
    Stopped,
    Stopping,
    Travelling,
    TravellingTo(StationId),
    ApproachingStation(StationId),
    WaitingAtSignal,
    UnloadingAt(StationId),
    LoadingAt(StationId),
    WaitingForCargo(CargoId),
    BrokenDown,
    Crashed,
    Stuck,
    Landing,
    Taxiing,
    TakingOff,
}

/// Result of one vehicle update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// The vehicle deleted itself (dangling train timeout).
    Removed,
}

// =============================================================================
// Cargo hold
// =============================================================================

/// Cargo carried by one component.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct VehicleCargo {
    pub cargo_type: Option<CargoId>,
    pub qty: u8,
    pub max_qty: u8,
    pub accepted_types: u32,
    /// Station the cargo was picked up at.
    pub town_from: Option<StationId>,
    /// Days in transit.
    pub num_days: u8,
}

impl VehicleCargo {
    /// Empty hold for `capacity`, set up to carry its first accepted type.
    pub fn with_capacity(capacity: Option<CargoCapacity>) -> Self {
        let Some(capacity) = capacity else {
            return Self::default();
        };
        let first = (0..32u8).find(|t| capacity.accepted_types & (1 << t) != 0);
        Self {
            cargo_type: first,
            max_qty: capacity.max_qty,
            accepted_types: capacity.accepted_types,
            ..Self::default()
        }
    }

    pub fn accepts(&self, cargo: CargoId) -> bool {
        cargo < 32 && self.accepted_types & (1 << cargo) != 0
    }

    pub fn is_full(&self) -> bool {
        self.qty >= self.max_qty
    }
}

// =============================================================================
// Routing ring
// =============================================================================

/// Slot value for "allocated but nothing entered yet".
pub const ROUTING_SLOT_FREE: u16 = 0xFFFF;

/// The last pieces the head entered, newest at `cursor`. Components behind
/// the head find their piece by walking back from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct RoutingRing {
    slots: Vec<u16>,
    cursor: u8,
}

impl Default for RoutingRing {
    fn default() -> Self {
        Self {
            slots: vec![ROUTING_SLOT_FREE; ROUTING_RING_SIZE],
            cursor: 0,
        }
    }
}

impl RoutingRing {
    pub fn push(&mut self, connection: u16) {
        self.cursor = ((self.cursor as usize + 1) % ROUTING_RING_SIZE) as u8;
        self.slots[self.cursor as usize] = connection;
    }

    /// Connection `back` pieces behind the newest one, if recorded.
    pub fn behind(&self, back: usize) -> Option<u16> {
        if back >= ROUTING_RING_SIZE {
            return None;
        }
        let index = (self.cursor as usize + ROUTING_RING_SIZE - back) % ROUTING_RING_SIZE;
        let slot = self.slots[index];
        (slot != ROUTING_SLOT_FREE).then_some(slot)
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// A component's place on the network: the piece it stands on (as entered
/// by the head) and how far along it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutingHandle {
    /// Pieces behind the head's piece.
    pub ring_index: usize,
    pub entry: Pos3,
    pub connection: u16,
    pub sub_position: u32,
}

// =============================================================================
// Components
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct VehicleHead {
    pub id: VehicleId,
    pub owner: CompanyId,
    pub mode: TransportMode,
    pub vehicle_type: VehicleType,
    pub status: Status,
    pub orders: OrderCursor,
    /// Track or road object the vehicle runs on.
    pub network_object: u8,
    pub required_mods: u8,
    pub placed: bool,
    /// Rail/road: where the head entered its current piece, the connection
    /// it entered with, and the distance covered on the piece.
    pub entry: Pos3,
    pub connection: u16,
    pub progress: u32,
    /// Air/water: world position.
    pub position: Pos3,
    pub station: Option<StationId>,
    /// Station the vehicle last came to a halt at.
    pub last_stop: Option<StationId>,
    pub command_stop: bool,
    pub routing: RoutingRing,
    pub signal_claims: Vec<SignalClaim>,
    pub recent_signals: Vec<SignalRef>,
    pub cargo_transfer_timeout: u16,
    /// Ticks spent in the current air sub-state.
    pub air_timer: u16,
    /// Days spent crashed or stuck.
    pub crash_timer: u8,
    /// Days a stopped road vehicle has sat with the stop flag set.
    pub stopped_days: u8,
    pub journey_start: Pos3,
    pub journey_start_tick: u64,
}

/// Lead metadata: everything about motion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct Vehicle1 {
    pub speed: u16,
    pub time_at_signal: u16,
    /// Ticks left in which a held signal may be passed.
    pub signal_pass_grace: u8,
    pub reversals_without_progress: u8,
    /// Only halt at stations named by a `StopAt` order.
    pub express_mode: bool,
    /// Total distance the head has moved.
    pub odometer: u64,
    pub wheel_slip: u8,
    /// Sub-unit movement carried between ticks (air/water).
    pub move_remainder: u32,
}

/// Motive metadata: capability totals and money.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct Vehicle2 {
    pub max_speed: u16,
    pub power: u32,
    pub weight: u32,
    /// Lowest reliability among the cars, scaled to 0..=255.
    pub reliability: u8,
    pub is_broken_down: bool,
    pub is_still_powered: bool,
    pub cur_month_revenue: Money,
    /// Profit of the last four months, newest first.
    pub profit: [Money; 4],
    /// Revenue collected during the current station visit.
    pub visit_revenue: Money,
}

/// Breakdown progression of one car.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub enum Breakdown {
    #[default]
    None,
    Pending,
    BrokenDown {
        days_left: u8,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct FrontBogie {
    pub object_id: u16,
    pub reliability: u16,
    /// Days until the next breakdown becomes pending.
    pub breakdown_timer: u16,
    pub breakdown: Breakdown,
    /// Value refunded when the vehicle is sold; decays monthly.
    pub refund_cost: Money,
    pub secondary_cargo: VehicleCargo,
    pub pending_transfer: bool,
}

impl Default for FrontBogie {
    fn default() -> Self {
        Self {
            object_id: 0,
            reliability: 0,
            breakdown_timer: BREAKDOWN_TIMER_DISABLED,
            breakdown: Breakdown::None,
            refund_cost: 0,
            secondary_cargo: VehicleCargo::default(),
            pending_transfer: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct BackBogie {
    pub pending_transfer: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct Body {
    pub object_id: u16,
    pub length: u32,
    pub primary_cargo: VehicleCargo,
    pub pending_transfer: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct Tail {
    /// Ticks spent unplaced with no cars.
    pub dangling_timeout: u16,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct Car {
    pub front: FrontBogie,
    pub back: BackBogie,
    pub body: Body,
}

/// One link of a train's component chain, as handed to and from the
/// persistence layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub enum VehicleComponent {
    Head(VehicleHead),
    Vehicle1(Vehicle1),
    Vehicle2(Vehicle2),
    FrontBogie(FrontBogie),
    BackBogie(BackBogie),
    Body(Body),
    Tail(Tail),
}

/// Which cargo hold of a car a transfer step works on. Back bogies carry
/// nothing but still take a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferSlot {
    Front(usize),
    Back(usize),
    Body(usize),
}
