//! Assertion helpers for `TestNetwork` integration tests.

use crate::ids::VehicleId;
use crate::signals::{signal_state, SignalStateFlags};
use crate::vehicles::{Status, VehicleManager};
use crate::world::{Pos3, TileWorld};

use super::TestNetwork;

impl TestNetwork {
    // -----------------------------------------------------------------------
    // Assertions
    // -----------------------------------------------------------------------

    pub fn assert_status(&self, id: VehicleId, expected: Status) {
        let status = self.status(id);
        assert_eq!(status, expected, "vehicle {id:?}: expected {expected:?}, got {status:?}");
    }

    /// Assert the vehicle has covered at least `distance` units in total.
    pub fn assert_travelled_at_least(&self, id: VehicleId, distance: u64) {
        let odometer = self.odometer(id);
        assert!(
            odometer >= distance,
            "vehicle {id:?}: expected odometer >= {distance}, got {odometer}"
        );
    }

    pub fn assert_none_stuck(&self) {
        for train in &self.resource::<VehicleManager>().trains {
            assert_ne!(train.head.status, Status::Stuck, "vehicle {:?} is stuck", train.head.id);
        }
    }

    pub fn assert_signal_occupied(&self, origin: Pos3, rotation: u8, expected: bool) {
        let occupied = self.signal_occupied(origin, rotation);
        assert_eq!(
            occupied, expected,
            "signal at {origin:?}: expected occupied = {expected}, got {occupied}"
        );
    }

    /// Every block a train claims is marked occupied in the world.
    pub fn assert_claims_occupied(&self) {
        let world = self.resource::<TileWorld>();
        for train in &self.resource::<VehicleManager>().trains {
            for claim in &train.head.signal_claims {
                assert!(
                    signal_state(world, &claim.signal).contains(SignalStateFlags::OCCUPIED),
                    "vehicle {:?} claims {:?} but it is not occupied",
                    train.head.id,
                    claim.signal
                );
            }
        }
    }
}
