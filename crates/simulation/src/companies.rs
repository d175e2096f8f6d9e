//! Owning companies: cash, cargo delivery statistics, per-mode speed records
//! and the AI plan list that crashed-vehicle auto-sale prunes.

use bevy::prelude::*;
use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::config::MAX_CARGO_TYPES;
use crate::errors::{ActionError, ActionResult};
use crate::ids::{CargoId, CompanyId, Money, VehicleId};
use crate::objects::TransportMode;

/// One AI plan. Only the vehicle list matters to the vehicle simulation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct AiThought {
    pub vehicles: Vec<VehicleId>,
    pub revenue: Money,
}

#[derive(Clone, Debug, Serialize, Deserialize, Encode, Decode)]
pub struct Company {
    pub id: CompanyId,
    pub name: String,
    pub is_player: bool,
    pub cash: Money,
    pub cargo_units_delivered: u32,
    pub cargo_units_distance: u32,
    /// Units delivered per cargo type.
    pub cargo_delivered: Vec<u32>,
    /// Income per cargo type.
    pub cargo_income: Vec<Money>,
    /// Best last-journey average speed per transport mode.
    pub speed_records: [u16; 4],
    pub ai_thoughts: Vec<AiThought>,
}

impl Company {
    pub fn new(id: CompanyId, name: &str, is_player: bool, cash: Money) -> Self {
        Self {
            id,
            name: name.to_string(),
            is_player,
            cash,
            cargo_units_delivered: 0,
            cargo_units_distance: 0,
            cargo_delivered: vec![0; MAX_CARGO_TYPES],
            cargo_income: vec![0; MAX_CARGO_TYPES],
            speed_records: [0; 4],
            ai_thoughts: Vec::new(),
        }
    }

    pub fn can_afford(&self, cost: Money) -> bool {
        cost <= 0 || self.cash >= cost
    }

    /// Debit `cost` (negative refunds). Fails without touching cash when the
    /// company cannot pay.
    pub fn charge(&mut self, cost: Money) -> ActionResult<()> {
        if !self.can_afford(cost) {
            return Err(ActionError::InsufficientFunds);
        }
        self.cash -= cost;
        Ok(())
    }

    pub fn credit(&mut self, amount: Money) {
        self.cash += amount;
    }

    pub fn record_delivery(&mut self, cargo: CargoId, qty: u16, tiles: u32, payment: Money) {
        let idx = cargo as usize;
        self.cargo_units_delivered = self.cargo_units_delivered.saturating_add(qty as u32);
        self.cargo_units_distance = self
            .cargo_units_distance
            .saturating_add((qty as u32).saturating_mul(tiles));
        if let Some(delivered) = self.cargo_delivered.get_mut(idx) {
            *delivered = delivered.saturating_add(qty as u32);
        }
        if let Some(income) = self.cargo_income.get_mut(idx) {
            *income += payment;
        }
    }

    /// Keep the fastest average speed seen for `mode`. Returns true on a new record.
    pub fn record_speed(&mut self, mode: TransportMode, speed: u16) -> bool {
        let record = &mut self.speed_records[mode.index()];
        if speed > *record {
            *record = speed;
            return true;
        }
        false
    }

    pub fn remove_vehicle_from_thoughts(&mut self, vehicle: VehicleId) {
        for thought in &mut self.ai_thoughts {
            thought.vehicles.retain(|v| *v != vehicle);
        }
    }

    pub fn thought_for(&self, vehicle: VehicleId) -> Option<usize> {
        self.ai_thoughts
            .iter()
            .position(|t| t.vehicles.contains(&vehicle))
    }
}

#[derive(Resource, Clone, Debug, Default, Serialize, Deserialize, Encode, Decode)]
pub struct CompanyManager {
    pub companies: Vec<Company>,
}

impl CompanyManager {
    pub fn add(&mut self, name: &str, is_player: bool, cash: Money) -> CompanyId {
        let id = CompanyId(self.companies.len() as u8);
        self.companies.push(Company::new(id, name, is_player, cash));
        id
    }

    pub fn get(&self, id: CompanyId) -> Option<&Company> {
        self.companies.get(id.0 as usize)
    }

    pub fn get_mut(&mut self, id: CompanyId) -> Option<&mut Company> {
        self.companies.get_mut(id.0 as usize)
    }

    /// Charge `cost` to `id`. Neutral infrastructure is never billed.
    pub fn charge(&mut self, id: CompanyId, cost: Money) -> ActionResult<()> {
        if id == CompanyId::NEUTRAL {
            return Ok(());
        }
        self.get_mut(id).ok_or(ActionError::NotFound)?.charge(cost)
    }

    /// Whether `id` could pay `cost` right now.
    pub fn can_afford(&self, id: CompanyId, cost: Money) -> ActionResult<()> {
        if id == CompanyId::NEUTRAL {
            return Ok(());
        }
        let company = self.get(id).ok_or(ActionError::NotFound)?;
        if company.can_afford(cost) {
            Ok(())
        } else {
            Err(ActionError::InsufficientFunds)
        }
    }

    /// Apply income or running costs; never fails, cash may go negative.
    pub fn apply_payment(&mut self, id: CompanyId, amount: Money) {
        if let Some(company) = self.get_mut(id) {
            company.cash += amount;
        }
    }
}

impl crate::Saveable for CompanyManager {
    const SAVE_KEY: &'static str = "company_manager";

    fn save_to_bytes(&self) -> Option<Vec<u8>> {
        if self.companies.is_empty() {
            return None;
        }
        Some(bitcode::encode(self))
    }

    fn load_from_bytes(bytes: &[u8]) -> Self {
        crate::decode_or_warn(Self::SAVE_KEY, bytes)
    }
}

pub struct CompaniesPlugin;

impl Plugin for CompaniesPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CompanyManager>();
        crate::register_saveable::<CompanyManager>(app);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_charge_rejects_overdraft() {
        let mut companies = CompanyManager::default();
        let id = companies.add("Rail Co", true, 100);
        assert_eq!(companies.charge(id, 150), Err(ActionError::InsufficientFunds));
        assert_eq!(companies.get(id).map(|c| c.cash), Some(100), "failed charge leaves cash alone");
        assert!(companies.charge(id, 60).is_ok());
        assert_eq!(companies.get(id).map(|c| c.cash), Some(40));
    }

    #[test]
    fn test_refund_always_allowed() {
        let mut companies = CompanyManager::default();
        let id = companies.add("Rail Co", true, 0);
        assert!(companies.charge(id, -50).is_ok());
        assert_eq!(companies.get(id).map(|c| c.cash), Some(50));
    }

    #[test]
    fn test_neutral_owner_is_not_billed() {
        let mut companies = CompanyManager::default();
        assert!(companies.charge(CompanyId::NEUTRAL, 1_000_000).is_ok());
    }

    #[test]
    fn test_speed_record_only_increases() {
        let mut company = Company::new(CompanyId(0), "Air Co", false, 0);
        assert!(company.record_speed(TransportMode::Air, 40));
        assert!(!company.record_speed(TransportMode::Air, 30));
        assert_eq!(company.speed_records[TransportMode::Air.index()], 40);
        assert_eq!(company.speed_records[TransportMode::Rail.index()], 0);
    }

    #[test]
    fn test_remove_vehicle_from_thoughts() {
        let mut company = Company::new(CompanyId(1), "AI", false, 0);
        company.ai_thoughts.push(AiThought {
            vehicles: vec![VehicleId(3), VehicleId(4)],
            revenue: 0,
        });
        assert_eq!(company.thought_for(VehicleId(4)), Some(0));
        company.remove_vehicle_from_thoughts(VehicleId(4));
        assert_eq!(company.ai_thoughts[0].vehicles, vec![VehicleId(3)]);
        assert_eq!(company.thought_for(VehicleId(4)), None);
    }
}
