use bevy::prelude::*;
use std::collections::BTreeMap;

pub mod calendar;
pub mod cargo;
pub mod companies;
pub mod config;
pub mod errors;
pub mod ids;
pub mod objects;
pub mod orders;
pub mod signals;
pub mod sim_rng;
pub mod simulation_sets;
pub mod stations;
pub mod track;
pub mod vehicles;
pub mod world;

#[cfg(any(test, feature = "bench"))]
pub mod test_harness;

pub use simulation_sets::SimulationSet;

// ---------------------------------------------------------------------------
// Saveable trait + registry
// ---------------------------------------------------------------------------

/// Trait for resources whose state is handed to the persistence layer as an
/// opaque byte blob.
///
/// The save format itself lives outside this crate; each resource only knows
/// how to turn itself into bytes and back. Feature plugins register their
/// resources with the `SaveableRegistry` in `build()`.
pub trait Saveable: Resource + Default + Send + Sync + 'static {
    /// Unique, version-stable key for this resource's blob.
    const SAVE_KEY: &'static str;

    /// Serialize this resource. `None` skips it (e.g. nothing placed yet).
    fn save_to_bytes(&self) -> Option<Vec<u8>>;

    /// Restore the resource from a blob produced by `save_to_bytes`.
    fn load_from_bytes(bytes: &[u8]) -> Self;
}

/// Decode bytes via `bitcode::decode`, logging a warning and returning `Default` on failure.
pub fn decode_or_warn<T: bitcode::DecodeOwned + Default>(key: &str, bytes: &[u8]) -> T {
    match bitcode::decode(bytes) {
        Ok(v) => v,
        Err(e) => {
            warn!(
                "Saveable {}: failed to decode {} bytes, falling back to default: {}",
                key,
                bytes.len(),
                e
            );
            T::default()
        }
    }
}

pub type SaveFn = Box<dyn Fn(&World) -> Option<Vec<u8>> + Send + Sync>;
pub type LoadFn = Box<dyn Fn(&mut World, &[u8]) + Send + Sync>;
pub type ResetFn = Box<dyn Fn(&mut World) + Send + Sync>;

/// Type-erased save/load/reset operations for one registered resource.
pub struct SaveableEntry {
    pub key: String,
    pub save_fn: SaveFn,
    pub load_fn: LoadFn,
    pub reset_fn: ResetFn,
}

/// Every saveable resource of the vehicle simulation, in registration order.
#[derive(Resource, Default)]
pub struct SaveableRegistry {
    pub entries: Vec<SaveableEntry>,
}

impl SaveableRegistry {
    /// Register a resource type. A second registration under the same key is
    /// ignored (and trips a debug assertion).
    pub fn register<T: Saveable>(&mut self) {
        let key = T::SAVE_KEY.to_string();
        if self.entries.iter().any(|e| e.key == key) {
            warn!("SaveableRegistry: duplicate key '{}' ignored", key);
            debug_assert!(false, "SaveableRegistry: duplicate key '{}'", key);
            return;
        }
        self.entries.push(SaveableEntry {
            key,
            save_fn: Box::new(|world: &World| {
                world.get_resource::<T>().and_then(|r| r.save_to_bytes())
            }),
            load_fn: Box::new(|world: &mut World, bytes: &[u8]| {
                world.insert_resource(T::load_from_bytes(bytes));
            }),
            reset_fn: Box::new(|world: &mut World| {
                world.insert_resource(T::default());
            }),
        });
    }

    /// Collect the blobs of every registered resource, keyed by `SAVE_KEY`.
    pub fn save_all(&self, world: &World) -> BTreeMap<String, Vec<u8>> {
        let mut blobs = BTreeMap::new();
        for entry in &self.entries {
            if let Some(bytes) = (entry.save_fn)(world) {
                blobs.insert(entry.key.clone(), bytes);
            }
        }
        blobs
    }

    /// Restore resources from blobs. Keys that are absent leave the resource untouched.
    pub fn load_all(&self, world: &mut World, blobs: &BTreeMap<String, Vec<u8>>) {
        for entry in &self.entries {
            if let Some(bytes) = blobs.get(&entry.key) {
                (entry.load_fn)(world, bytes);
            }
        }
    }

    /// Reset every registered resource to its default (new scenario).
    pub fn reset_all(&self, world: &mut World) {
        for entry in &self.entries {
            (entry.reset_fn)(world);
        }
    }
}

/// Registers `T` with the `SaveableRegistry`, creating the registry if needed.
pub fn register_saveable<T: Saveable>(app: &mut App) {
    app.init_resource::<SaveableRegistry>();
    app.world_mut()
        .resource_mut::<SaveableRegistry>()
        .register::<T>();
}

// ---------------------------------------------------------------------------
// Plugin
// ---------------------------------------------------------------------------

pub struct SimulationPlugin;

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        app.configure_sets(
            FixedUpdate,
            (
                SimulationSet::PreSim,
                SimulationSet::Simulation,
                SimulationSet::PostSim,
            )
                .chain(),
        );
        app.init_resource::<SaveableRegistry>()
            .init_resource::<config::SimulationSettings>()
            .init_resource::<errors::LastErrorText>();

        app.add_plugins((
            sim_rng::SimRngPlugin,
            calendar::CalendarPlugin,
            objects::ObjectsPlugin,
            world::WorldPlugin,
            companies::CompaniesPlugin,
            stations::StationsPlugin,
            orders::OrdersPlugin,
            vehicles::VehiclesPlugin,
        ));
    }
}

#[cfg(test)]
mod saveable_tests {
    use super::*;

    #[derive(Resource, Default, Debug, PartialEq)]
    struct TestOdometer {
        distance: u32,
    }

    impl Saveable for TestOdometer {
        const SAVE_KEY: &'static str = "test_odometer";

        fn save_to_bytes(&self) -> Option<Vec<u8>> {
            if self.distance == 0 {
                None
            } else {
                Some(bitcode::encode(&self.distance))
            }
        }

        fn load_from_bytes(bytes: &[u8]) -> Self {
            TestOdometer {
                distance: decode_or_warn(Self::SAVE_KEY, bytes),
            }
        }
    }

    #[test]
    fn test_registry_saves_and_reloads() {
        let mut world = World::new();
        world.insert_resource(TestOdometer { distance: 4096 });

        let mut registry = SaveableRegistry::default();
        registry.register::<TestOdometer>();

        let blobs = registry.save_all(&world);
        assert!(blobs.contains_key("test_odometer"));

        world.insert_resource(TestOdometer::default());
        registry.load_all(&mut world, &blobs);
        assert_eq!(world.resource::<TestOdometer>().distance, 4096);
    }

    #[test]
    fn test_registry_skips_untouched_resource() {
        let mut world = World::new();
        world.insert_resource(TestOdometer::default());

        let mut registry = SaveableRegistry::default();
        registry.register::<TestOdometer>();

        assert!(registry.save_all(&world).is_empty());
    }

    #[test]
    fn test_registry_reset_all() {
        let mut world = World::new();
        world.insert_resource(TestOdometer { distance: 7 });

        let mut registry = SaveableRegistry::default();
        registry.register::<TestOdometer>();
        registry.reset_all(&mut world);

        assert_eq!(world.resource::<TestOdometer>().distance, 0);
    }

    #[test]
    fn test_corrupt_blob_falls_back_to_default() {
        let restored = TestOdometer::load_from_bytes(&[]);
        assert_eq!(restored, TestOdometer::default());
    }
}
