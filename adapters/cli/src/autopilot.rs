//! Scripted player driving headless matches.

use tower_duel_core::{FrameInput, GiftTier, GridCell, Phase};
use tower_duel_simulation::InputSource;
use tower_duel_system_tower::TOWER_BUILD_COST;
use tower_duel_world::{query, World};

/// Gold kept back before the autopilot buys gifts.
const GIFT_RESERVE: u32 = 300;

/// Builds on free spots, then upgrades, and skips every intermission.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Autopilot {
    gifts: bool,
}

impl Autopilot {
    /// An autopilot that also sends enemies to the opponent when rich.
    pub(crate) fn duelist() -> Self {
        Self { gifts: true }
    }

    fn target(world: &World) -> Option<GridCell> {
        let money = world.state().money;
        if money >= TOWER_BUILD_COST {
            if let Some(spot) = world.spots().iter().find(|spot| !spot.occupied) {
                return Some(spot.cell());
            }
        }
        query::towers(world)
            .find(|entity| {
                entity.as_tower().is_some_and(|tower| {
                    tower.level.next().is_some() && money >= tower.upgrade_cost
                })
            })
            .map(|entity| GridCell::containing(entity.position))
    }
}

impl InputSource for Autopilot {
    fn next_frame(&mut self, world: &World, dt: f32) -> FrameInput {
        let mut input = FrameInput::idle(dt);
        let state = world.state();
        match state.phase {
            Phase::Start | Phase::WaveBreak | Phase::GameOver => input.confirm = true,
            Phase::Playing => {}
        }
        if matches!(state.phase, Phase::Playing | Phase::WaveBreak) {
            if let Some(cell) = Self::target(world) {
                input.click = true;
                input.cursor = Some(cell);
            } else if self.gifts && state.money >= GIFT_RESERVE + GiftTier::Single.cost() {
                input.gift = Some(GiftTier::Single);
            }
        }
        input
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower_duel_simulation::Simulation;

    fn playing(seed: u64) -> Simulation {
        let mut simulation = Simulation::new(seed);
        simulation.start_next_wave();
        simulation
    }

    #[test]
    fn builds_on_the_first_free_spot() {
        let simulation = playing(1);
        let input = Autopilot::default().next_frame(simulation.world(), 0.1);
        assert!(input.click);
        assert_eq!(input.cursor, Some(simulation.world().spots()[1].cell()));
        assert!(!input.confirm);
    }

    #[test]
    fn upgrades_once_every_spot_is_taken() {
        let mut simulation = playing(2);
        for spot in 1..simulation.world().spots().len() {
            let cell = simulation.world().spots()[spot].cell();
            simulation.world_mut().state_mut().money = 1_000;
            let _ = simulation.click(cell);
        }
        simulation.world_mut().state_mut().money = 250;

        let input = Autopilot::default().next_frame(simulation.world(), 0.1);
        let cursor = input.cursor.expect("upgrade target");
        assert!(query::tower_at(simulation.world(), cursor).is_some());
    }

    #[test]
    fn idles_when_broke_and_skips_breaks() {
        let mut simulation = playing(3);
        simulation.world_mut().state_mut().money = 10;
        let input = Autopilot::duelist().next_frame(simulation.world(), 0.1);
        assert_eq!(input, FrameInput::idle(0.1));

        simulation.enter_break();
        let input = Autopilot::default().next_frame(simulation.world(), 0.1);
        assert!(input.confirm);
    }

    #[test]
    fn duelist_gifts_surplus_gold() {
        let mut simulation = playing(4);
        for spot in 1..simulation.world().spots().len() {
            let cell = simulation.world().spots()[spot].cell();
            simulation.world_mut().state_mut().money = 1_000;
            let _ = simulation.click(cell);
        }
        for spot in 0..simulation.world().spots().len() {
            let cell = simulation.world().spots()[spot].cell();
            simulation.world_mut().state_mut().money = 1_000;
            let _ = simulation.click(cell);
        }
        simulation.world_mut().state_mut().money = 400;

        let input = Autopilot::duelist().next_frame(simulation.world(), 0.1);
        assert!(!input.click);
        assert_eq!(input.gift, Some(GiftTier::Single));
    }
}
