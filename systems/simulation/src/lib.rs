#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Frame-by-frame orchestration of a single Tower Duel match.
//!
//! A [`Simulation`] owns one [`World`] and the seeded random source used by
//! the wave director. Each tick routes player input, lets the director spawn,
//! runs the entity update pass in store order and finally compacts the store.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tower_duel_core::{EntityId, EntityKind, FrameInput, GridCell, Phase};
use tower_duel_system_enemy as enemy;
use tower_duel_system_projectile as projectile;
use tower_duel_system_tower::{self as tower, ClickOutcome};
use tower_duel_system_waves::{self as waves, BreakStatus};
use tower_duel_world::{CompactionReport, World};

/// Produces the input for each frame of a headless run.
pub trait InputSource {
    /// Input for the next frame, given the match as it stands.
    fn next_frame(&mut self, world: &World, dt: f32) -> FrameInput;
}

/// What happened during a single solo tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TickReport {
    /// Outcome of the player's click, if they clicked.
    pub click: Option<ClickOutcome>,
    /// Enemy spawned by the wave director this tick.
    pub spawned: Option<EntityId>,
    /// Enemies removed during compaction.
    pub removed: CompactionReport,
}

/// A single match together with its random source.
#[derive(Debug)]
pub struct Simulation {
    world: World,
    rng: ChaCha8Rng,
}

impl Simulation {
    /// Creates a match seeded with `seed`, with the starter tower in place.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        let mut world = World::new();
        if let Err(error) = tower::place_starter_tower(&mut world) {
            tracing::warn!(%error, "starter tower could not be placed");
        }
        Self {
            world,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Read-only access to the match.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Mutable access to the match.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.world.state().phase
    }

    /// Advances a solo match by one frame.
    pub fn tick(&mut self, input: &FrameInput) -> TickReport {
        let mut report = TickReport::default();
        match self.phase() {
            Phase::Start => {
                if input.confirm {
                    self.start_next_wave();
                }
            }
            Phase::Playing => {
                if self.check_defeat() {
                    return report;
                }
                report.click = self.apply_click(input);
                if waves::spawning_complete(&self.world) {
                    if self.world.state().enemies_alive == 0 {
                        self.enter_break();
                    }
                } else {
                    report.spawned = self.spawn_tick(input.dt);
                }
                report.removed = self.update(input.dt);
            }
            Phase::WaveBreak => {
                report.click = self.apply_click(input);
                report.removed = self.update(input.dt);
                let _ = self.tick_break(input.dt, input.confirm);
            }
            Phase::GameOver => {
                if input.confirm {
                    self.restart();
                }
            }
        }
        report
    }

    /// Runs `frames` solo ticks of `dt` seconds, drawing input from `source`.
    pub fn run<S>(&mut self, source: &mut S, dt: f32, frames: u64)
    where
        S: InputSource + ?Sized,
    {
        for _ in 0..frames {
            let input = source.next_frame(&self.world, dt);
            let _ = self.tick(&input);
        }
    }

    fn apply_click(&mut self, input: &FrameInput) -> Option<ClickOutcome> {
        if !input.click {
            return None;
        }
        input.cursor.map(|cell| self.click(cell))
    }

    /// Resolves a primary click on the cell.
    pub fn click(&mut self, cell: GridCell) -> ClickOutcome {
        tower::handle_click(&mut self.world, cell)
    }

    /// Begins the next wave.
    pub fn start_next_wave(&mut self) {
        waves::start_next_wave(&mut self.world);
    }

    /// Lets the wave director spawn if the spawn timer expired.
    pub fn spawn_tick(&mut self, dt: f32) -> Option<EntityId> {
        waves::spawn_tick(&mut self.world, &mut self.rng, dt)
    }

    /// Reports whether the current wave spawned out and was cleared.
    #[must_use]
    pub fn wave_cleared(&self) -> bool {
        waves::wave_cleared(&self.world)
    }

    /// Switches into the intermission between waves.
    pub fn enter_break(&mut self) {
        waves::enter_break(&mut self.world);
    }

    /// Counts down the intermission, starting the next wave when it ends.
    pub fn tick_break(&mut self, dt: f32, skip: bool) -> BreakStatus {
        waves::tick_break(&mut self.world, dt, skip)
    }

    /// Moves to game over once lives run out.
    pub fn check_defeat(&mut self) -> bool {
        waves::check_defeat(&mut self.world)
    }

    /// Resets the match and begins the first wave again.
    pub fn restart(&mut self) {
        waves::restart(&mut self.world);
    }

    /// Spawns up to `count` enemies outside the wave quota and returns how
    /// many were placed.
    pub fn spawn_bonus_enemies(&mut self, count: u8) -> u8 {
        let mut spawned = 0;
        for _ in 0..count {
            match waves::spawn_bonus_enemy(&mut self.world, &mut self.rng) {
                Ok(_) => spawned += 1,
                Err(error) => {
                    tracing::warn!(%error, "bonus enemy refused");
                    break;
                }
            }
        }
        spawned
    }

    /// Runs the entity update pass and compacts the store.
    ///
    /// Entities added during the pass are first visited on the next call.
    pub fn update(&mut self, dt: f32) -> CompactionReport {
        let store = self.world.store_mut();
        let len = store.len();
        for index in 0..len {
            let Some(kind) = store.get(index).map(|entity| entity.kind) else {
                break;
            };
            match kind {
                EntityKind::Enemy(_) => {
                    if let Some(entity) = store.get_mut(index) {
                        enemy::update(entity, dt);
                    }
                }
                EntityKind::Tower(_) => tower::update(store, index, dt),
                EntityKind::Projectile(_) => projectile::update(store, index, dt),
            }
        }
        self.world.remove_inactive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower_duel_world::{query, STARTING_MONEY};

    #[test]
    fn new_match_has_starter_tower_and_waits_for_confirm() {
        let mut simulation = Simulation::new(1);
        assert_eq!(query::towers(simulation.world()).count(), 1);
        assert!(simulation.world().spots()[0].occupied);
        assert_eq!(simulation.world().state().money, STARTING_MONEY);

        let _ = simulation.tick(&FrameInput::idle(1.0));
        assert_eq!(simulation.phase(), Phase::Start);

        let _ = simulation.tick(&FrameInput {
            confirm: true,
            ..FrameInput::idle(0.016)
        });
        assert_eq!(simulation.phase(), Phase::Playing);
        assert_eq!(simulation.world().state().current_wave, Some(0));
    }

    #[test]
    fn click_is_routed_while_playing() {
        let mut simulation = Simulation::new(2);
        simulation.start_next_wave();

        let report = simulation.tick(&FrameInput {
            click: true,
            cursor: Some(GridCell::new(9, 12)),
            ..FrameInput::idle(0.016)
        });

        assert!(matches!(
            report.click,
            Some(ClickOutcome::Built { spot: 1, .. })
        ));
        assert_eq!(simulation.world().state().money, STARTING_MONEY - 100);
    }

    #[test]
    fn zero_lives_ends_the_match_and_confirm_restarts() {
        let mut simulation = Simulation::new(3);
        simulation.start_next_wave();
        simulation.world_mut().state_mut().lives = 0;

        let _ = simulation.tick(&FrameInput::idle(0.016));
        assert_eq!(simulation.phase(), Phase::GameOver);

        let _ = simulation.tick(&FrameInput {
            confirm: true,
            ..FrameInput::idle(0.016)
        });
        assert_eq!(simulation.phase(), Phase::Playing);
        assert_eq!(simulation.world().state().lives, 100);
        assert_eq!(query::towers(simulation.world()).count(), 1);
    }
}
