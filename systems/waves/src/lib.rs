#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Wave director: the static wave table, the match phase machine and the
//! spawn cadence within a wave.

use rand::Rng;
use tower_duel_core::{EnemyKind, EntityId, PathId, Phase, StoreError};
use tower_duel_system_enemy as enemy;
use tower_duel_world::World;

/// Seconds of intermission between two waves.
pub const WAVE_BREAK_DURATION: f32 = 10.0;

/// Number of hand-tuned waves before the open-ended escalation begins.
pub const TABLE_WAVES: u32 = 10;

/// Composition and cadence of a single wave.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WaveSpec {
    /// Enemies the wave spawns in total.
    pub enemy_count: u32,
    /// Seconds between consecutive spawns.
    pub spawn_interval: f32,
    /// Percentage chance that a spawn is a flying enemy.
    pub flying_chance: u32,
    /// Whether spawns may use the lower route.
    pub allow_bottom_path: bool,
}

impl WaveSpec {
    const fn new(
        enemy_count: u32,
        spawn_interval: f32,
        flying_chance: u32,
        allow_bottom_path: bool,
    ) -> Self {
        Self {
            enemy_count,
            spawn_interval,
            flying_chance,
            allow_bottom_path,
        }
    }
}

const WAVE_TABLE: [WaveSpec; TABLE_WAVES as usize] = [
    WaveSpec::new(5, 2.0, 20, false),
    WaveSpec::new(8, 1.8, 25, false),
    WaveSpec::new(10, 1.6, 30, true),
    WaveSpec::new(12, 1.4, 35, true),
    WaveSpec::new(15, 1.2, 40, true),
    WaveSpec::new(18, 1.0, 45, true),
    WaveSpec::new(22, 0.9, 50, true),
    WaveSpec::new(25, 0.8, 55, true),
    WaveSpec::new(30, 0.7, 60, true),
    WaveSpec::new(35, 0.6, 65, true),
];

/// Composition of the wave with the provided index.
///
/// Waves past the table grow by five enemies each at a fixed cadence.
#[must_use]
pub fn wave_spec(wave: u32) -> WaveSpec {
    match WAVE_TABLE.get(wave as usize) {
        Some(spec) => *spec,
        None => WaveSpec::new(
            35u32.saturating_add((wave - (TABLE_WAVES - 1)).saturating_mul(5)),
            0.5,
            70,
            true,
        ),
    }
}

/// Whether a wave break is still running or has just ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BreakStatus {
    /// The break continues.
    Running,
    /// The break ended and the next wave has started.
    Ended,
}

/// Begins the wave after the current one and switches the match to play.
pub fn start_next_wave(world: &mut World) {
    let state = world.state_mut();
    let wave = state.current_wave.map_or(0, |wave| wave.saturating_add(1));
    state.current_wave = Some(wave);
    state.enemies_spawned_in_wave = 0;
    state.enemies_alive = 0;
    state.spawn_timer = wave_spec(wave).spawn_interval;
    state.phase = Phase::Playing;
    tracing::info!(wave, "wave started");
}

/// Moves the match straight to `wave`, restarting its spawn quota.
///
/// Enemies already on the field stay where they are.
pub fn jump_to_wave(world: &mut World, wave: u32) {
    let state = world.state_mut();
    state.current_wave = Some(wave);
    state.enemies_spawned_in_wave = 0;
    state.spawn_timer = wave_spec(wave).spawn_interval;
    state.phase = Phase::Playing;
    tracing::debug!(wave, "wave jumped");
}

/// Composition of the wave in progress, if any wave has begun.
#[must_use]
pub fn current_spec(world: &World) -> Option<WaveSpec> {
    world.state().current_wave.map(wave_spec)
}

/// Reports whether every quota enemy of the current wave has spawned.
#[must_use]
pub fn spawning_complete(world: &World) -> bool {
    current_spec(world)
        .is_some_and(|spec| world.state().enemies_spawned_in_wave >= spec.enemy_count)
}

/// Reports whether the current wave has spawned out and has no survivors.
#[must_use]
pub fn wave_cleared(world: &World) -> bool {
    spawning_complete(world) && world.state().enemies_alive == 0
}

/// Counts down the spawn timer and spawns one enemy when it expires.
///
/// Returns the identifier of the spawned enemy. Does nothing once the wave
/// quota is met or when no wave is running.
pub fn spawn_tick<R>(world: &mut World, rng: &mut R, dt: f32) -> Option<EntityId>
where
    R: Rng + ?Sized,
{
    let spec = current_spec(world)?;
    if world.state().enemies_spawned_in_wave >= spec.enemy_count {
        return None;
    }

    let state = world.state_mut();
    state.spawn_timer -= dt;
    if state.spawn_timer > 0.0 {
        return None;
    }
    state.spawn_timer = spec.spawn_interval;

    match spawn_for(world, rng, spec) {
        Ok(id) => {
            world.state_mut().enemies_spawned_in_wave += 1;
            Some(id)
        }
        Err(error) => {
            tracing::warn!(%error, "wave spawn refused");
            None
        }
    }
}

/// Spawns an enemy outside the wave quota, drawn from the current wave's
/// composition (or the first wave's before any has begun).
pub fn spawn_bonus_enemy<R>(world: &mut World, rng: &mut R) -> Result<EntityId, StoreError>
where
    R: Rng + ?Sized,
{
    let spec = current_spec(world).unwrap_or_else(|| wave_spec(0));
    spawn_for(world, rng, spec)
}

fn spawn_for<R>(world: &mut World, rng: &mut R, spec: WaveSpec) -> Result<EntityId, StoreError>
where
    R: Rng + ?Sized,
{
    let path = if spec.allow_bottom_path && rng.gen_range(0..=1) == 1 {
        PathId::Bottom
    } else {
        PathId::Top
    };
    let kind = if rng.gen_range(1..=100) <= spec.flying_chance {
        EnemyKind::Flying
    } else {
        EnemyKind::Ground
    };

    let id = world.store_mut().add(enemy::spawn(kind, path))?;
    world.state_mut().enemies_alive += 1;
    tracing::debug!(enemy = id.get(), ?kind, ?path, "enemy spawned");
    Ok(id)
}

/// Switches the match into an intermission of [`WAVE_BREAK_DURATION`].
pub fn enter_break(world: &mut World) {
    let state = world.state_mut();
    state.phase = Phase::WaveBreak;
    state.wave_break_timer = WAVE_BREAK_DURATION;
    tracing::info!(wave = ?state.current_wave, "wave cleared");
}

/// Counts down the intermission and starts the next wave when it expires or
/// the player skips it.
pub fn tick_break(world: &mut World, dt: f32, skip: bool) -> BreakStatus {
    let state = world.state_mut();
    state.wave_break_timer -= dt;
    if state.wave_break_timer > 0.0 && !skip {
        return BreakStatus::Running;
    }
    start_next_wave(world);
    BreakStatus::Ended
}

/// Resets the match, keeping towers, and begins the first wave again.
pub fn restart(world: &mut World) {
    world.reset();
    start_next_wave(world);
}

/// Moves the match to game over once lives run out.
///
/// Returns `true` when the match is over.
pub fn check_defeat(world: &mut World) -> bool {
    let state = world.state_mut();
    if state.phase == Phase::GameOver {
        return true;
    }
    if state.lives > 0 {
        return false;
    }
    state.phase = Phase::GameOver;
    tracing::info!(
        wave = ?state.current_wave,
        defeated = state.enemies_defeated,
        "match lost"
    );
    true
}
