use tower_duel_core::{Entity, FrameInput, GridCell, Phase};
use tower_duel_simulation::Simulation;
use tower_duel_system_waves::wave_spec;
use tower_duel_world::{query, STARTING_LIVES};

const DT: f32 = 1.0 / 30.0;
const FRAME_LIMIT: usize = 30 * 600;

fn play_until_break(simulation: &mut Simulation) {
    for _ in 0..FRAME_LIMIT {
        let _ = simulation.tick(&FrameInput::idle(DT));
        if simulation.phase() == Phase::WaveBreak {
            return;
        }
    }
    panic!("wave never resolved");
}

#[test]
fn undefended_first_wave_resolves_with_escapes() {
    let mut simulation = Simulation::new(42);
    simulation.start_next_wave();

    play_until_break(&mut simulation);

    let state = simulation.world().state();
    assert_eq!(state.enemies_spawned_in_wave, wave_spec(0).enemy_count);
    assert_eq!(state.enemies_alive, 0);
    assert_eq!(state.enemies_defeated, 0);
    assert_eq!(state.lives, STARTING_LIVES - 5);
    assert_eq!(query::enemies(simulation.world()).count(), 0);
}

#[test]
fn armed_starter_tower_defends_the_top_route() {
    let mut simulation = Simulation::new(42);
    simulation.world_mut().state_mut().money = 200;
    let report = simulation.tick(&FrameInput {
        click: true,
        cursor: Some(GridCell::new(6, 4)),
        ..FrameInput::idle(DT)
    });
    assert!(report.click.is_none(), "clicks are ignored before the match starts");

    simulation.start_next_wave();
    let report = simulation.tick(&FrameInput {
        click: true,
        cursor: Some(GridCell::new(6, 4)),
        ..FrameInput::idle(DT)
    });
    assert!(report.click.is_some());
    assert_eq!(simulation.world().state().money, 0);

    play_until_break(&mut simulation);

    let state = simulation.world().state();
    assert!(state.enemies_defeated > 0);
    assert_eq!(
        state.enemies_defeated as i32 + (STARTING_LIVES - state.lives),
        5
    );
    assert!(state.money > 0);
}

#[test]
fn break_ends_with_the_next_wave() {
    let mut simulation = Simulation::new(9);
    simulation.start_next_wave();
    play_until_break(&mut simulation);

    let _ = simulation.tick(&FrameInput {
        confirm: true,
        ..FrameInput::idle(DT)
    });

    assert_eq!(simulation.phase(), Phase::Playing);
    assert_eq!(simulation.world().state().current_wave, Some(1));
    assert_eq!(simulation.world().state().enemies_spawned_in_wave, 0);
}

#[test]
fn bonus_enemies_join_the_field() {
    let mut simulation = Simulation::new(5);
    simulation.start_next_wave();

    assert_eq!(simulation.spawn_bonus_enemies(5), 5);

    assert_eq!(simulation.world().state().enemies_alive, 5);
    assert_eq!(query::enemies(simulation.world()).count(), 5);
}

#[test]
fn shots_fired_during_an_update_wait_for_the_next_pass() {
    let mut simulation = Simulation::new(3);
    simulation.start_next_wave();
    simulation.world_mut().state_mut().money = 200;
    let cell = simulation.world().spots()[0].cell();
    let _ = simulation.click(cell);

    let tower = query::towers(simulation.world()).next().copied().expect("tower");
    let data = *tower.as_tower().expect("tower data");
    let center = data.center(tower.position);
    if let Some(armed) = simulation
        .world_mut()
        .store_mut()
        .find_mut(tower.id())
        .and_then(Entity::as_tower_mut)
    {
        armed.fire_cooldown = 0.0;
    }
    assert_eq!(simulation.spawn_bonus_enemies(1), 1);
    let target = query::enemies(simulation.world()).next().map(Entity::id).expect("enemy");
    if let Some(enemy) = simulation.world_mut().store_mut().find_mut(target) {
        enemy.position = center + glam::Vec2::new(1.5, 0.0);
    }

    let _ = simulation.update(0.1);

    let shot = query::projectiles(simulation.world()).next().copied().expect("shot");
    let flight = shot.as_projectile().expect("projectile data");
    assert_eq!(shot.position, center);
    assert_eq!(flight.current_frame, 0);
    assert_eq!(flight.frame_timer, 0.0);
    assert_eq!(flight.target, target);

    let _ = simulation.update(0.1);
    let moved = query::entity(simulation.world(), shot.id()).copied();
    assert!(moved.map_or(true, |entity| entity.position != center));
}
