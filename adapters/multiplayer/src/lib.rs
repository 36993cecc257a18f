#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Two-player duels.
//!
//! A [`Duel`] runs the local match authoritatively and keeps a mirror of the
//! opponent's match that only changes through received messages and its own
//! wave progression. Successful local actions are announced the moment they
//! happen and replayed on the mirror without charging it, since the sender
//! already paid; waves advance in lockstep through a completion handshake.

use tower_duel_core::{FrameInput, GiftTier, Phase};
use tower_duel_network::{GameSnapshot, Link, Message};
use tower_duel_simulation::Simulation;
use tower_duel_system_tower::{self as tower, ClickOutcome};
use tower_duel_system_waves::{self as waves, BreakStatus};
use tower_duel_world::MatchState;

/// Seconds between two snapshots of the local match.
pub const SYNC_INTERVAL: f32 = 1.0;

const MIRROR_SEED_MIX: u64 = 0x9e37_79b9_7f4a_7c15;

/// Which side finished the current wave.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Handshake {
    /// The local match spawned out and cleared its field.
    pub local_complete: bool,
    /// The opponent reported the same.
    pub remote_complete: bool,
}

/// What happened during a single duel tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DuelReport {
    /// Outcome of the player's click, if they clicked.
    pub click: Option<ClickOutcome>,
    /// Gift bought for the opponent this tick.
    pub gift: Option<GiftTier>,
    /// Messages drained from the link.
    pub received: usize,
}

/// The local match, the opponent's mirror and the link between them.
#[derive(Debug)]
pub struct Duel<L> {
    local: Simulation,
    remote: Simulation,
    link: L,
    handshake: Handshake,
    sync_timer: f32,
    link_lost: bool,
}

impl<L: Link> Duel<L> {
    /// Starts both matches on their first wave.
    pub fn new(link: L, seed: u64) -> Self {
        let mut local = Simulation::new(seed);
        let mut remote = Simulation::new(seed ^ MIRROR_SEED_MIX);
        local.start_next_wave();
        remote.start_next_wave();
        Self {
            local,
            remote,
            link,
            handshake: Handshake::default(),
            sync_timer: 0.0,
            link_lost: false,
        }
    }

    /// The local match.
    #[must_use]
    pub fn local(&self) -> &Simulation {
        &self.local
    }

    /// Mutable access to the local match.
    pub fn local_mut(&mut self) -> &mut Simulation {
        &mut self.local
    }

    /// The mirror of the opponent's match.
    #[must_use]
    pub fn remote(&self) -> &Simulation {
        &self.remote
    }

    /// The link to the opponent.
    #[must_use]
    pub fn link(&self) -> &L {
        &self.link
    }

    /// Mutable access to the link.
    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    /// Wave completion flags of the current wave.
    #[must_use]
    pub fn handshake(&self) -> Handshake {
        self.handshake
    }

    /// Reports whether the opponent is still reachable.
    #[must_use]
    pub fn is_linked(&self) -> bool {
        self.link.is_connected()
    }

    /// Leaves the duel, telling the opponent.
    pub fn leave(&mut self) {
        self.link.close();
        self.note_link_state();
    }

    /// Advances the duel by one frame.
    ///
    /// At most one local phase handler runs per tick; a wave that ends during
    /// play starts its break countdown on the next tick.
    pub fn tick(&mut self, input: &FrameInput) -> DuelReport {
        let mut report = DuelReport::default();
        let phase = self.local.phase();

        if phase == Phase::Playing {
            self.play_local(input, &mut report);
        }
        self.advance_mirror(input.dt);
        if phase == Phase::WaveBreak {
            self.break_local(input, &mut report);
        }

        self.sync_timer += input.dt;
        if self.sync_timer >= SYNC_INTERVAL {
            self.sync_timer = 0.0;
            let _ = self.send(&Message::GameSync(snapshot(self.local.world().state())));
        }

        if let Some(tier) = input.gift {
            if self.send_gift(tier) {
                report.gift = Some(tier);
            }
        }

        report.received = self.drain_inbound();
        self.note_link_state();
        report
    }

    fn play_local(&mut self, input: &FrameInput, report: &mut DuelReport) {
        if self.local.check_defeat() {
            return;
        }
        report.click = self.click(input);

        if !waves::spawning_complete(self.local.world()) {
            let _ = self.local.spawn_tick(input.dt);
        } else if self.local.world().state().enemies_alive == 0
            && !self.handshake.local_complete
        {
            self.handshake.local_complete = true;
            let _ = self.send(&Message::WaveComplete);
        }
        if self.handshake.local_complete
            && (self.handshake.remote_complete || !self.link.is_connected())
        {
            self.local.enter_break();
        }

        let _ = self.local.update(input.dt);
    }

    fn break_local(&mut self, input: &FrameInput, report: &mut DuelReport) {
        report.click = self.click(input);
        let _ = self.local.update(input.dt);
        if self.local.tick_break(input.dt, input.confirm) == BreakStatus::Ended {
            self.handshake = Handshake::default();
            if let Some(wave) = self.local.world().state().current_wave {
                let wave = u16::try_from(wave).unwrap_or(u16::MAX);
                let _ = self.send(&Message::WaveStart { wave });
            }
        }
    }

    fn advance_mirror(&mut self, dt: f32) {
        match self.remote.phase() {
            Phase::Playing => {
                if !waves::spawning_complete(self.remote.world()) {
                    let _ = self.remote.spawn_tick(dt);
                }
                let _ = self.remote.update(dt);
            }
            Phase::WaveBreak => {
                let _ = self.remote.update(dt);
                let _ = self.remote.tick_break(dt, false);
            }
            Phase::Start | Phase::GameOver => {}
        }
    }

    fn click(&mut self, input: &FrameInput) -> Option<ClickOutcome> {
        if !input.click {
            return None;
        }
        let outcome = self.local.click(input.cursor?);
        match outcome {
            ClickOutcome::Upgraded(upgrade) => {
                match upgrade.spot.and_then(|spot| u8::try_from(spot).ok()) {
                    Some(spot) => {
                        let _ = self.send(&Message::TowerUpgrade {
                            spot,
                            level: upgrade.level,
                        });
                    }
                    None => tracing::debug!(
                        tower = upgrade.tower.get(),
                        "upgraded tower stands on no spot"
                    ),
                }
            }
            ClickOutcome::Built { spot, .. } => {
                if let Ok(spot) = u8::try_from(spot) {
                    let _ = self.send(&Message::TowerBuild { spot });
                }
            }
            ClickOutcome::UpgradeRejected(_)
            | ClickOutcome::BuildRejected { .. }
            | ClickOutcome::Ignored => {}
        }
        Some(outcome)
    }

    fn send_gift(&mut self, tier: GiftTier) -> bool {
        if self.local.phase() == Phase::GameOver {
            return false;
        }
        let money = self.local.world().state().money;
        if money < tier.cost() {
            tracing::debug!(?tier, money, "cannot afford gift");
            return false;
        }
        if !self.send(&Message::SendEnemies {
            count: tier.count(),
        }) {
            return false;
        }
        self.local.world_mut().state_mut().money -= tier.cost();
        tracing::info!(?tier, "enemies sent to opponent");
        true
    }

    fn send(&mut self, message: &Message) -> bool {
        if !self.link.is_connected() {
            return false;
        }
        match self.link.send(message) {
            Ok(()) => true,
            Err(error) => {
                tracing::warn!(%error, kind = ?message.message_type(), "message not delivered");
                false
            }
        }
    }

    fn drain_inbound(&mut self) -> usize {
        let mut received = 0;
        while let Some(envelope) = self.link.receive() {
            received += 1;
            self.apply(envelope.message);
        }
        received
    }

    fn apply(&mut self, message: Message) {
        match message {
            Message::Ping => {}
            Message::TowerBuild { spot } => {
                let placed = tower::place_tower(self.remote.world_mut(), usize::from(spot));
                if let Err(error) = placed {
                    tracing::debug!(%error, spot, "mirror build refused");
                }
            }
            Message::TowerUpgrade { spot, level } => {
                match tower::promote_spot(self.remote.world_mut(), usize::from(spot)) {
                    Ok(upgrade) if upgrade.level != level => tracing::debug!(
                        spot,
                        mirrored = ?upgrade.level,
                        reported = ?level,
                        "mirror upgrade diverged"
                    ),
                    Ok(_) => {}
                    Err(error) => tracing::debug!(%error, spot, "mirror upgrade refused"),
                }
            }
            Message::SendEnemies { count } => {
                let placed = self.local.spawn_bonus_enemies(count);
                tracing::info!(count, placed, "opponent sent enemies");
            }
            Message::WaveComplete => {
                self.handshake.remote_complete = true;
                if self.handshake.local_complete && self.local.phase() == Phase::Playing {
                    self.local.enter_break();
                }
            }
            Message::WaveStart { wave } => {
                let wave = u32::from(wave);
                if self.remote.world().state().current_wave < Some(wave) {
                    waves::jump_to_wave(self.remote.world_mut(), wave);
                }
                if self.local.phase() == Phase::WaveBreak
                    && self.local.world().state().current_wave < Some(wave)
                {
                    self.local.start_next_wave();
                    self.handshake = Handshake::default();
                }
            }
            Message::GameSync(snapshot) => {
                apply_snapshot(self.remote.world_mut().state_mut(), &snapshot);
            }
            Message::Disconnect => tracing::info!("opponent left the duel"),
        }
    }

    fn note_link_state(&mut self) {
        if !self.link_lost && !self.link.is_connected() {
            self.link_lost = true;
            tracing::warn!("link lost, continuing without the opponent");
        }
    }
}

/// Snapshot of a match as sent to the opponent.
///
/// Counters too large for the wire saturate.
#[must_use]
pub fn snapshot(state: &MatchState) -> GameSnapshot {
    GameSnapshot {
        money: state.money,
        lives: state.lives,
        wave: state
            .current_wave
            .map(|wave| u16::try_from(wave).unwrap_or(u16::MAX)),
        enemies_alive: u16::try_from(state.enemies_alive).unwrap_or(u16::MAX),
        enemies_defeated: state.enemies_defeated,
        phase: state.phase,
    }
}

/// Overwrites the mirrored counters with a received snapshot.
pub fn apply_snapshot(state: &mut MatchState, snapshot: &GameSnapshot) {
    state.money = snapshot.money;
    state.lives = snapshot.lives;
    state.current_wave = snapshot.wave.map(u32::from);
    state.enemies_alive = u32::from(snapshot.enemies_alive);
    state.enemies_defeated = snapshot.enemies_defeated;
    state.phase = snapshot.phase;
}
