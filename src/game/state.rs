//! # Level Session
//!
//! [`LevelSession`] owns one level: the grid and its special tiles, the actors, the turn
//! scheduler and the collaborators that decide enemy actions and tile effects.
//!
//! The host drives it with [`LevelSession::tick`]. Every tick advances running motions,
//! then steps the turn state machine for as long as it can make progress without
//! waiting on an animation or on player input. Everything observable is reported as a
//! [`SessionEvent`].
//!
//! ## Turn flow
//!
//! 1. The player commits one intent (a step, an attack by stepping, or a skip).
//! 2. Once the player's move lands, the tile under it resolves.
//! 3. Every enemy alive at that moment takes one turn, in spawn order, one at a time.
//!    Each enemy's own move must land before the next enemy is dispatched.
//! 4. Control returns to the player.

use crate::config::MAX_STEPS_PER_TICK;
use crate::{
    attempt_step, create_rng, resolve_attack, Actor, ActorId, ActorKind, ActorTemplate,
    CellKind, DelveError, DelveResult, Direction, DungeonLayout, EncounterRules, EnemyAction,
    EnemyPolicy, GameConfig, GameStatistics, Gear, Generator, GreedyRandomPolicy, Grid,
    InputSource, Item, ItemSlot, LevelView, Placement, PlayerIntent, Position, RoomCorridorGenerator, RulesConfig,
    ScriptedInput, SessionEvent, SoftPlacementFailure, SpecialTile, SpecialTiles, StepOutcome,
    TurnScheduler, TurnSignal, TurnState, WorldQuery,
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How the current level has ended, if it has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompletionState {
    Playing,
    /// The player reached the exit with every enemy dead
    LevelComplete,
    /// The player died; the level must be restarted
    PlayerDied,
}

/// Factory hook turning spawn placements into actors.
pub trait ActorSpawner {
    /// Creates the actor a placement calls for, if any.
    fn spawn(&mut self, placement: Placement) -> Option<Actor>;
}

/// Spawns the player and enemies from fixed stat templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateSpawner {
    pub player: ActorTemplate,
    pub enemy: ActorTemplate,
}

impl TemplateSpawner {
    pub fn from_rules(rules: &RulesConfig) -> Self {
        Self {
            player: rules.player,
            enemy: rules.enemy,
        }
    }
}

impl ActorSpawner for TemplateSpawner {
    fn spawn(&mut self, placement: Placement) -> Option<Actor> {
        match placement.tile {
            SpecialTile::PlayerStart => {
                Some(self.player.spawn(ActorKind::Player, placement.position))
            }
            SpecialTile::EnemySpawn => Some(self.enemy.spawn(ActorKind::Enemy, placement.position)),
            _ => None,
        }
    }
}

/// Where the enemy currently holding the turn is within its turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemyTurnProgress {
    pub enemy: ActorId,
    /// The enemy has decided and committed its action
    pub acted: bool,
    /// The action was a move whose landing still needs tile resolution
    pub moved: bool,
}

impl EnemyTurnProgress {
    fn new(enemy: ActorId) -> Self {
        Self {
            enemy,
            acted: false,
            moved: false,
        }
    }
}

/// The simulation of one dungeon level and the run it belongs to.
pub struct LevelSession {
    config: GameConfig,
    rng: StdRng,
    generator: RoomCorridorGenerator,
    policy: Box<dyn EnemyPolicy>,
    spawner: Box<dyn ActorSpawner>,
    encounter: EncounterRules,
    level: u32,
    grid: Grid,
    placements: SpecialTiles,
    soft_failures: Vec<SoftPlacementFailure>,
    /// Actors in spawn order, which is also enemy dispatch order
    actors: Vec<Actor>,
    player_id: Option<ActorId>,
    scheduler: TurnScheduler,
    statistics: GameStatistics,
    completion: CompletionState,
    /// The player's committed move still has to land and resolve its tile
    player_landing: bool,
    enemy_turn: Option<EnemyTurnProgress>,
    pending_events: Vec<SessionEvent>,
}

impl LevelSession {
    /// Creates a session with the standard policy and spawner and generates level 1.
    pub fn new(config: GameConfig) -> DelveResult<Self> {
        let policy = Box::new(GreedyRandomPolicy::new(config.rules.greedy_threshold));
        let spawner = Box::new(TemplateSpawner::from_rules(&config.rules));
        Self::with_collaborators(config, policy, spawner)
    }

    /// Creates a session with custom collaborators and generates level 1.
    pub fn with_collaborators(
        config: GameConfig,
        policy: Box<dyn EnemyPolicy>,
        spawner: Box<dyn ActorSpawner>,
    ) -> DelveResult<Self> {
        let mut session = Self::empty(config, policy, spawner)?;
        session.generate_level()?;
        Ok(session)
    }

    /// Creates a session around an already built layout instead of generating one.
    pub fn from_layout(config: GameConfig, layout: DungeonLayout) -> DelveResult<Self> {
        let policy = Box::new(GreedyRandomPolicy::new(config.rules.greedy_threshold));
        let spawner = Box::new(TemplateSpawner::from_rules(&config.rules));
        let mut session = Self::empty(config, policy, spawner)?;
        session.on_level_generated(layout);
        Ok(session)
    }

    /// Replaces the enemy policy. Takes effect from the next enemy decision.
    pub fn with_policy(mut self, policy: Box<dyn EnemyPolicy>) -> Self {
        self.policy = policy;
        self
    }

    fn empty(
        config: GameConfig,
        policy: Box<dyn EnemyPolicy>,
        spawner: Box<dyn ActorSpawner>,
    ) -> DelveResult<Self> {
        if !(config.rules.move_speed > 0.0) {
            return Err(DelveError::InvalidState(format!(
                "move speed must be positive, got {}",
                config.rules.move_speed
            )));
        }

        Ok(Self {
            rng: StdRng::seed_from_u64(config.generation.seed),
            generator: RoomCorridorGenerator::new(),
            encounter: EncounterRules::from_rules(&config.rules),
            policy,
            spawner,
            level: 1,
            grid: Grid::new(0, 0),
            placements: SpecialTiles::new(),
            soft_failures: Vec::new(),
            actors: Vec::new(),
            player_id: None,
            scheduler: TurnScheduler::new(),
            statistics: GameStatistics::new(),
            completion: CompletionState::Playing,
            player_landing: false,
            enemy_turn: None,
            pending_events: Vec::new(),
            config,
        })
    }

    /// Generates a fresh layout for the current depth and installs it.
    ///
    /// Each level draws its own generation seed from the session RNG, so a run is
    /// reproducible from the configured seed alone. A failed generation leaves the
    /// current level untouched.
    fn generate_level(&mut self) -> DelveResult<()> {
        let mut generation = self.config.generation.clone();
        generation.seed = self.rng.gen();
        let mut rng = create_rng(&generation);
        let layout = self.generator.generate(&generation, &mut rng)?;
        let gear = self.player().map(|player| player.gear.clone());
        self.on_level_generated(layout);
        if let Some(gear) = gear {
            self.carry_gear(gear);
        }
        Ok(())
    }

    /// Hands the previous player's gear to the freshly spawned one, at full health.
    fn carry_gear(&mut self, gear: Gear) {
        if let Some(index) = self.player_index() {
            let player = &mut self.actors[index];
            player.gear = gear;
            player.health = player.effective_max_health();
        }
    }

    /// Installs a finished layout and spawns its actors.
    ///
    /// Clears every piece of per-level state first, so nothing from the previous level
    /// (pending enemy counts included) leaks into this one.
    pub fn on_level_generated(&mut self, layout: DungeonLayout) {
        self.scheduler.reset();
        self.actors.clear();
        self.player_id = None;
        self.enemy_turn = None;
        self.player_landing = false;
        self.completion = CompletionState::Playing;

        self.grid = layout.grid;
        self.placements = layout.placements;
        self.soft_failures = layout.soft_failures;

        let spawns: Vec<Placement> = self
            .placements
            .iter()
            .filter(|p| matches!(p.tile, SpecialTile::PlayerStart | SpecialTile::EnemySpawn))
            .collect();
        for placement in spawns {
            if let Some(actor) = self.spawner.spawn(placement) {
                self.on_actor_spawned(actor);
            }
        }
        if self.player_id.is_none() {
            log::warn!("Level {} has no player", self.level);
        }

        let enemies = self.living_enemy_ids().len();
        log::info!(
            "Level {} ready: {}x{} grid, {} enemies, {} soft placement failures",
            self.level,
            self.grid.width(),
            self.grid.height(),
            enemies,
            self.soft_failures.len()
        );
        self.emit(SessionEvent::LevelGenerated {
            level: self.level,
            enemies,
        });
    }

    /// Registers a spawned actor. A second player replaces the first.
    pub fn on_actor_spawned(&mut self, actor: Actor) {
        if actor.is_player() {
            if let Some(existing) = self.player_id {
                log::warn!("Replacing player {} with {}", existing, actor.id);
                self.actors.retain(|a| a.id != existing);
            }
            self.player_id = Some(actor.id);
        }
        log::debug!(
            "Spawned {:?} {} at {:?}",
            actor.kind,
            actor.id,
            actor.position
        );
        self.actors.push(actor);
    }

    /// Advances the simulation by `dt` seconds.
    ///
    /// Consumes at most one player intent per call. Returns the events produced since the
    /// previous call, including any from level generation.
    pub fn tick(
        &mut self,
        dt: f32,
        input: &mut dyn InputSource,
    ) -> DelveResult<Vec<SessionEvent>> {
        let distance = dt.max(0.0) * self.config.rules.move_speed;
        for actor in self.actors.iter_mut().filter(|a| a.alive) {
            actor.advance_motion(distance);
        }

        let mut player_acted = false;
        let mut steps = 0;
        while self.step(input, &mut player_acted) {
            steps += 1;
            if steps > MAX_STEPS_PER_TICK {
                return Err(DelveError::InvalidState(format!(
                    "turn state machine made no settled progress after {} steps (state {:?})",
                    steps,
                    self.scheduler.state()
                )));
            }
        }

        Ok(std::mem::take(&mut self.pending_events))
    }

    /// Runs one state machine step. Returns false when it has to wait.
    fn step(&mut self, input: &mut dyn InputSource, player_acted: &mut bool) -> bool {
        if self.completion != CompletionState::Playing {
            return false;
        }
        match self.scheduler.state() {
            TurnState::PlayerTurn => {
                if *player_acted {
                    return false;
                }
                *player_acted = self.player_phase(input);
                *player_acted
            }
            TurnState::ResolvingTileEffects => self.resolve_player_turn(),
            TurnState::EnemyTurnsInFlight { .. } => self.enemy_phase(),
        }
    }

    fn player_phase(&mut self, input: &mut dyn InputSource) -> bool {
        let Some(index) = self.player_index() else {
            return false;
        };
        if self.actors[index].is_moving() {
            return false;
        }
        let intent = input.next_intent(&self.view());
        let Some(intent) = intent else {
            return false;
        };

        self.scheduler.begin_tile_resolution();
        self.player_landing = match intent {
            PlayerIntent::Skip => {
                log::debug!("Player skips the turn");
                self.emit(SessionEvent::PlayerSkipped);
                false
            }
            PlayerIntent::Step(direction) => self.perform_step(index, direction),
        };
        true
    }

    /// Resolves the player's landing, then hands the turn to the enemies.
    fn resolve_player_turn(&mut self) -> bool {
        if let Some(index) = self.player_index() {
            if self.actors[index].is_moving() {
                return false;
            }
            if std::mem::take(&mut self.player_landing) {
                self.resolve_tile(index);
            } else if let Some(event) = self.encounter.check_exit(
                &self.actors,
                &self.placements,
                self.actors[index].position,
                self.level,
            ) {
                // Standing still on the exit re-checks it, so waiting there works.
                self.apply_encounter_event(event);
            }
            if self.completion != CompletionState::Playing {
                return false;
            }
        }

        let enemies = self.living_enemy_ids();
        match self.scheduler.end_player_turn(&enemies) {
            TurnSignal::PlayerTurnResumed => self.emit(SessionEvent::PlayerTurnResumed),
            TurnSignal::EnemyPhaseStarted { enemies } => {
                log::debug!("Enemy phase started for {} enemies", enemies)
            }
        }
        true
    }

    fn enemy_phase(&mut self) -> bool {
        let progress = match self.enemy_turn {
            Some(progress) => progress,
            None => {
                let enemy = match self.scheduler.dispatch_next() {
                    Some(enemy) => enemy,
                    None => match self.scheduler.acting() {
                        Some(enemy) => enemy,
                        None => return false,
                    },
                };
                let progress = EnemyTurnProgress::new(enemy);
                self.enemy_turn = Some(progress);
                progress
            }
        };

        let index = self
            .actor_index(progress.enemy)
            .filter(|&i| self.actors[i].alive);
        let Some(index) = index else {
            log::debug!("Enemy {} is gone, its turn is skipped", progress.enemy);
            return self.finish_enemy_turn(progress.enemy);
        };
        if self.actors[index].is_moving() {
            return false;
        }

        if !progress.acted {
            let moved = self.enemy_act(index);
            self.enemy_turn = Some(EnemyTurnProgress {
                acted: true,
                moved,
                ..progress
            });
            return true;
        }

        if progress.moved {
            self.resolve_tile(index);
        }
        self.finish_enemy_turn(progress.enemy)
    }

    /// Decides and commits one enemy action. Returns true if the enemy started moving.
    fn enemy_act(&mut self, index: usize) -> bool {
        let id = self.actors[index].id;
        let Some(player_index) = self.player_index() else {
            log::warn!("Enemy {} has no player to act against, turn skipped", id);
            return false;
        };
        let player_pos = self.actors[player_index].position;

        let view = LevelView::new(&self.grid, &self.placements, &self.actors);
        let action =
            self.policy
                .decide_action(&self.actors[index], player_pos, &view, &mut self.rng);
        log::debug!("Enemy {} decided {:?}", id, action);

        match action {
            EnemyAction::AttackPlayer => {
                let player = &self.actors[player_index];
                if !player.position.is_orthogonally_adjacent(self.actors[index].position) {
                    log::warn!("Enemy {} tried to attack the player out of reach", id);
                    return false;
                }
                let damage =
                    resolve_attack(self.actors[index].total_attack(), player.total_defense());
                let player_id = player.id;
                self.apply_attack(id, player_id, damage);
                false
            }
            EnemyAction::StepToward { direction, .. } | EnemyAction::StepRandom(direction) => {
                let target = self.actors[index].position.step(direction);
                if self.config.rules.enemies_avoid_traps
                    && self.placements.get(target) == Some(SpecialTile::Trap)
                {
                    self.emit(SessionEvent::ActorBlocked { actor: id });
                    return false;
                }
                self.perform_step(index, direction)
            }
        }
    }

    fn finish_enemy_turn(&mut self, enemy: ActorId) -> bool {
        self.enemy_turn = None;
        if let Some(TurnSignal::PlayerTurnResumed) = self.scheduler.enemy_finished_turn(enemy) {
            self.emit(SessionEvent::PlayerTurnResumed);
        }
        true
    }

    /// Resolves one step for `actors[index]`. Returns true if the actor started moving.
    fn perform_step(&mut self, index: usize, direction: Direction) -> bool {
        let id = self.actors[index].id;
        let outcome = attempt_step(&self.actors[index], direction, &self.view());
        match outcome {
            StepOutcome::Moved(to) => {
                self.move_actor(index, to);
                true
            }
            StepOutcome::Attacked { target, damage } => {
                let freed = self.apply_attack(id, target, damage);
                match freed {
                    Some(cell)
                        if self.actors[index].is_player() && self.config.rules.advance_on_kill =>
                    {
                        self.move_actor(index, cell);
                        true
                    }
                    _ => false,
                }
            }
            StepOutcome::Blocked => {
                log::debug!("Actor {} blocked moving {:?}", id, direction);
                self.emit(SessionEvent::ActorBlocked { actor: id });
                false
            }
        }
    }

    fn move_actor(&mut self, index: usize, to: Position) {
        let from = self.actors[index].position;
        self.actors[index].begin_move(to);
        let actor = self.actors[index].id;
        self.emit(SessionEvent::ActorMoved { actor, from, to });
    }

    /// Applies resolved damage. Returns the freed cell if the target died.
    fn apply_attack(&mut self, attacker: ActorId, target: ActorId, damage: i32) -> Option<Position> {
        let Some(index) = self.actor_index(target) else {
            log::warn!("Attack on unknown actor {}", target);
            return None;
        };

        self.emit(SessionEvent::ActorAttacked {
            attacker,
            target,
            damage,
        });
        let died = self.actors[index].take_damage(damage);
        log::debug!(
            "{} hit {} for {} ({} health left)",
            attacker,
            target,
            damage,
            self.actors[index].health
        );
        if !died {
            return None;
        }

        self.emit(SessionEvent::ActorDied {
            actor: target,
            killer: Some(attacker),
        });
        if self.actors[index].is_player() {
            self.on_player_died();
        }
        Some(self.actors[index].position)
    }

    fn resolve_tile(&mut self, index: usize) {
        let events = self.encounter.resolve(
            index,
            &mut self.actors,
            &self.grid,
            &mut self.placements,
            self.level,
            &mut self.rng,
        );
        for event in events {
            self.apply_encounter_event(event);
        }
    }

    fn apply_encounter_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::LevelComplete { level } => {
                self.completion = CompletionState::LevelComplete;
                self.emit(SessionEvent::LevelComplete { level });
            }
            SessionEvent::ActorDied { actor, .. } if Some(actor) == self.player_id => {
                self.emit(event);
                self.on_player_died();
            }
            event => self.emit(event),
        }
    }

    fn on_player_died(&mut self) {
        log::info!("Player died on level {}", self.level);
        self.completion = CompletionState::PlayerDied;
        self.emit(SessionEvent::PlayerDied);
    }

    fn emit(&mut self, event: SessionEvent) {
        self.statistics.update_from_event(&event, self.player_id);
        self.pending_events.push(event);
    }

    /// Puts an item into the player's inventory.
    ///
    /// Fails with [`DelveError::InvalidAction`] when the inventory is full or there is no
    /// live player; the item is dropped in that case.
    pub fn give_item(&mut self, item: Item) -> DelveResult<()> {
        let index = self.live_player_index()?;
        self.actors[index].pick_up(item).map_err(|item| {
            DelveError::InvalidAction(format!("inventory is full, cannot pick up {}", item.name))
        })
    }

    /// Equips the player's inventory item at `index`. Does not use up a turn.
    pub fn equip_item(&mut self, index: usize) -> DelveResult<()> {
        let player = self.live_player_index()?;
        self.actors[player].equip(index)
    }

    /// Moves the player's item in `slot` back into the inventory. Does not use up a turn.
    pub fn unequip_item(&mut self, slot: ItemSlot) -> DelveResult<()> {
        let player = self.live_player_index()?;
        self.actors[player].unequip(slot)
    }

    fn live_player_index(&self) -> DelveResult<usize> {
        self.player_index()
            .ok_or_else(|| DelveError::InvalidAction("there is no live player".to_string()))
    }

    /// Regenerates the current depth from scratch. Used after the player dies.
    pub fn restart_level(&mut self) -> DelveResult<()> {
        log::info!("Restarting level {}", self.level);
        self.generate_level()
    }

    /// Moves on to the next depth. Only valid once the level is complete.
    pub fn advance_level(&mut self) -> DelveResult<()> {
        if self.completion != CompletionState::LevelComplete {
            return Err(DelveError::InvalidState(format!(
                "level {} is not complete ({:?})",
                self.level, self.completion
            )));
        }

        self.level += 1;
        if let Err(err) = self.generate_level() {
            self.level -= 1;
            return Err(err);
        }
        Ok(())
    }

    /// Commits one intent and ticks until the session needs input again or the level
    /// ends. Frames are sized so each tick completes one cell of motion.
    pub fn play_turn(&mut self, intent: PlayerIntent) -> DelveResult<Vec<SessionEvent>> {
        if !self.is_awaiting_input() {
            return Err(DelveError::InvalidAction(format!(
                "not waiting for player input (state {:?}, {:?})",
                self.scheduler.state(),
                self.completion
            )));
        }

        let frame = 1.0 / self.config.rules.move_speed;
        let mut input = ScriptedInput::new([intent]);
        let mut events = self.tick(frame, &mut input)?;
        let mut frames = 0;
        while !self.is_settled() {
            frames += 1;
            if frames > MAX_STEPS_PER_TICK {
                return Err(DelveError::InvalidState(format!(
                    "turn did not settle after {} frames",
                    frames
                )));
            }
            events.extend(self.tick(frame, &mut input)?);
        }
        Ok(events)
    }

    fn is_settled(&self) -> bool {
        self.completion != CompletionState::Playing || self.is_awaiting_input()
    }

    /// True when the next tick with an intent available will consume it.
    pub fn is_awaiting_input(&self) -> bool {
        self.completion == CompletionState::Playing
            && self.scheduler.is_player_turn()
            && self
                .player_index()
                .map_or(false, |i| !self.actors[i].is_moving())
    }

    fn player_index(&self) -> Option<usize> {
        let id = self.player_id?;
        self.actors.iter().position(|a| a.id == id && a.alive)
    }

    fn actor_index(&self, id: ActorId) -> Option<usize> {
        self.actors.iter().position(|a| a.id == id)
    }

    fn living_enemy_ids(&self) -> Vec<ActorId> {
        self.actors
            .iter()
            .filter(|a| a.kind == ActorKind::Enemy && a.alive)
            .map(|a| a.id)
            .collect()
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn placements(&self) -> &SpecialTiles {
        &self.placements
    }

    pub fn actors(&self) -> &[Actor] {
        &self.actors
    }

    pub fn player_id(&self) -> Option<ActorId> {
        self.player_id
    }

    /// The player actor, alive or dead.
    pub fn player(&self) -> Option<&Actor> {
        let id = self.player_id?;
        self.actors.iter().find(|a| a.id == id)
    }

    pub fn living_enemies(&self) -> impl Iterator<Item = &Actor> {
        self.actors
            .iter()
            .filter(|a| a.kind == ActorKind::Enemy && a.alive)
    }

    pub fn scheduler(&self) -> &TurnScheduler {
        &self.scheduler
    }

    pub fn statistics(&self) -> &GameStatistics {
        &self.statistics
    }

    pub fn completion(&self) -> CompletionState {
        self.completion
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Tiles the generator could not place on this level.
    pub fn soft_failures(&self) -> &[SoftPlacementFailure] {
        &self.soft_failures
    }

    /// Read-only view of the level for input sources and renderers.
    pub fn view(&self) -> LevelView<'_> {
        LevelView::new(&self.grid, &self.placements, &self.actors)
    }

    /// Captures the session state for persistence.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            level: self.level,
            grid: self.grid.clone(),
            placements: self.placements.clone(),
            actors: self.actors.clone(),
            player_id: self.player_id,
            scheduler: self.scheduler.clone(),
            statistics: self.statistics.clone(),
            completion: self.completion,
            player_landing: self.player_landing,
            enemy_turn: self.enemy_turn,
        }
    }

    /// Rebuilds a session from a snapshot with the standard collaborators.
    ///
    /// The random stream is not part of the snapshot; it restarts from the configured
    /// seed mixed with the saved depth.
    pub fn restore(config: GameConfig, snapshot: SessionSnapshot) -> DelveResult<Self> {
        if let Some(id) = snapshot.player_id {
            if !snapshot.actors.iter().any(|a| a.id == id) {
                return Err(DelveError::InvalidState(format!(
                    "snapshot player {} is not among its actors",
                    id
                )));
            }
        }

        let policy = Box::new(GreedyRandomPolicy::new(config.rules.greedy_threshold));
        let spawner = Box::new(TemplateSpawner::from_rules(&config.rules));
        let mut session = Self::empty(config, policy, spawner)?;
        session.rng = StdRng::seed_from_u64(
            session.config.generation.seed ^ u64::from(snapshot.level),
        );
        session.level = snapshot.level;
        session.grid = snapshot.grid;
        session.placements = snapshot.placements;
        session.actors = snapshot.actors;
        session.player_id = snapshot.player_id;
        session.scheduler = snapshot.scheduler;
        session.statistics = snapshot.statistics;
        session.completion = snapshot.completion;
        session.player_landing = snapshot.player_landing;
        session.enemy_turn = snapshot.enemy_turn;
        Ok(session)
    }

    /// Saves the session state as JSON.
    pub fn save_to_json(&self) -> DelveResult<String> {
        self.snapshot().save_to_json()
    }

    /// Loads a session saved with [`LevelSession::save_to_json`].
    pub fn load_from_json(config: GameConfig, json: &str) -> DelveResult<Self> {
        Self::restore(config, SessionSnapshot::load_from_json(json)?)
    }
}

impl WorldQuery for LevelSession {
    fn cell(&self, pos: Position) -> CellKind {
        self.grid.kind(pos)
    }

    fn actor_at(&self, pos: Position) -> Option<&Actor> {
        self.actors
            .iter()
            .find(|actor| actor.alive && actor.position == pos)
    }

    fn special_tile(&self, pos: Position) -> Option<SpecialTile> {
        self.placements.get(pos)
    }
}

/// Serialisable state of a [`LevelSession`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub level: u32,
    pub grid: Grid,
    pub placements: SpecialTiles,
    pub actors: Vec<Actor>,
    pub player_id: Option<ActorId>,
    pub scheduler: TurnScheduler,
    pub statistics: GameStatistics,
    pub completion: CompletionState,
    pub player_landing: bool,
    pub enemy_turn: Option<EnemyTurnProgress>,
}

impl SessionSnapshot {
    pub fn save_to_json(&self) -> DelveResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load_from_json(json: &str) -> DelveResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> DelveResult<()> {
        std::fs::write(path, self.save_to_json()?)?;
        Ok(())
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> DelveResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::load_from_json(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GenerationConfig, Room};
    use std::cell::RefCell;
    use std::collections::BTreeSet;
    use std::rc::Rc;

    /// A walled room with an open interior and the given tags.
    fn room_layout(width: u32, height: u32, tags: &[(i32, i32, SpecialTile)]) -> DungeonLayout {
        let mut grid = Grid::new(width, height);
        for pos in grid.positions().collect::<Vec<_>>() {
            let kind = if grid.is_border(pos) {
                CellKind::Wall
            } else {
                CellKind::Floor
            };
            grid.set(pos, kind);
        }
        let mut placements = SpecialTiles::new();
        for &(x, y, tile) in tags {
            placements.insert(Position::new(x, y), tile);
        }
        DungeonLayout {
            grid,
            placements,
            rooms: vec![Room::new(
                0,
                Position::new(1, 1),
                width - 2,
                height - 2,
            )],
            corridors: BTreeSet::new(),
            soft_failures: Vec::new(),
        }
    }

    fn test_config() -> GameConfig {
        GameConfig {
            generation: GenerationConfig::for_testing(7),
            rules: RulesConfig::default(),
        }
    }

    fn session(tags: &[(i32, i32, SpecialTile)]) -> LevelSession {
        let mut session =
            LevelSession::from_layout(test_config(), room_layout(9, 5, tags)).unwrap();
        session.tick(0.0, &mut ScriptedInput::default()).unwrap();
        session
    }

    /// Records the order enemies are asked to act in and always bumps into a wall.
    struct RecordingPolicy {
        seen: Rc<RefCell<Vec<Position>>>,
        action: EnemyAction,
    }

    impl EnemyPolicy for RecordingPolicy {
        fn decide_action(
            &mut self,
            enemy: &Actor,
            _player_pos: Position,
            _world: &dyn WorldQuery,
            _rng: &mut StdRng,
        ) -> EnemyAction {
            self.seen.borrow_mut().push(enemy.position);
            self.action
        }
    }

    #[test]
    fn test_generated_session_spawns_actors_from_tags() {
        let mut session = LevelSession::new(test_config()).unwrap();
        let events = session.tick(0.0, &mut ScriptedInput::default()).unwrap();

        let player = session.player().unwrap();
        assert_eq!(Some(player.position), session.placements().player_start());
        let spawns = session.placements().positions_of(SpecialTile::EnemySpawn);
        assert_eq!(session.living_enemies().count(), spawns.len());
        assert!(session.is_awaiting_input());
        assert_eq!(
            events,
            vec![SessionEvent::LevelGenerated {
                level: 1,
                enemies: spawns.len()
            }]
        );
    }

    #[test]
    fn test_same_seed_generates_same_level() {
        let a = LevelSession::new(test_config()).unwrap();
        let b = LevelSession::new(test_config()).unwrap();
        assert_eq!(a.grid(), b.grid());
        assert_eq!(a.placements(), b.placements());
    }

    #[test]
    fn test_invalid_move_speed_is_rejected() {
        let mut config = test_config();
        config.rules.move_speed = 0.0;
        assert!(matches!(
            LevelSession::from_layout(config, room_layout(9, 5, &[])),
            Err(DelveError::InvalidState(_))
        ));
    }

    #[test]
    fn test_no_input_means_no_progress() {
        let mut session = session(&[(1, 1, SpecialTile::PlayerStart)]);
        for _ in 0..10 {
            let events = session.tick(0.1, &mut ScriptedInput::default()).unwrap();
            assert!(events.is_empty());
        }
        assert!(session.is_awaiting_input());
        assert_eq!(session.statistics().turns, 0);
    }

    #[test]
    fn test_one_intent_per_tick() {
        let mut session = session(&[(1, 1, SpecialTile::PlayerStart)]);
        let mut input = ScriptedInput::from_script("fff").unwrap();

        let events = session.tick(0.1, &mut input).unwrap();
        assert_eq!(
            events,
            vec![SessionEvent::PlayerSkipped, SessionEvent::PlayerTurnResumed]
        );
        assert_eq!(input.remaining(), 2);
    }

    #[test]
    fn test_player_step_waits_for_motion_before_resolving() {
        let mut session = session(&[(1, 1, SpecialTile::PlayerStart)]);
        let mut input = ScriptedInput::from_script("d").unwrap();

        // Half a cell of movement: committed but not landed
        let events = session.tick(0.1, &mut input).unwrap();
        assert!(matches!(events[0], SessionEvent::ActorMoved { .. }));
        assert_eq!(session.scheduler().state(), TurnState::ResolvingTileEffects);
        assert_eq!(session.player().unwrap().position, Position::new(2, 1));

        session.tick(0.1, &mut input).unwrap();
        session.tick(0.1, &mut input).unwrap();
        assert!(session.is_awaiting_input());
        assert_eq!(session.statistics().steps_taken, 1);
    }

    #[test]
    fn test_blocked_step_consumes_the_turn() {
        let mut session = session(&[(1, 1, SpecialTile::PlayerStart)]);
        let player = session.player().unwrap().id;

        let events = session
            .play_turn(PlayerIntent::Step(Direction::North))
            .unwrap();
        assert_eq!(
            events,
            vec![
                SessionEvent::ActorBlocked { actor: player },
                SessionEvent::PlayerTurnResumed
            ]
        );
        assert_eq!(session.player().unwrap().position, Position::new(1, 1));
        assert_eq!(session.statistics().turns, 1);
    }

    #[test]
    fn test_killing_blow_moves_player_into_the_cell() {
        let mut config = test_config();
        config.rules.enemy.max_health = 3;
        let layout = room_layout(
            9,
            5,
            &[
                (1, 1, SpecialTile::PlayerStart),
                (2, 1, SpecialTile::EnemySpawn),
            ],
        );
        let mut session = LevelSession::from_layout(config, layout).unwrap();

        let events = session.play_turn(PlayerIntent::Step(Direction::East)).unwrap();
        assert!(events
            .iter()
            .any(|e| matches!(e, SessionEvent::ActorDied { killer: Some(_), .. })));
        assert_eq!(session.player().unwrap().position, Position::new(2, 1));
        assert_eq!(session.living_enemies().count(), 0);
        assert_eq!(session.statistics().enemies_defeated, 1);
        assert_eq!(session.statistics().damage_dealt, 4);
    }

    #[test]
    fn test_non_lethal_attack_leaves_player_in_place() {
        let layout = room_layout(
            9,
            5,
            &[
                (1, 1, SpecialTile::PlayerStart),
                (2, 1, SpecialTile::EnemySpawn),
            ],
        );
        let mut session = LevelSession::from_layout(test_config(), layout).unwrap();

        let events = session.play_turn(PlayerIntent::Step(Direction::East)).unwrap();
        assert_eq!(session.player().unwrap().position, Position::new(1, 1));
        let enemy = session.living_enemies().next().unwrap();
        assert_eq!(enemy.health, 6);
        // The adjacent enemy always strikes back: 10 attack against 2 defense
        assert_eq!(session.player().unwrap().health, 92);
        assert_eq!(events.last(), Some(&SessionEvent::PlayerTurnResumed));
    }

    #[test]
    fn test_enemies_act_in_spawn_order() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let layout = room_layout(
            9,
            5,
            &[
                (6, 3, SpecialTile::EnemySpawn),
                (1, 1, SpecialTile::PlayerStart),
                (7, 1, SpecialTile::EnemySpawn),
                (3, 2, SpecialTile::EnemySpawn),
            ],
        );
        let mut session = LevelSession::from_layout(test_config(), layout)
            .unwrap()
            .with_policy(Box::new(RecordingPolicy {
                seen: Rc::clone(&seen),
                action: EnemyAction::StepRandom(Direction::North),
            }));

        session.play_turn(PlayerIntent::Skip).unwrap();
        assert_eq!(
            *seen.borrow(),
            vec![Position::new(7, 1), Position::new(3, 2), Position::new(6, 3)]
        );
        assert_eq!(session.scheduler().round(), 1);
    }

    #[test]
    fn test_enemy_moves_land_one_at_a_time() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let layout = room_layout(
            9,
            5,
            &[
                (1, 3, SpecialTile::PlayerStart),
                (4, 1, SpecialTile::EnemySpawn),
                (5, 1, SpecialTile::EnemySpawn),
            ],
        );
        let mut session = LevelSession::from_layout(test_config(), layout)
            .unwrap()
            .with_policy(Box::new(RecordingPolicy {
                seen: Rc::clone(&seen),
                action: EnemyAction::StepRandom(Direction::West),
            }));
        let mut input = ScriptedInput::from_script("f").unwrap();

        session.tick(0.0, &mut input).unwrap();
        // The first enemy is mid-move, the second has not been asked yet
        assert_eq!(*seen.borrow(), vec![Position::new(4, 1)]);
        assert_eq!(session.scheduler().pending(), 2);

        for _ in 0..10 {
            session.tick(0.2, &mut input).unwrap();
        }
        let positions: Vec<Position> = session.living_enemies().map(|e| e.position).collect();
        assert_eq!(positions, vec![Position::new(3, 1), Position::new(4, 1)]);
        assert!(session.is_awaiting_input());
    }

    #[test]
    fn test_enemy_steps_onto_trap_are_blocked() {
        let layout = room_layout(
            9,
            5,
            &[
                (1, 3, SpecialTile::PlayerStart),
                (5, 1, SpecialTile::EnemySpawn),
                (4, 1, SpecialTile::Trap),
            ],
        );
        let mut session = LevelSession::from_layout(test_config(), layout)
            .unwrap()
            .with_policy(Box::new(RecordingPolicy {
                seen: Rc::new(RefCell::new(Vec::new())),
                action: EnemyAction::StepRandom(Direction::West),
            }));

        let events = session.play_turn(PlayerIntent::Skip).unwrap();
        assert!(events
            .iter()
            .any(|e| matches!(e, SessionEvent::ActorBlocked { .. })));
        assert_eq!(
            session.living_enemies().next().unwrap().position,
            Position::new(5, 1)
        );
    }

    #[test]
    fn test_player_death_stops_the_level_until_restart() {
        let mut config = test_config();
        config.rules.player.max_health = 5;
        let layout = room_layout(
            9,
            5,
            &[
                (1, 1, SpecialTile::PlayerStart),
                (2, 1, SpecialTile::EnemySpawn),
            ],
        );
        let mut session = LevelSession::from_layout(config, layout).unwrap();

        let events = session.play_turn(PlayerIntent::Skip).unwrap();
        assert!(events.contains(&SessionEvent::PlayerDied));
        assert_eq!(session.completion(), CompletionState::PlayerDied);
        assert!(!session.is_awaiting_input());
        assert!(session.play_turn(PlayerIntent::Skip).is_err());

        let mut input = ScriptedInput::from_script("ddd").unwrap();
        assert!(session.tick(1.0, &mut input).unwrap().is_empty());
        assert_eq!(input.remaining(), 3);

        session.restart_level().unwrap();
        assert_eq!(session.completion(), CompletionState::Playing);
        assert_eq!(session.level(), 1);
        assert!(session.player().unwrap().alive);
        assert_eq!(session.statistics().deaths, 1);
    }

    #[test]
    fn test_equipped_shield_blunts_enemy_attacks() {
        let layout = room_layout(
            9,
            5,
            &[
                (1, 1, SpecialTile::PlayerStart),
                (2, 1, SpecialTile::EnemySpawn),
            ],
        );
        let mut session = LevelSession::from_layout(test_config(), layout).unwrap();
        session
            .give_item(Item::new("Tower shield", ItemSlot::Shield).with_defense(10))
            .unwrap();
        session.equip_item(0).unwrap();
        assert!(session.equip_item(0).is_err());

        let events = session.play_turn(PlayerIntent::Skip).unwrap();
        assert!(events
            .iter()
            .any(|e| matches!(e, SessionEvent::ActorAttacked { damage: 0, .. })));
        assert_eq!(session.player().unwrap().health, 100);
    }

    #[test]
    fn test_gear_survives_a_restart() {
        let mut session = session(&[(1, 1, SpecialTile::PlayerStart)]);
        session
            .give_item(Item::new("Circlet", ItemSlot::Helmet).with_health(25))
            .unwrap();
        session.equip_item(0).unwrap();
        for slot in ItemSlot::ALL {
            session.give_item(Item::new("Spare", slot)).unwrap();
        }
        assert!(matches!(
            session.give_item(Item::new("One too many", ItemSlot::Boots)),
            Err(DelveError::InvalidAction(_))
        ));

        session.restart_level().unwrap();
        let player = session.player().unwrap();
        assert_eq!(player.gear.inventory.len(), 6);
        assert_eq!(player.effective_max_health(), 125);
        assert_eq!(player.health, 125);
    }

    #[test]
    fn test_exit_completes_level_once_enemies_are_dead() {
        let layout = room_layout(
            9,
            5,
            &[
                (1, 1, SpecialTile::PlayerStart),
                (2, 1, SpecialTile::Exit),
            ],
        );
        let mut session = LevelSession::from_layout(test_config(), layout).unwrap();

        let events = session.play_turn(PlayerIntent::Step(Direction::East)).unwrap();
        assert_eq!(events.last(), Some(&SessionEvent::LevelComplete { level: 1 }));
        assert_eq!(session.completion(), CompletionState::LevelComplete);
        assert_eq!(session.statistics().levels_completed, 1);

        session.advance_level().unwrap();
        assert_eq!(session.level(), 2);
        assert_eq!(session.completion(), CompletionState::Playing);
        assert!(session.is_awaiting_input());
    }

    #[test]
    fn test_exit_stays_closed_while_enemies_live() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let layout = room_layout(
            9,
            5,
            &[
                (1, 1, SpecialTile::PlayerStart),
                (2, 1, SpecialTile::Exit),
                (7, 3, SpecialTile::EnemySpawn),
            ],
        );
        let mut session = LevelSession::from_layout(test_config(), layout)
            .unwrap()
            .with_policy(Box::new(RecordingPolicy {
                seen,
                action: EnemyAction::StepRandom(Direction::South),
            }));

        session.play_turn(PlayerIntent::Step(Direction::East)).unwrap();
        session.play_turn(PlayerIntent::Skip).unwrap();
        assert_eq!(session.completion(), CompletionState::Playing);
        assert!(matches!(
            session.advance_level(),
            Err(DelveError::InvalidState(_))
        ));
    }

    #[test]
    fn test_coin_is_collected_once() {
        let layout = room_layout(
            9,
            5,
            &[
                (1, 1, SpecialTile::PlayerStart),
                (2, 1, SpecialTile::Coin),
            ],
        );
        let mut session = LevelSession::from_layout(test_config(), layout).unwrap();

        session.play_turn(PlayerIntent::Step(Direction::East)).unwrap();
        session.play_turn(PlayerIntent::Step(Direction::West)).unwrap();
        session.play_turn(PlayerIntent::Step(Direction::East)).unwrap();

        assert_eq!(session.player().unwrap().wealth, 50);
        assert_eq!(session.statistics().coins_collected, 1);
        assert!(session.placements().get(Position::new(2, 1)).is_none());
    }

    #[test]
    fn test_trap_hurts_and_displaces_player() {
        let layout = room_layout(
            9,
            5,
            &[
                (2, 2, SpecialTile::PlayerStart),
                (3, 2, SpecialTile::Trap),
            ],
        );
        let mut session = LevelSession::from_layout(test_config(), layout).unwrap();

        let events = session.play_turn(PlayerIntent::Step(Direction::East)).unwrap();
        let player = session.player().unwrap();
        assert_eq!(player.health, 90);
        assert_ne!(player.position, Position::new(3, 2));
        assert!(player.position.is_orthogonally_adjacent(Position::new(3, 2)));
        assert!(events
            .iter()
            .any(|e| matches!(e, SessionEvent::TrapTriggered { displaced_to: Some(_), .. })));
        assert!(session.is_awaiting_input());
    }

    #[test]
    fn test_enemy_turns_without_player_finish_as_no_ops() {
        let layout = room_layout(
            9,
            5,
            &[
                (1, 1, SpecialTile::PlayerStart),
                (5, 2, SpecialTile::EnemySpawn),
                (6, 3, SpecialTile::EnemySpawn),
            ],
        );
        let session = LevelSession::from_layout(test_config(), layout).unwrap();

        // A saved mid-phase state whose player is already gone
        let mut snapshot = session.snapshot();
        let enemies: Vec<ActorId> = snapshot
            .actors
            .iter()
            .filter(|a| a.kind == ActorKind::Enemy)
            .map(|a| a.id)
            .collect();
        for actor in snapshot.actors.iter_mut().filter(|a| a.is_player()) {
            actor.alive = false;
        }
        snapshot.scheduler.begin_tile_resolution();
        snapshot.scheduler.end_player_turn(&enemies);

        let mut restored = LevelSession::restore(test_config(), snapshot).unwrap();
        let events = restored.tick(0.0, &mut ScriptedInput::default()).unwrap();
        assert_eq!(events, vec![SessionEvent::PlayerTurnResumed]);
        assert!(restored.scheduler().is_player_turn());
        assert_eq!(restored.scheduler().desync_count(), 0);
        let positions: Vec<Position> = restored.living_enemies().map(|e| e.position).collect();
        assert_eq!(positions, vec![Position::new(5, 2), Position::new(6, 3)]);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut session = LevelSession::new(test_config()).unwrap();
        session.play_turn(PlayerIntent::Skip).unwrap();

        let json = session.save_to_json().unwrap();
        let restored = LevelSession::load_from_json(test_config(), &json).unwrap();

        assert_eq!(restored.snapshot(), session.snapshot());
        assert_eq!(restored.statistics().turns, 1);
        assert!(restored.is_awaiting_input());
    }

    #[test]
    fn test_restore_rejects_unknown_player() {
        let session = session(&[(1, 1, SpecialTile::PlayerStart)]);
        let mut snapshot = session.snapshot();
        snapshot.actors.clear();
        assert!(LevelSession::restore(test_config(), snapshot).is_err());
    }
}
