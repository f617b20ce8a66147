//! # Actors
//!
//! The player and enemies share one record type. Health, attack and defense, plus any
//! equipped bonuses, feed the combat resolver; [`Motion`] carries the time-sliced
//! movement toward a destination cell.

use crate::{new_actor_id, resolve_heal, ActorId, DelveResult, Gear, Item, ItemSlot, Position};
use serde::{Deserialize, Serialize};

/// Which side an actor fights for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActorKind {
    Player,
    Enemy,
}

/// An in-progress move from one cell to an adjacent one.
///
/// The actor's logical position is already the destination while the motion runs,
/// so the target cell counts as occupied for everybody else.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Motion {
    pub from: Position,
    pub to: Position,
    /// Distance covered so far, in cells
    pub travelled: f32,
}

impl Motion {
    pub fn new(from: Position, to: Position) -> Self {
        Self {
            from,
            to,
            travelled: 0.0,
        }
    }

    /// Total distance of the move, in cells.
    pub fn length(&self) -> f32 {
        self.from.manhattan_distance(self.to) as f32
    }

    /// Advances the motion. Returns true once the destination is reached.
    pub fn advance(&mut self, distance: f32) -> bool {
        self.travelled = (self.travelled + distance.max(0.0)).min(self.length());
        self.is_complete()
    }

    pub fn is_complete(&self) -> bool {
        self.travelled >= self.length()
    }

    /// Fraction of the move completed, in `0.0..=1.0`.
    pub fn progress(&self) -> f32 {
        let length = self.length();
        if length <= 0.0 {
            1.0
        } else {
            self.travelled / length
        }
    }
}

/// The player or an enemy instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    pub id: ActorId,
    pub kind: ActorKind,
    /// Logical cell; during a motion this is already the destination
    pub position: Position,
    pub health: i32,
    /// Base maximum health, before equipment bonuses
    pub max_health: i32,
    /// Base attack, before equipment bonuses
    pub attack: i32,
    /// Base defense, before equipment bonuses
    pub defense: i32,
    pub alive: bool,
    /// Coins collected (only ever grows for the player)
    pub wealth: u32,
    pub motion: Option<Motion>,
    #[serde(default)]
    pub gear: Gear,
}

impl Actor {
    /// Creates a live actor at full health.
    pub fn new(
        kind: ActorKind,
        position: Position,
        max_health: i32,
        attack: i32,
        defense: i32,
    ) -> Self {
        Self {
            id: new_actor_id(),
            kind,
            position,
            health: max_health,
            max_health,
            attack,
            defense,
            alive: true,
            wealth: 0,
            motion: None,
            gear: Gear::default(),
        }
    }

    pub fn is_player(&self) -> bool {
        self.kind == ActorKind::Player
    }

    /// Actors on different sides may attack each other.
    pub fn is_hostile_to(&self, other: &Actor) -> bool {
        self.kind != other.kind
    }

    /// Whether a previous move has not yet reached its destination.
    pub fn is_moving(&self) -> bool {
        self.motion.is_some()
    }

    /// Starts moving to `to`, reserving the destination cell immediately.
    pub fn begin_move(&mut self, to: Position) {
        self.motion = Some(Motion::new(self.position, to));
        self.position = to;
    }

    /// Advances any running motion. Returns true if the actor arrived during this call.
    pub fn advance_motion(&mut self, distance: f32) -> bool {
        let arrived = match self.motion.as_mut() {
            Some(motion) => motion.advance(distance),
            None => return false,
        };
        if arrived {
            self.motion = None;
        }
        arrived
    }

    /// Interpolated position for presentation.
    pub fn render_position(&self) -> (f32, f32) {
        match &self.motion {
            Some(motion) => {
                let t = motion.progress();
                (
                    motion.from.x as f32 + (motion.to.x - motion.from.x) as f32 * t,
                    motion.from.y as f32 + (motion.to.y - motion.from.y) as f32 * t,
                )
            }
            None => (self.position.x as f32, self.position.y as f32),
        }
    }

    /// Subtracts already-resolved damage. Returns true if this blow killed the actor.
    pub fn take_damage(&mut self, damage: i32) -> bool {
        self.health -= damage.max(0);
        if self.alive && self.health <= 0 {
            self.alive = false;
            self.motion = None;
            return true;
        }
        false
    }

    /// Heals up to the effective maximum. Returns the amount actually restored.
    pub fn heal(&mut self, amount: i32) -> i32 {
        let before = self.health;
        self.health = resolve_heal(self.health, amount, self.effective_max_health());
        (self.health - before).max(0)
    }

    /// Attack power including equipped bonuses.
    pub fn total_attack(&self) -> i32 {
        self.attack + self.gear.equipment.attack_bonus()
    }

    /// Defense including equipped bonuses.
    pub fn total_defense(&self) -> i32 {
        self.defense + self.gear.equipment.defense_bonus()
    }

    /// Maximum health including equipped bonuses, never below one.
    pub fn effective_max_health(&self) -> i32 {
        (self.max_health + self.gear.equipment.health_bonus()).max(1)
    }

    /// Puts an item into the inventory. A full inventory hands it back.
    pub fn pick_up(&mut self, item: Item) -> Result<(), Item> {
        self.gear.inventory.pick_up(item)
    }

    /// Equips the inventory item at `index`, swapping out whatever shared its slot.
    pub fn equip(&mut self, index: usize) -> DelveResult<()> {
        self.gear.equip(index)?;
        self.clamp_health();
        Ok(())
    }

    /// Moves the item in `slot` back into the inventory.
    pub fn unequip(&mut self, slot: ItemSlot) -> DelveResult<()> {
        self.gear.unequip(slot)?;
        self.clamp_health();
        Ok(())
    }

    /// Losing a health bonus lowers current health to the new maximum, but never kills.
    fn clamp_health(&mut self) {
        if self.alive {
            self.health = self.health.min(self.effective_max_health());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enemy_at(x: i32, y: i32) -> Actor {
        Actor::new(ActorKind::Enemy, Position::new(x, y), 10, 10, 1)
    }

    #[test]
    fn test_damage_and_death() {
        let mut enemy = enemy_at(1, 1);
        assert!(!enemy.take_damage(4));
        assert_eq!(enemy.health, 6);
        assert!(enemy.take_damage(6));
        assert!(!enemy.alive);
        // Already dead: further blows do not report a second death
        assert!(!enemy.take_damage(3));
    }

    #[test]
    fn test_heal_clamps() {
        let mut player = Actor::new(ActorKind::Player, Position::new(0, 0), 100, 5, 2);
        player.health = 90;
        assert_eq!(player.heal(30), 10);
        assert_eq!(player.health, 100);
    }

    #[test]
    fn test_equipped_bonuses_fold_into_stats() {
        let mut player = Actor::new(ActorKind::Player, Position::new(0, 0), 100, 5, 2);
        player
            .pick_up(Item::new("Sword", ItemSlot::Sword).with_attack(3))
            .unwrap();
        player
            .pick_up(Item::new("Mail", ItemSlot::CoreArmor).with_defense(4).with_health(20))
            .unwrap();
        // Carried gear does nothing until worn
        assert_eq!(player.total_attack(), 5);

        player.equip(0).unwrap();
        player.equip(0).unwrap();
        assert_eq!(player.total_attack(), 8);
        assert_eq!(player.total_defense(), 6);
        assert_eq!(player.effective_max_health(), 120);
        assert_eq!(player.heal(50), 20);
        assert_eq!(player.health, 120);

        player.unequip(ItemSlot::CoreArmor).unwrap();
        assert_eq!(player.health, 100);
        assert_eq!(player.total_defense(), 2);
        assert_eq!(player.gear.inventory.len(), 1);
    }

    #[test]
    fn test_actor_without_gear_field_deserializes() {
        let player = Actor::new(ActorKind::Player, Position::new(3, 4), 100, 5, 2);
        let mut value = serde_json::to_value(&player).unwrap();
        value.as_object_mut().unwrap().remove("gear");
        let back: Actor = serde_json::from_value(value).unwrap();
        assert_eq!(back, player);
    }

    #[test]
    fn test_motion_reserves_destination_and_interpolates() {
        let mut enemy = enemy_at(1, 1);
        enemy.begin_move(Position::new(2, 1));
        assert_eq!(enemy.position, Position::new(2, 1));
        assert!(enemy.is_moving());

        assert!(!enemy.advance_motion(0.5));
        let (x, y) = enemy.render_position();
        assert!((x - 1.5).abs() < 1e-5);
        assert!((y - 1.0).abs() < 1e-5);

        assert!(enemy.advance_motion(0.75));
        assert!(!enemy.is_moving());
        assert_eq!(enemy.render_position(), (2.0, 1.0));
        assert!(!enemy.advance_motion(1.0));
    }

    #[test]
    fn test_hostility() {
        let player = Actor::new(ActorKind::Player, Position::new(0, 0), 100, 5, 2);
        let a = enemy_at(1, 0);
        let b = enemy_at(2, 0);
        assert!(player.is_hostile_to(&a));
        assert!(!a.is_hostile_to(&b));
    }
}
