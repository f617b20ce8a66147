//! # Equipment
//!
//! Wearable items, the six equipment slots and the carried inventory. Bonuses of
//! equipped items fold into an actor's attack, defense and maximum health; carried
//! items do nothing until equipped.

use crate::{config::INVENTORY_CAPACITY, DelveError, DelveResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Where an item is worn. Each slot holds at most one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ItemSlot {
    Helmet,
    CoreArmor,
    Hands,
    Boots,
    Sword,
    Shield,
}

impl ItemSlot {
    pub const ALL: [ItemSlot; 6] = [
        ItemSlot::Helmet,
        ItemSlot::CoreArmor,
        ItemSlot::Hands,
        ItemSlot::Boots,
        ItemSlot::Sword,
        ItemSlot::Shield,
    ];
}

/// A piece of gear with flat stat bonuses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
    pub slot: ItemSlot,
    #[serde(default)]
    pub attack_bonus: i32,
    #[serde(default)]
    pub defense_bonus: i32,
    #[serde(default)]
    pub health_bonus: i32,
}

impl Item {
    /// Creates an item with no bonuses.
    ///
    /// # Examples
    ///
    /// ```
    /// use delve::{Item, ItemSlot};
    ///
    /// let sword = Item::new("Short sword", ItemSlot::Sword).with_attack(3);
    /// assert_eq!(sword.attack_bonus, 3);
    /// assert_eq!(sword.defense_bonus, 0);
    /// ```
    pub fn new(name: impl Into<String>, slot: ItemSlot) -> Self {
        Self {
            name: name.into(),
            slot,
            attack_bonus: 0,
            defense_bonus: 0,
            health_bonus: 0,
        }
    }

    pub fn with_attack(mut self, bonus: i32) -> Self {
        self.attack_bonus = bonus;
        self
    }

    pub fn with_defense(mut self, bonus: i32) -> Self {
        self.defense_bonus = bonus;
        self
    }

    pub fn with_health(mut self, bonus: i32) -> Self {
        self.health_bonus = bonus;
        self
    }
}

/// Items currently worn, one per slot. Serialised as a plain list of items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Item>", into = "Vec<Item>")]
pub struct Equipment {
    slots: BTreeMap<ItemSlot, Item>,
}

impl From<Vec<Item>> for Equipment {
    fn from(items: Vec<Item>) -> Self {
        let mut equipment = Self::new();
        for item in items {
            equipment.equip(item);
        }
        equipment
    }
}

impl From<Equipment> for Vec<Item> {
    fn from(equipment: Equipment) -> Self {
        equipment.slots.into_values().collect()
    }
}

impl Equipment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wears `item` in its slot. Returns whatever was worn there before.
    pub fn equip(&mut self, item: Item) -> Option<Item> {
        self.slots.insert(item.slot, item)
    }

    /// Takes the item out of `slot`, if any.
    pub fn unequip(&mut self, slot: ItemSlot) -> Option<Item> {
        self.slots.remove(&slot)
    }

    pub fn get(&self, slot: ItemSlot) -> Option<&Item> {
        self.slots.get(&slot)
    }

    /// Worn items in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.slots.values()
    }

    pub fn attack_bonus(&self) -> i32 {
        self.iter().map(|item| item.attack_bonus).sum()
    }

    pub fn defense_bonus(&self) -> i32 {
        self.iter().map(|item| item.defense_bonus).sum()
    }

    pub fn health_bonus(&self) -> i32 {
        self.iter().map(|item| item.health_bonus).sum()
    }
}

/// Carried, unequipped items in pickup order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    items: Vec<Item>,
    capacity: usize,
}

impl Inventory {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: Vec::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Adds an item. A full inventory hands the item back unchanged.
    pub fn pick_up(&mut self, item: Item) -> Result<(), Item> {
        if self.is_full() {
            return Err(item);
        }
        self.items.push(item);
        Ok(())
    }

    /// Removes and returns the item at `index`.
    pub fn remove(&mut self, index: usize) -> Option<Item> {
        if index < self.items.len() {
            Some(self.items.remove(index))
        } else {
            None
        }
    }
}

impl Default for Inventory {
    fn default() -> Self {
        Self::new(INVENTORY_CAPACITY)
    }
}

/// Everything an actor carries or wears.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Gear {
    pub inventory: Inventory,
    pub equipment: Equipment,
}

impl Gear {
    /// Moves the inventory item at `index` into its slot. The item it replaces goes
    /// back into the inventory, which always has room since `index` was just freed.
    pub fn equip(&mut self, index: usize) -> DelveResult<&Item> {
        let item = self.inventory.remove(index).ok_or_else(|| {
            DelveError::InvalidAction(format!(
                "no inventory item at index {} ({} carried)",
                index,
                self.inventory.len()
            ))
        })?;
        let slot = item.slot;
        log::debug!("Equipping {} as {:?}", item.name, slot);
        if let Some(previous) = self.equipment.equip(item) {
            self.inventory.items.push(previous);
        }
        self.equipment.get(slot).ok_or_else(|| {
            DelveError::InvalidState(format!("{:?} slot empty right after equipping", slot))
        })
    }

    /// Moves the item worn in `slot` back into the inventory.
    pub fn unequip(&mut self, slot: ItemSlot) -> DelveResult<()> {
        if self.equipment.get(slot).is_none() {
            return Err(DelveError::InvalidAction(format!(
                "nothing is equipped as {:?}",
                slot
            )));
        }
        if self.inventory.is_full() {
            return Err(DelveError::InvalidAction(format!(
                "inventory is full, cannot unequip {:?}",
                slot
            )));
        }
        if let Some(item) = self.equipment.unequip(slot) {
            log::debug!("Unequipped {} from {:?}", item.name, slot);
            self.inventory.items.push(item);
        }
        Ok(())
    }
}
