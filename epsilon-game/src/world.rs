//! # World Model
//!
//! Static, read-only definition of the station: rooms and their exits, items
//! and their home rooms, puzzle flags, and the effects of using items.
//!
//! A `World` can only be obtained from `WorldBuilder::build`, which checks
//! referential integrity once: every exit target, item home, condition, take
//! precondition and use rule must name something that exists. After that the
//! engine looks identifiers up without re-validating them.

use crate::command::Direction;
use crate::error::{self, Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

define_id!(
    /// Identity of a room
    RoomId
);
define_id!(
    /// Identity of an item (distinct from its display name)
    ItemId
);
define_id!(
    /// Name of a puzzle flag
    FlagId
);

// ============================================================================
// Rooms
// ============================================================================

/// A predicate over (flags, taken-items)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    FlagSet(FlagId),
    FlagUnset(FlagId),
    Taken(ItemId),
    NotTaken(ItemId),
}

impl Condition {
    pub fn holds(&self, flags: &BTreeMap<FlagId, bool>, taken: &BTreeSet<ItemId>) -> bool {
        match self {
            Condition::FlagSet(flag) => flags.get(flag).copied().unwrap_or(false),
            Condition::FlagUnset(flag) => !flags.get(flag).copied().unwrap_or(false),
            Condition::Taken(item) => taken.contains(item),
            Condition::NotTaken(item) => !taken.contains(item),
        }
    }
}

/// An alternative room description, active when all of `when` hold
#[derive(Debug, Clone)]
pub struct DescriptionVariant {
    pub when: Vec<Condition>,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    /// Base description, used when no variant matches
    pub description: String,
    /// Checked in order; the first match wins
    pub variants: Vec<DescriptionVariant>,
    /// Exits in declaration order (the order they are listed to the player)
    pub exits: Vec<(Direction, RoomId)>,
}

impl Room {
    pub fn new(id: &str, name: &str, description: &str) -> Self {
        Self {
            id: RoomId::new(id),
            name: name.to_string(),
            description: description.to_string(),
            variants: Vec::new(),
            exits: Vec::new(),
        }
    }

    pub fn with_exit(mut self, direction: Direction, target: &str) -> Self {
        self.exits.push((direction, RoomId::new(target)));
        self
    }

    pub fn with_variant(mut self, when: Vec<Condition>, text: &str) -> Self {
        self.variants.push(DescriptionVariant {
            when,
            text: text.to_string(),
        });
        self
    }

    /// Active description: a pure function of (room, flags, taken-items)
    pub fn describe(&self, flags: &BTreeMap<FlagId, bool>, taken: &BTreeSet<ItemId>) -> &str {
        self.variants
            .iter()
            .find(|variant| variant.when.iter().all(|c| c.holds(flags, taken)))
            .map(|variant| variant.text.as_str())
            .unwrap_or(&self.description)
    }

    pub fn exit(&self, direction: Direction) -> Option<&RoomId> {
        self.exits
            .iter()
            .find(|(dir, _)| *dir == direction)
            .map(|(_, target)| target)
    }

    /// Exit labels joined for narrative output, e.g. "south, north, east"
    pub fn exit_list(&self) -> String {
        self.exits
            .iter()
            .map(|(dir, _)| dir.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

// ============================================================================
// Items
// ============================================================================

/// A flag that must be true before an item can be taken
#[derive(Debug, Clone)]
pub struct TakeCondition {
    pub flag: FlagId,
    /// Narrative returned when the flag is still false
    pub failure: String,
}

#[derive(Debug, Clone)]
pub struct Item {
    pub id: ItemId,
    /// Lowercase display name the player refers to
    pub name: String,
    pub description: String,
    /// Location before being taken
    pub home: RoomId,
    pub take_condition: Option<TakeCondition>,
    pub read_text: Option<String>,
}

impl Item {
    pub fn new(id: &str, name: &str, description: &str, home: &str) -> Self {
        Self {
            id: ItemId::new(id),
            name: name.to_string(),
            description: description.to_string(),
            home: RoomId::new(home),
            take_condition: None,
            read_text: None,
        }
    }

    pub fn requires(mut self, flag: &str, failure: &str) -> Self {
        self.take_condition = Some(TakeCondition {
            flag: FlagId::new(flag),
            failure: failure.to_string(),
        });
        self
    }

    pub fn readable(mut self, text: &str) -> Self {
        self.read_text = Some(text.to_string());
        self
    }
}

// ============================================================================
// Use effects
// ============================================================================

/// What happens when a held item is used
#[derive(Debug, Clone)]
pub enum UseEffect {
    /// Set a flag; `already` is returned when it is already true
    SetFlag {
        flag: FlagId,
        text: String,
        already: String,
    },
    /// Set the world's terminal flag (the win transition)
    Activate { text: String, already: String },
    /// Fixed narrative, no state change
    Narrate(String),
    /// Same as `read <item>`
    Read,
}

/// Effect of using `item`, either in one room or (with `room: None`) anywhere
#[derive(Debug, Clone)]
pub struct UseRule {
    pub item: ItemId,
    pub room: Option<RoomId>,
    pub effect: UseEffect,
}

// ============================================================================
// World
// ============================================================================

#[derive(Debug)]
pub struct World {
    name: String,
    start: RoomId,
    terminal_flag: FlagId,
    rooms: BTreeMap<RoomId, Room>,
    items: Vec<Item>,
    initial_flags: BTreeMap<FlagId, bool>,
    use_rules: Vec<UseRule>,
}

impl World {
    pub fn builder(name: &str) -> WorldBuilder {
        WorldBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn start(&self) -> &RoomId {
        &self.start
    }

    pub fn terminal_flag(&self) -> &FlagId {
        &self.terminal_flag
    }

    pub fn room(&self, id: &RoomId) -> Option<&Room> {
        self.rooms.get(id)
    }

    pub fn rooms(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values()
    }

    pub fn item(&self, id: &ItemId) -> Option<&Item> {
        self.items.iter().find(|item| &item.id == id)
    }

    /// Look up an item by display name (underscores count as spaces)
    pub fn item_named(&self, name: &str) -> Option<&Item> {
        let name = name.replace('_', " ");
        self.items.iter().find(|item| item.name == name)
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn initial_flags(&self) -> &BTreeMap<FlagId, bool> {
        &self.initial_flags
    }

    /// Room-specific rule first, then the item's anywhere rule
    pub fn use_rule(&self, item: &ItemId, room: &RoomId) -> Option<&UseRule> {
        self.use_rules
            .iter()
            .find(|rule| &rule.item == item && rule.room.as_ref() == Some(room))
            .or_else(|| {
                self.use_rules
                    .iter()
                    .find(|rule| &rule.item == item && rule.room.is_none())
            })
    }

    /// The built-in "Space Station Epsilon" world.
    pub fn station() -> Result<World> {
        use Direction::*;

        let lit = FlagId::new("engine_room_lit");

        World::builder("Space Station Epsilon")
            .flag("engine_room_lit", false)
            .flag("console_activated", false)
            .room(
                Room::new(
                    "airlock",
                    "Airlock",
                    "You are in the station's airlock. Emergency lights pulse red. \
                     The outer hatch is sealed shut — vacuum on the other side. \
                     A door leads into the corridor to the north.",
                )
                .with_exit(North, "corridor"),
            )
            .room(
                Room::new(
                    "corridor",
                    "Corridor",
                    "A long metal corridor stretches before you. Sparks drip from \
                     damaged ceiling panels. Doors lead to the bridge (north), \
                     engine room (east), and med bay (west). The airlock is to the south.",
                )
                .with_exit(South, "airlock")
                .with_exit(North, "bridge")
                .with_exit(East, "engine_room")
                .with_exit(West, "med_bay"),
            )
            .room(
                Room::new(
                    "bridge",
                    "Bridge",
                    "The bridge is silent. A large console dominates the center of the room. \
                     Its screen is dark — it looks like it needs a keycard to activate. \
                     The corridor is to the south.",
                )
                .with_exit(South, "corridor"),
            )
            .room(
                Room::new(
                    "engine_room",
                    "Engine Room",
                    "The flashlight reveals a massive engine core surrounded by catwalks. \
                     Under a pile of debris near the wall, you spot a glinting keycard. \
                     The corridor is back to the west.",
                )
                .with_variant(
                    vec![Condition::FlagUnset(lit.clone())],
                    "The engine room is pitch black. You can barely see anything. \
                     You hear the hum of dormant machinery. \
                     Near the entrance, you feel something on a shelf — it might be a flashlight. \
                     The corridor is back to the west.",
                )
                .with_variant(
                    vec![Condition::Taken(ItemId::new("keycard"))],
                    "The engine room is lit by your flashlight. The debris pile \
                     has been disturbed where you found the keycard. \
                     The corridor is back to the west.",
                )
                .with_exit(West, "corridor"),
            )
            .room(
                Room::new(
                    "med_bay",
                    "Med Bay",
                    "A small medical bay with overturned supply carts. \
                     A crew log sits on the counter — it might have useful information. \
                     The corridor is to the east.",
                )
                .with_variant(
                    vec![Condition::Taken(ItemId::new("crew_log"))],
                    "A small medical bay with overturned supply carts. \
                     The counter is bare — you already took the crew log. \
                     The corridor is to the east.",
                )
                .with_exit(East, "corridor"),
            )
            .item(Item::new(
                "flashlight",
                "flashlight",
                "A heavy-duty flashlight. Still has battery.",
                "engine_room",
            ))
            .item(
                Item::new(
                    "keycard",
                    "keycard",
                    "A security keycard with the captain's photo on it.",
                    "engine_room",
                )
                .requires("engine_room_lit", "It's too dark to find anything in here."),
            )
            .item(
                Item::new(
                    "crew_log",
                    "crew log",
                    "A datapad with the last crew log entry.",
                    "med_bay",
                )
                .readable(
                    "CREW LOG - Day 247: Power failure hit deck 3. Captain stashed \
                     the emergency keycard in the engine room before the lights went out. \
                     Grab a flashlight if you head in there — it's pitch black.",
                ),
            )
            .use_in(
                "flashlight",
                "engine_room",
                UseEffect::SetFlag {
                    flag: lit,
                    text: "You switch on the flashlight. The beam cuts through the darkness. \
                           You can see the engine core now — and something glinting under \
                           a pile of debris near the wall. It looks like a keycard."
                        .to_string(),
                    already: "The flashlight is already on. The room is lit.".to_string(),
                },
            )
            .use_anywhere(
                "flashlight",
                UseEffect::Narrate(
                    "You wave the flashlight around. Nothing interesting here.".to_string(),
                ),
            )
            .use_in(
                "keycard",
                "bridge",
                UseEffect::Activate {
                    text: "You slide the keycard into the console. Screens flicker to life. \
                           The station's distress beacon activates — a rescue signal pulses \
                           out into deep space."
                        .to_string(),
                    already: "The console is already active. The distress beacon keeps pulsing."
                        .to_string(),
                },
            )
            .use_anywhere(
                "keycard",
                UseEffect::Narrate("There's nothing to use the keycard on here.".to_string()),
            )
            .use_anywhere("crew_log", UseEffect::Read)
            .start("airlock")
            .terminal("console_activated")
            .build()
            .map_err(|e| e.with_operation("world::station"))
    }
}

// ============================================================================
// Builder + load-time validation
// ============================================================================

pub struct WorldBuilder {
    name: String,
    start: Option<RoomId>,
    terminal_flag: Option<FlagId>,
    rooms: Vec<Room>,
    items: Vec<Item>,
    flags: Vec<(FlagId, bool)>,
    use_rules: Vec<UseRule>,
}

impl WorldBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            start: None,
            terminal_flag: None,
            rooms: Vec::new(),
            items: Vec::new(),
            flags: Vec::new(),
            use_rules: Vec::new(),
        }
    }

    pub fn room(mut self, room: Room) -> Self {
        self.rooms.push(room);
        self
    }

    pub fn item(mut self, item: Item) -> Self {
        self.items.push(item);
        self
    }

    pub fn flag(mut self, name: &str, initial: bool) -> Self {
        self.flags.push((FlagId::new(name), initial));
        self
    }

    pub fn use_in(mut self, item: &str, room: &str, effect: UseEffect) -> Self {
        self.use_rules.push(UseRule {
            item: ItemId::new(item),
            room: Some(RoomId::new(room)),
            effect,
        });
        self
    }

    pub fn use_anywhere(mut self, item: &str, effect: UseEffect) -> Self {
        self.use_rules.push(UseRule {
            item: ItemId::new(item),
            room: None,
            effect,
        });
        self
    }

    pub fn start(mut self, room: &str) -> Self {
        self.start = Some(RoomId::new(room));
        self
    }

    pub fn terminal(mut self, flag: &str) -> Self {
        self.terminal_flag = Some(FlagId::new(flag));
        self
    }

    /// Validate referential integrity and freeze the world
    pub fn build(self) -> Result<World> {
        let mut rooms = BTreeMap::new();
        for room in self.rooms {
            if rooms.contains_key(&room.id) {
                return Err(error::duplicate("room", room.id.as_str()));
            }
            rooms.insert(room.id.clone(), room);
        }

        let mut initial_flags = BTreeMap::new();
        for (flag, value) in self.flags {
            if initial_flags.insert(flag.clone(), value).is_some() {
                return Err(error::duplicate("flag", flag.as_str()));
            }
        }

        let mut item_ids = HashSet::new();
        let mut item_names = HashSet::new();
        for item in &self.items {
            if !item_ids.insert(item.id.clone()) {
                return Err(error::duplicate("item", item.id.as_str()));
            }
            if !item_names.insert(item.name.clone()) {
                return Err(error::duplicate("item name", item.name.as_str()));
            }
            if !rooms.contains_key(&item.home) {
                return Err(error::dangling_home(item.id.as_str(), item.home.as_str()));
            }
            if let Some(cond) = &item.take_condition {
                if !initial_flags.contains_key(&cond.flag) {
                    return Err(error::undeclared_flag(
                        cond.flag.as_str(),
                        format!("item {}", item.id),
                    ));
                }
            }
        }

        for room in rooms.values() {
            let mut seen = HashSet::new();
            for (direction, target) in &room.exits {
                if !seen.insert(*direction) {
                    return Err(error::duplicate("exit", format!("{} {}", room.id, direction)));
                }
                if !rooms.contains_key(target) {
                    return Err(error::dangling_exit(
                        room.id.as_str(),
                        direction.as_str(),
                        target.as_str(),
                    ));
                }
            }
            for variant in &room.variants {
                for condition in &variant.when {
                    check_condition(condition, &initial_flags, &item_ids, &room.id)?;
                }
            }
        }

        for rule in &self.use_rules {
            if !item_ids.contains(&rule.item) {
                return Err(error::dangling_item(rule.item.as_str(), "use rule"));
            }
            if let Some(room) = &rule.room {
                if !rooms.contains_key(room) {
                    return Err(Error::room_not_found(room.as_str())
                        .with_operation("world::validate")
                        .with_context("item", rule.item.as_str()));
                }
            }
            if let UseEffect::SetFlag { flag, .. } = &rule.effect {
                if !initial_flags.contains_key(flag) {
                    return Err(error::undeclared_flag(
                        flag.as_str(),
                        format!("use rule for {}", rule.item),
                    ));
                }
            }
        }

        let start = self
            .start
            .ok_or_else(|| Error::world_invalid("no start room").with_operation("world::validate"))?;
        if !rooms.contains_key(&start) {
            return Err(Error::room_not_found(start.as_str())
                .with_operation("world::validate")
                .with_context("role", "start"));
        }

        let terminal_flag = self.terminal_flag.ok_or_else(|| {
            Error::world_invalid("no terminal flag").with_operation("world::validate")
        })?;
        if !initial_flags.contains_key(&terminal_flag) {
            return Err(error::undeclared_flag(terminal_flag.as_str(), "terminal"));
        }
        if initial_flags.get(&terminal_flag).copied().unwrap_or(false) {
            return Err(Error::world_invalid("terminal flag must start false")
                .with_operation("world::validate")
                .with_context("flag", terminal_flag.as_str()));
        }
        // Only an Activate effect may flip the terminal flag.
        for rule in &self.use_rules {
            if let UseEffect::SetFlag { flag, .. } = &rule.effect {
                if *flag == terminal_flag {
                    return Err(Error::world_invalid("terminal flag set by a plain flag effect")
                        .with_operation("world::validate")
                        .with_context("item", rule.item.as_str()));
                }
            }
        }

        Ok(World {
            name: self.name,
            start,
            terminal_flag,
            rooms,
            items: self.items,
            initial_flags,
            use_rules: self.use_rules,
        })
    }
}

fn check_condition(
    condition: &Condition,
    flags: &BTreeMap<FlagId, bool>,
    items: &HashSet<ItemId>,
    room: &RoomId,
) -> Result<()> {
    match condition {
        Condition::FlagSet(flag) | Condition::FlagUnset(flag) => {
            if !flags.contains_key(flag) {
                return Err(error::undeclared_flag(flag.as_str(), format!("room {}", room)));
            }
        }
        Condition::Taken(item) | Condition::NotTaken(item) => {
            if !items.contains(item) {
                return Err(error::dangling_item(item.as_str(), format!("room {}", room)));
            }
        }
    }
    Ok(())
}
