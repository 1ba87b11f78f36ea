//! Game Events
//!
//! Notable things that happened during a tick, for logging, tests and
//! replay inspection. Events never feed back into the simulation.

use serde::{Serialize, Deserialize};
use crate::core::vec2::Vec2;
use crate::game::carry::PropState;
use crate::game::environment::BodyId;

/// Priority for event processing order.
///
/// Lower value = processed first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum EventPriority {
    /// Respawns first, they invalidate everything else about the body
    Respawn = 0,
    /// Then ground contact and jumps
    Movement = 1,
    /// Then pickups, throws and settling props
    Carry = 2,
    /// Then the dance
    Dance = 3,
    /// Then world changes
    World = 4,
    /// Lowest priority
    Other = 255,
}

/// Game event data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum GameEventData {
    /// Airborne to grounded
    Landed {
        /// Vertical velocity at impact (m/s)
        impact_velocity: f32,
    },

    /// Launched by a bounce pad
    Bounced {
        /// Launch velocity (m/s)
        velocity: f32,
    },

    /// Jumped from the ground
    Jumped,

    /// Jumped in mid-air
    DoubleJumped,

    /// Entered water
    DrowningStarted,

    /// Drowned and moved back to a start point
    Respawned {
        /// Respawn position
        position: Vec2,
    },

    /// Picked up a prop
    PickedUp {
        /// Prop id
        prop: BodyId,
    },

    /// Threw a prop
    Thrown {
        /// Prop id
        prop: BodyId,
        /// Release velocity (m/s)
        velocity: Vec2,
    },

    /// Let go of a prop without throwing
    Dropped {
        /// Prop id
        prop: BodyId,
    },

    /// A loose prop settled
    PropSettled {
        /// Prop id
        prop: BodyId,
        /// Settled state
        state: PropState,
    },

    /// Dance began
    DanceStarted,

    /// Dance ended
    DanceFinished {
        /// Within the mistake allowance
        successful: bool,
        /// Mistakes made
        mistakes: u32,
    },

    /// Rain began
    RainStarted,
}

/// A game event with timing and priority.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameEvent {
    /// Tick when event occurred
    pub tick: u32,

    /// Processing priority
    pub priority: EventPriority,

    /// Body involved (for tie-breaking)
    pub body: Option<BodyId>,

    /// Event data
    pub data: GameEventData,
}

impl GameEvent {
    /// Create a new event.
    pub fn new(tick: u32, priority: EventPriority, body: Option<BodyId>, data: GameEventData) -> Self {
        Self { tick, priority, body, data }
    }

    /// Create landed event.
    pub fn landed(tick: u32, body: BodyId, impact_velocity: f32) -> Self {
        Self::new(tick, EventPriority::Movement, Some(body), GameEventData::Landed { impact_velocity })
    }

    /// Create bounced event.
    pub fn bounced(tick: u32, body: BodyId, velocity: f32) -> Self {
        Self::new(tick, EventPriority::Movement, Some(body), GameEventData::Bounced { velocity })
    }

    /// Create jump event, mid-air when `double`.
    pub fn jumped(tick: u32, body: BodyId, double: bool) -> Self {
        let data = if double { GameEventData::DoubleJumped } else { GameEventData::Jumped };
        Self::new(tick, EventPriority::Movement, Some(body), data)
    }

    /// Create drowning started event.
    pub fn drowning_started(tick: u32, body: BodyId) -> Self {
        Self::new(tick, EventPriority::Movement, Some(body), GameEventData::DrowningStarted)
    }

    /// Create respawn event.
    pub fn respawned(tick: u32, body: BodyId, position: Vec2) -> Self {
        Self::new(tick, EventPriority::Respawn, Some(body), GameEventData::Respawned { position })
    }

    /// Create pickup event.
    pub fn picked_up(tick: u32, body: BodyId, prop: BodyId) -> Self {
        Self::new(tick, EventPriority::Carry, Some(body), GameEventData::PickedUp { prop })
    }

    /// Create throw event.
    pub fn thrown(tick: u32, body: BodyId, prop: BodyId, velocity: Vec2) -> Self {
        Self::new(tick, EventPriority::Carry, Some(body), GameEventData::Thrown { prop, velocity })
    }

    /// Create drop event.
    pub fn dropped(tick: u32, body: BodyId, prop: BodyId) -> Self {
        Self::new(tick, EventPriority::Carry, Some(body), GameEventData::Dropped { prop })
    }

    /// Create prop settled event.
    pub fn prop_settled(tick: u32, prop: BodyId, state: PropState) -> Self {
        Self::new(tick, EventPriority::Carry, Some(prop), GameEventData::PropSettled { prop, state })
    }

    /// Create dance started event.
    pub fn dance_started(tick: u32, body: BodyId) -> Self {
        Self::new(tick, EventPriority::Dance, Some(body), GameEventData::DanceStarted)
    }

    /// Create dance finished event.
    pub fn dance_finished(tick: u32, body: BodyId, successful: bool, mistakes: u32) -> Self {
        Self::new(
            tick,
            EventPriority::Dance,
            Some(body),
            GameEventData::DanceFinished { successful, mistakes },
        )
    }

    /// Create rain started event.
    pub fn rain_started(tick: u32) -> Self {
        Self::new(tick, EventPriority::World, None, GameEventData::RainStarted)
    }
}

impl PartialEq for GameEvent {
    fn eq(&self, other: &Self) -> bool {
        self.tick == other.tick
            && self.priority == other.priority
            && self.body == other.body
    }
}

impl Eq for GameEvent {}

impl PartialOrd for GameEvent {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GameEvent {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Sort by: tick, then priority, then body
        self.tick
            .cmp(&other.tick)
            .then(self.priority.cmp(&other.priority))
            .then(self.body.cmp(&other.body))
    }
}
