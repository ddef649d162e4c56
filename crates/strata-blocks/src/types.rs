use std::time::Duration;

pub type BlockId = u8;

/// Player rank. Higher ranks may do more.
pub type Rank = i32;

pub const AIR: BlockId = 0;

/// Built-in physics rules. Z is up.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum PhysicsKind {
    #[default]
    None,
    /// Drops into air below.
    Fall,
    /// Drops, otherwise slides diagonally down into air.
    FallSlide,
    /// Copies itself into air below and beside (infinite liquid).
    Spread,
    /// Moves down, otherwise to one random air cell beside (finite liquid).
    Flow,
}

impl PhysicsKind {
    pub fn from_name(s: &str) -> Option<PhysicsKind> {
        match s {
            "none" => Some(PhysicsKind::None),
            "fall" => Some(PhysicsKind::Fall),
            "fall_slide" => Some(PhysicsKind::FallSlide),
            "spread" => Some(PhysicsKind::Spread),
            "flow" => Some(PhysicsKind::Flow),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PhysicsHandler {
    Builtin(PhysicsKind),
    /// Handler registered by name with the world's hook table.
    Script(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PhysicsBehavior {
    pub delay: Duration,
    pub jitter: Duration,
    pub handler: PhysicsHandler,
    /// Re-arm after firing while the cell keeps this type.
    pub repeat: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BlockType {
    pub id: BlockId,
    pub name: String,
    pub defined: bool,
    pub physics: PhysicsKind,
    pub physics_script: Option<String>,
    pub physics_delay: Duration,
    pub physics_jitter: Duration,
    pub physics_repeat: bool,
    pub physics_on_load: bool,
    pub rank_place: Rank,
    pub rank_delete: Rank,
    pub after_delete: BlockId,
    pub replace_on_load: Option<BlockId>,
}

impl BlockType {
    pub fn undefined(id: BlockId) -> Self {
        Self {
            id,
            name: String::new(),
            ..Default::default()
        }
    }

    pub fn behavior(&self) -> Option<PhysicsBehavior> {
        let handler = match (&self.physics_script, self.physics) {
            (Some(script), _) => PhysicsHandler::Script(script.clone()),
            (None, PhysicsKind::None) => return None,
            (None, kind) => PhysicsHandler::Builtin(kind),
        };
        Some(PhysicsBehavior {
            delay: self.physics_delay,
            jitter: self.physics_jitter,
            handler,
            repeat: self.physics_repeat,
        })
    }

    #[inline]
    pub fn has_physics(&self) -> bool {
        self.physics_script.is_some() || self.physics != PhysicsKind::None
    }
}
