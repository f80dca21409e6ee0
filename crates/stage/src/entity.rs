//! Rocks, papers and scissors.

use glam::Vec2;
use quadtree::Bounds;
use rand::Rng;
use std::fmt;

/// Unique object id. Also the payload stored in the quadtrees.
pub type EntityId = u32;

/// What an object is, and therefore what it hunts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Rock,
    Paper,
    Scissor,
}

impl Kind {
    pub const ALL: [Kind; 3] = [Kind::Rock, Kind::Paper, Kind::Scissor];

    /// The kind this one converts on contact.
    #[inline]
    pub fn prey(self) -> Kind {
        match self {
            Kind::Rock => Kind::Scissor,
            Kind::Paper => Kind::Rock,
            Kind::Scissor => Kind::Paper,
        }
    }

    /// The kind that converts this one on contact.
    #[inline]
    pub fn predator(self) -> Kind {
        match self {
            Kind::Rock => Kind::Paper,
            Kind::Paper => Kind::Scissor,
            Kind::Scissor => Kind::Rock,
        }
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Kind::Rock => "rock",
            Kind::Paper => "paper",
            Kind::Scissor => "scissor",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A moving object on the stage.
#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub kind: Kind,
    /// Centre of the sprite in world coordinates.
    pub centre: Vec2,
    pub velocity: Vec2,
    pub acceleration: Vec2,
    pub width: f32,
    pub height: f32,
}

impl Entity {
    /// Create a resting object.
    pub fn new(id: EntityId, kind: Kind, centre: Vec2, width: f32, height: f32) -> Self {
        Self {
            id,
            kind,
            centre,
            velocity: Vec2::ZERO,
            acceleration: Vec2::ZERO,
            width,
            height,
        }
    }

    #[inline]
    fn half_size(&self) -> Vec2 {
        Vec2::new(self.width / 2.0, self.height / 2.0)
    }

    /// Check if the two sprite boxes overlap. Touching counts.
    pub fn collides_with(&self, other: &Entity) -> bool {
        let (min, max) = (self.centre - self.half_size(), self.centre + self.half_size());
        let (other_min, other_max) = (other.centre - other.half_size(), other.centre + other.half_size());

        !(max.x < other_min.x || min.x > other_max.x || max.y < other_min.y || min.y > other_max.y)
    }

    #[inline]
    pub fn apply_force(&mut self, force: Vec2) {
        self.acceleration += force;
    }

    /// Steering force towards `target`: desired velocity at full speed minus
    /// the current velocity, limited to `max_force`.
    pub fn seek(&self, target: Vec2, max_velocity: f32, max_force: f32) -> Vec2 {
        let desired = (target - self.centre).normalize_or_zero() * max_velocity;
        (desired - self.velocity).clamp_length_max(max_force)
    }

    #[inline]
    pub fn update_velocity(&mut self, delta_time: f32, max_velocity: f32) {
        self.velocity = (self.velocity + self.acceleration * delta_time).clamp_length_max(max_velocity);
    }

    #[inline]
    pub fn update_position(&mut self, delta_time: f32) {
        self.centre += self.velocity * delta_time;
    }

    /// Keep the whole sprite inside `border`, bouncing off the edges.
    pub fn keep_in_bounds(&mut self, border: &Bounds, restitution: f32) {
        let half = self.half_size();

        if self.centre.x - half.x < border.min_x() {
            self.centre.x = border.min_x() + half.x;
            self.velocity.x = -self.velocity.x * restitution;
        }
        if self.centre.x + half.x > border.max_x() {
            self.centre.x = border.max_x() - half.x;
            self.velocity.x = -self.velocity.x * restitution;
        }
        if self.centre.y - half.y < border.min_y() {
            self.centre.y = border.min_y() + half.y;
            self.velocity.y = -self.velocity.y * restitution;
        }
        if self.centre.y + half.y > border.max_y() {
            self.centre.y = border.max_y() - half.y;
            self.velocity.y = -self.velocity.y * restitution;
        }
    }
}

/// Random centre such that a `width` x `height` sprite fits inside `border`.
pub fn random_centre<R: Rng>(rng: &mut R, border: &Bounds, width: f32, height: f32) -> Vec2 {
    let free_x = (border.width() - width).max(0.0);
    let free_y = (border.height() - height).max(0.0);
    Vec2::new(
        border.min_x() + rng.random_range(0.0..=free_x) + width / 2.0,
        border.min_y() + rng.random_range(0.0..=free_y) + height / 2.0,
    )
}
