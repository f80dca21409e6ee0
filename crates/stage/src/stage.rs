//! Stage state management.
//!
//! Owns every object plus one quadtree per kind, so each object can ask
//! the tree of its prey for the nearest target.

use crate::config::Config;
use crate::entity::{Entity, EntityId, Kind, random_centre};
use crate::error::StageError;
use glam::Vec2;
use quadtree::{Bounds, Point, QuadTree};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Number of objects of each kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KindCounts {
    pub rocks: usize,
    pub papers: usize,
    pub scissors: usize,
}

impl KindCounts {
    #[inline]
    pub fn get(&self, kind: Kind) -> usize {
        match kind {
            Kind::Rock => self.rocks,
            Kind::Paper => self.papers,
            Kind::Scissor => self.scissors,
        }
    }

    #[inline]
    pub fn total(&self) -> usize {
        self.rocks + self.papers + self.scissors
    }
}

/// What happened during one tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct TickReport {
    /// Objects converted to their hunter's kind.
    pub conversions: usize,
    /// Objects the index reported outside the universe.
    pub displaced: usize,
}

/// The playing field.
#[derive(Debug)]
pub struct Stage {
    config: Config,
    universe: Bounds,
    entities: HashMap<EntityId, Entity>,
    /// Spawn order; objects update in this order every tick.
    order: Vec<EntityId>,
    /// Copy of each object's indexed point, used to remove it again.
    handles: HashMap<EntityId, Point<EntityId>>,
    trees: [QuadTree<EntityId>; 3],
    next_id: EntityId,
    tick_count: u64,
    rng: StdRng,
}

impl Stage {
    /// Create the stage and spawn the configured population.
    pub fn new(config: Config) -> Result<Self, StageError> {
        let universe = Bounds::new(0.0, 0.0, config.stage.width, config.stage.height)?;
        let capacity = config.stage.capacity;
        let trees = [
            QuadTree::new(universe, capacity)?,
            QuadTree::new(universe, capacity)?,
            QuadTree::new(universe, capacity)?,
        ];
        let rng = match config.stage.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };

        let mut stage = Self {
            config,
            universe,
            entities: HashMap::new(),
            order: Vec::new(),
            handles: HashMap::new(),
            trees,
            next_id: 1,
            tick_count: 0,
            rng,
        };
        stage.populate()?;
        Ok(stage)
    }

    fn populate(&mut self) -> Result<(), StageError> {
        let per_kind = self.config.stage.objects_per_kind;
        for _ in 0..per_kind {
            for kind in Kind::ALL {
                self.spawn(kind)?;
            }
        }
        info!(
            "Stage populated with {} objects in {}x{}",
            self.entities.len(),
            self.universe.width(),
            self.universe.height()
        );
        Ok(())
    }

    fn next_id(&mut self) -> EntityId {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1).max(1);
        id
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    pub fn universe(&self) -> &Bounds {
        &self.universe
    }

    #[inline]
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    #[inline]
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    fn get(&self, id: EntityId) -> Result<&Entity, StageError> {
        self.entities.get(&id).ok_or(StageError::UnknownEntity(id))
    }

    /// All objects in update order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.order.iter().filter_map(|id| self.entities.get(id))
    }

    /// The index holding every object of `kind`.
    #[inline]
    pub fn tree(&self, kind: Kind) -> &QuadTree<EntityId> {
        &self.trees[kind.index()]
    }

    /// Indexed positions of every object of `kind`, e.g. for drawing.
    pub fn positions(&self, kind: Kind) -> Vec<(EntityId, Vec2)> {
        self.tree(kind)
            .all_points()
            .into_iter()
            .map(|point| (point.data, point.position))
            .collect()
    }

    /// Objects of any kind indexed inside `area`.
    pub fn entities_in(&self, area: &Bounds) -> Vec<EntityId> {
        self.trees
            .iter()
            .flat_map(|tree| tree.query(area))
            .map(|point| point.data)
            .collect()
    }

    pub fn counts(&self) -> KindCounts {
        KindCounts {
            rocks: self.tree(Kind::Rock).len(),
            papers: self.tree(Kind::Paper).len(),
            scissors: self.tree(Kind::Scissor).len(),
        }
    }

    /// The only kind left on the stage, if exactly one remains.
    pub fn winner(&self) -> Option<Kind> {
        let counts = self.counts();
        let mut alive = Kind::ALL.into_iter().filter(|&kind| counts.get(kind) > 0);
        match (alive.next(), alive.next()) {
            (Some(kind), None) => Some(kind),
            _ => None,
        }
    }

    /// Spawn a resting object of `kind` at a random position.
    pub fn spawn(&mut self, kind: Kind) -> Result<EntityId, StageError> {
        let (width, height) = (self.config.physics.object_width, self.config.physics.object_height);
        let centre = random_centre(&mut self.rng, &self.universe, width, height);
        self.add_object(kind, centre)
    }

    /// Add a resting object of `kind` centred on `centre`.
    pub fn add_object(&mut self, kind: Kind, centre: Vec2) -> Result<EntityId, StageError> {
        let id = self.next_id();
        self.index(id, kind, centre)?;

        let (width, height) = (self.config.physics.object_width, self.config.physics.object_height);
        self.entities.insert(id, Entity::new(id, kind, centre, width, height));
        self.order.push(id);
        Ok(id)
    }

    /// Remove an object from the stage and its index.
    pub fn remove_object(&mut self, id: EntityId) -> Result<Entity, StageError> {
        let entity = self.entities.remove(&id).ok_or(StageError::UnknownEntity(id))?;
        self.order.retain(|&other| other != id);
        self.unindex(id, entity.kind);
        Ok(entity)
    }

    /// Turn an object into `kind`, keeping its position and motion.
    pub fn replace_object(&mut self, id: EntityId, kind: Kind) -> Result<(), StageError> {
        let entity = self.get(id)?;
        let (old_kind, centre) = (entity.kind, entity.centre);
        if old_kind == kind {
            return Ok(());
        }

        self.unindex(id, old_kind);
        self.index(id, kind, centre)?;
        if let Some(entity) = self.entities.get_mut(&id) {
            entity.kind = kind;
        }
        Ok(())
    }

    fn index(&mut self, id: EntityId, kind: Kind, centre: Vec2) -> Result<(), StageError> {
        let point = Point::at(centre, id);
        let handle = point.clone();
        self.trees[kind.index()]
            .insert(point)
            .map_err(|rejected| StageError::OutsideUniverse {
                id,
                position: rejected.position,
            })?;
        self.handles.insert(id, handle);
        Ok(())
    }

    fn unindex(&mut self, id: EntityId, kind: Kind) {
        let Some(handle) = self.handles.remove(&id) else {
            warn!("Entity {} has no index handle", id);
            return;
        };
        if self.trees[kind.index()].remove(&handle).is_none() {
            warn!("Entity {} was missing from the {} index", id, kind);
        }
    }

    /// Nearest object the given object hunts, as seen by the index.
    pub fn nearest_prey(&self, id: EntityId) -> Result<Option<EntityId>, StageError> {
        let hunter = self.get(id)?;
        let prey_tree = self.tree(hunter.kind.prey());
        Ok(prey_tree
            .find_closest(hunter.width, hunter.height, hunter.centre)
            .map(|point| point.data))
    }

    /// Advance the simulation by one tick.
    pub fn update(&mut self) -> Result<TickReport, StageError> {
        self.tick_count += 1;
        let mut report = TickReport::default();

        let physics = self.config.physics.clone();
        let universe = self.universe;
        let order = self.order.clone();
        for id in order {
            report.conversions += self.apply_forces(id)?;

            if let Some(entity) = self.entities.get_mut(&id) {
                entity.update_velocity(physics.delta_time, physics.max_velocity);
                entity.update_position(physics.delta_time);
                entity.keep_in_bounds(&universe, physics.restitution);
            }
        }

        report.displaced = self.reindex();
        Ok(report)
    }

    /// Convert every touching prey, then steer towards the nearest one left.
    fn apply_forces(&mut self, id: EntityId) -> Result<usize, StageError> {
        let (max_velocity, max_force) = (self.config.physics.max_velocity, self.config.physics.max_force);
        let hunter_kind = {
            let hunter = self.entities.get_mut(&id).ok_or(StageError::UnknownEntity(id))?;
            hunter.acceleration = Vec2::ZERO;
            hunter.kind
        };

        let mut conversions = 0;
        while let Some(prey_id) = self.nearest_prey(id)? {
            let hunter = self.get(id)?;
            let prey = self.get(prey_id)?;

            if !hunter.collides_with(prey) {
                let steer = hunter.seek(prey.centre, max_velocity, max_force);
                if let Some(hunter) = self.entities.get_mut(&id) {
                    hunter.apply_force(steer);
                }
                break;
            }

            debug!("{} {} collided with {} {}", prey.kind, prey_id, hunter_kind, id);
            self.replace_object(prey_id, hunter_kind)?;
            conversions += 1;
        }
        Ok(conversions)
    }

    /// Copy current positions into the indexes and rebalance them.
    fn reindex(&mut self) -> usize {
        let entities = &self.entities;
        for tree in self.trees.iter_mut() {
            tree.for_each_point_mut(|point| {
                if let Some(entity) = entities.get(&point.data) {
                    point.position = entity.centre;
                }
            });
        }
        for (id, handle) in self.handles.iter_mut() {
            if let Some(entity) = entities.get(id) {
                handle.position = entity.centre;
            }
        }

        let mut displaced = 0;
        for kind in Kind::ALL {
            for point in self.trees[kind.index()].refresh() {
                displaced += 1;
                self.rehome(kind, point);
            }
        }
        displaced
    }

    /// Put an object that left the universe back on its edge.
    fn rehome(&mut self, kind: Kind, mut point: Point<EntityId>) {
        let id = point.data;
        let max = Vec2::new(self.universe.max_x(), self.universe.max_y());
        let clamped = point.position.clamp(self.universe.corner(), max);
        warn!("Entity {} left the universe at {}, moving it to {}", id, point.position, clamped);

        point.position = clamped;
        if let Some(entity) = self.entities.get_mut(&id) {
            entity.centre = clamped;
        }
        if let Some(handle) = self.handles.get_mut(&id) {
            handle.position = clamped;
        }
        if let Err(point) = self.trees[kind.index()].insert(point) {
            warn!("Dropping entity {}: cannot index it at {}", id, point.position);
            self.handles.remove(&id);
            self.entities.remove(&id);
            self.order.retain(|&other| other != id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(objects_per_kind: usize, seed: u64) -> Config {
        let mut config = Config::default();
        config.stage.objects_per_kind = objects_per_kind;
        config.stage.seed = Some(seed);
        config
    }

    fn is_indexed(stage: &Stage, entity: &Entity) -> bool {
        let area = Bounds::from_center(entity.centre, 0.01, 0.01).unwrap();
        stage.tree(entity.kind).query(&area).iter().any(|p| p.data == entity.id)
    }

    #[test]
    fn test_new_populates_each_kind() {
        let stage = Stage::new(config(10, 1)).unwrap();

        assert_eq!(
            stage.counts(),
            KindCounts {
                rocks: 10,
                papers: 10,
                scissors: 10
            }
        );
        assert_eq!(stage.entities().count(), 30);
        assert!(stage.entities().all(|e| is_indexed(&stage, e)));
        assert_eq!(stage.winner(), None);
    }

    #[test]
    fn test_same_seed_same_layout() {
        let a = Stage::new(config(5, 9)).unwrap();
        let b = Stage::new(config(5, 9)).unwrap();

        let layout = |stage: &Stage| stage.entities().map(|e| (e.kind, e.centre)).collect::<Vec<_>>();
        assert_eq!(layout(&a), layout(&b));
    }

    #[test]
    fn test_touching_prey_is_converted() {
        let mut stage = Stage::new(config(0, 1)).unwrap();
        let rock = stage.add_object(Kind::Rock, Vec2::new(100.0, 100.0)).unwrap();
        let scissor = stage.add_object(Kind::Scissor, Vec2::new(120.0, 100.0)).unwrap();

        let report = stage.update().unwrap();

        assert_eq!(report.conversions, 1);
        assert_eq!(stage.entity(scissor).unwrap().kind, Kind::Rock);
        assert_eq!(stage.entity(rock).unwrap().kind, Kind::Rock);
        assert_eq!(stage.counts().rocks, 2);
        assert_eq!(stage.counts().scissors, 0);
        assert_eq!(stage.winner(), Some(Kind::Rock));
        assert!(stage.entities().all(|e| is_indexed(&stage, e)));
    }

    #[test]
    fn test_hunter_steers_towards_prey() {
        let mut stage = Stage::new(config(0, 1)).unwrap();
        let paper = stage.add_object(Kind::Paper, Vec2::new(100.0, 300.0)).unwrap();
        let rock = stage.add_object(Kind::Rock, Vec2::new(500.0, 300.0)).unwrap();

        assert_eq!(stage.nearest_prey(paper).unwrap(), Some(rock));
        assert_eq!(stage.nearest_prey(rock).unwrap(), None);

        let report = stage.update().unwrap();
        assert_eq!(report.conversions, 0);

        let hunter = stage.entity(paper).unwrap();
        assert!(hunter.velocity.x > 0.0);
        assert_eq!(hunter.velocity.y, 0.0);
        assert_eq!(stage.entity(rock).unwrap().velocity, Vec2::ZERO);
    }

    #[test]
    fn test_index_follows_movement() {
        let mut stage = Stage::new(config(15, 3)).unwrap();

        for _ in 0..50 {
            let report = stage.update().unwrap();
            assert_eq!(report.displaced, 0);
        }

        assert_eq!(stage.counts().total(), 45);
        assert_eq!(stage.entities().count(), 45);
        for entity in stage.entities() {
            assert!(is_indexed(&stage, entity), "entity {} lost by the index", entity.id);
            assert!(stage.universe().contains(entity.centre));
        }
    }

    #[test]
    fn test_remove_object() {
        let mut stage = Stage::new(config(2, 4)).unwrap();
        let id = stage.entities().next().unwrap().id;

        let removed = stage.remove_object(id).unwrap();
        assert_eq!(removed.id, id);
        assert_eq!(stage.counts().total(), 5);
        assert!(matches!(stage.remove_object(id), Err(StageError::UnknownEntity(missing)) if missing == id));
    }

    #[test]
    fn test_add_outside_universe_fails() {
        let mut stage = Stage::new(config(0, 1)).unwrap();

        let result = stage.add_object(Kind::Paper, Vec2::new(-5.0, 10.0));
        assert!(matches!(result, Err(StageError::OutsideUniverse { .. })));
        assert_eq!(stage.counts().total(), 0);
        assert_eq!(stage.winner(), None);
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        let mut config = config(1, 1);
        config.stage.capacity = 0;

        assert!(matches!(Stage::new(config), Err(StageError::Index(_))));
    }

    #[test]
    fn test_escaped_entity_is_rehomed() {
        let mut stage = Stage::new(config(0, 1)).unwrap();
        let id = stage.add_object(Kind::Scissor, Vec2::new(20.0, 20.0)).unwrap();

        if let Some(entity) = stage.entities.get_mut(&id) {
            entity.centre = Vec2::new(-50.0, 20.0);
        }
        assert_eq!(stage.reindex(), 1);

        let entity = stage.entity(id).unwrap();
        assert_eq!(entity.centre, Vec2::new(0.0, 20.0));
        assert!(is_indexed(&stage, entity));
        assert_eq!(stage.positions(Kind::Scissor), vec![(id, Vec2::new(0.0, 20.0))]);
    }

    #[test]
    fn test_entities_in_area() {
        let mut stage = Stage::new(config(0, 1)).unwrap();
        let rock = stage.add_object(Kind::Rock, Vec2::new(50.0, 50.0)).unwrap();
        let paper = stage.add_object(Kind::Paper, Vec2::new(60.0, 60.0)).unwrap();
        stage.add_object(Kind::Scissor, Vec2::new(400.0, 400.0)).unwrap();

        let area = Bounds::new(0.0, 0.0, 100.0, 100.0).unwrap();
        let mut found = stage.entities_in(&area);
        found.sort_unstable();
        assert_eq!(found, vec![rock, paper]);
    }
}
