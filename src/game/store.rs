//! Authoritative room state: every player plus the one live collectible

use std::collections::HashMap;

use serde::Serialize;

use crate::ws::protocol::{Collectible, Direction, Player, PlayerId, Snapshot};

use super::collectible::CollectibleGenerator;
use super::collision::{overlaps, Arena, BoundingBox};

/// Result of a successful collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    pub player: Player,
    pub collectible: Collectible,
}

/// One scoreboard row. Equal scores share a rank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Standing {
    pub id: PlayerId,
    pub score: u32,
    pub rank: usize,
}

/// Owns all mutable game state. Every method runs to completion before the
/// next can start, which is what makes collection first-writer-wins.
pub struct EntityStore {
    arena: Arena,
    players: HashMap<PlayerId, Player>,
    collectible: Collectible,
    generator: CollectibleGenerator,
}

impl EntityStore {
    pub fn new(mut generator: CollectibleGenerator) -> Self {
        let collectible = generator.generate();
        Self {
            arena: generator.arena(),
            players: HashMap::new(),
            collectible,
            generator,
        }
    }

    pub fn collectible(&self) -> &Collectible {
        &self.collectible
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Insert a fresh player at a random spot. An existing entry under the
    /// same id is replaced.
    pub fn add_player(&mut self, id: PlayerId) -> Player {
        let (x, y) = self.generator.spawn_position();
        let player = Player { id, x, y, score: 0 };
        self.players.insert(id, player.clone());
        player
    }

    /// Returns whether a player was actually removed
    pub fn remove_player(&mut self, id: &PlayerId) -> bool {
        self.players.remove(id).is_some()
    }

    /// Step one axis and clamp to the arena. `None` for unknown ids.
    pub fn move_player(&mut self, id: &PlayerId, direction: Direction, speed: i32) -> Option<Player> {
        let arena = self.arena;
        let player = self.players.get_mut(id)?;

        let (mut x, mut y) = (player.x as i64, player.y as i64);
        let step = speed as i64;
        match direction {
            Direction::Up => y -= step,
            Direction::Down => y += step,
            Direction::Left => x -= step,
            Direction::Right => x += step,
        }

        let (x, y) = arena.clamp(x, y);
        player.x = x;
        player.y = y;
        Some(player.clone())
    }

    /// Collect the live collectible if the player overlaps it: score it and
    /// swap in a replacement. `None` leaves state untouched.
    pub fn try_collect(&mut self, id: &PlayerId) -> Option<Collection> {
        let player = self.players.get_mut(id)?;

        let hit = overlaps(
            BoundingBox::at(player.x, player.y),
            BoundingBox::at(self.collectible.x, self.collectible.y),
        );
        if !hit {
            return None;
        }

        player.score = player.score.saturating_add(self.collectible.value);
        let player = player.clone();
        self.collectible = self.generator.regenerate(&self.collectible);

        Some(Collection {
            player,
            collectible: self.collectible.clone(),
        })
    }

    /// Full state as seen by `id`
    pub fn snapshot(&self, id: PlayerId) -> Snapshot {
        Snapshot {
            id,
            players: self.players.clone(),
            collectible: self.collectible.clone(),
        }
    }

    /// Every player, best score first
    pub fn standings(&self) -> Vec<Standing> {
        let mut standings: Vec<Standing> = self
            .players
            .values()
            .map(|p| Standing {
                id: p.id,
                score: p.score,
                rank: self.rank_for_score(p.score),
            })
            .collect();

        standings.sort_by(|a, b| a.rank.cmp(&b.rank).then_with(|| a.id.cmp(&b.id)));
        standings
    }

    /// 1 + number of players strictly ahead
    fn rank_for_score(&self, score: u32) -> usize {
        1 + self.players.values().filter(|p| p.score > score).count()
    }

    #[cfg(test)]
    pub(crate) fn player(&self, id: &PlayerId) -> Option<&Player> {
        self.players.get(id)
    }

    #[cfg(test)]
    pub(crate) fn place_player(&mut self, id: &PlayerId, x: i32, y: i32) {
        if let Some(player) = self.players.get_mut(id) {
            player.x = x;
            player.y = y;
        }
    }

    #[cfg(test)]
    pub(crate) fn place_collectible(&mut self, x: i32, y: i32, value: u32) {
        self.collectible.x = x;
        self.collectible.y = y;
        self.collectible.value = value;
    }
}
