//! Succession, elimination and game end.

use tracing::info;

use crate::entity::{CityKey, PlayerId};
use crate::error::ResolveError;
use crate::log::GameLog;
use crate::world::{Phase, World};

use super::PhaseResolver;

/// Evaluates every active player's center.
#[derive(Debug, Clone, Copy, Default)]
pub struct WinCheckResolver;

impl PhaseResolver for WinCheckResolver {
    fn phase(&self) -> Phase {
        Phase::WinCheck
    }

    fn resolve(
        &self,
        current: &World,
        next: &mut World,
        log: &mut GameLog,
    ) -> Result<(), ResolveError> {
        let round = current.round;
        for player in current.active_players() {
            if center_alive(current, player) {
                continue;
            }
            if let Some(heir) = promote_successor(next, player)? {
                log.public(
                    round,
                    format!(
                        "{} crowned {heir} as the new center",
                        current.player_name(player)
                    ),
                );
                continue;
            }
            eliminate(next, player);
            info!(%player, round, "player eliminated");
            log.public(
                round,
                format!("{} has lost their center and is eliminated", current.player_name(player)),
            );
        }

        if next.teams_remaining().len() <= 1 {
            next.phase = Phase::GameOver;
            let survivors: Vec<String> = next
                .active_players()
                .into_iter()
                .map(|p| next.player_name(p))
                .collect();
            info!(round, winners = ?survivors, "game over");
            let line = if survivors.is_empty() {
                "The game is over: no one survived".to_string()
            } else {
                format!("The game is over: {} won", survivors.join(", "))
            };
            log.public(round, line);
        }
        Ok(())
    }
}

fn center_alive(world: &World, player: PlayerId) -> bool {
    world
        .player(player)
        .and_then(|p| p.center().and_then(|id| p.city(id)))
        .is_some_and(|c| c.alive)
}

/// Makes the successor the center if it is alive. Returns its name.
fn promote_successor(next: &mut World, player: PlayerId) -> Result<Option<String>, ResolveError> {
    let Some(id) = next.status.take_successor(player) else {
        return Ok(None);
    };
    if !next.city(CityKey::new(player, id)).is_some_and(|c| c.alive) {
        return Ok(None);
    }
    let owner = next
        .player_mut(player)
        .ok_or_else(|| ResolveError::new(format!("player {player} vanished")))?;
    if !owner.set_center(id) {
        return Err(ResolveError::new(format!("successor {id} is not in {player}'s roster")));
    }
    Ok(Some(next.city_name(CityKey::new(player, id))))
}

fn eliminate(next: &mut World, player: PlayerId) {
    let ids: Vec<_> = next
        .player(player)
        .map(|p| p.cities.keys().copied().collect())
        .unwrap_or_default();
    for id in ids {
        next.destroy_city(CityKey::new(player, id));
    }
    next.set_deployment(player, Vec::new());
    if let Some(owner) = next.player_mut(player) {
        owner.eliminated = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::helpers::*;

    fn check(world: &World) -> World {
        let mut next = world.clone();
        let mut log = GameLog::new();
        WinCheckResolver.resolve(world, &mut next, &mut log).unwrap();
        next
    }

    fn with_centers(world: &mut World, a: PlayerId, b: PlayerId) -> (CityKey, CityKey) {
        let ca = world.city_key_by_name(a, "A1").unwrap();
        let cb = world.city_key_by_name(b, "B1").unwrap();
        world.player_mut(a).unwrap().set_center(ca.city);
        world.player_mut(b).unwrap().set_center(cb.city);
        (ca, cb)
    }

    #[test]
    fn living_centers_keep_game_going() {
        let (mut world, a, b) = battle_world(&[("A1", 100)], &[("B1", 100)]);
        with_centers(&mut world, a, b);
        let next = check(&world);
        assert_eq!(next.phase, world.phase);
        assert!(next.is_active(a) && next.is_active(b));
    }

    #[test]
    fn dead_center_eliminates_and_ends_game() {
        let (mut world, a, b) = battle_world(&[("A1", 100), ("A2", 500)], &[("B1", 100)]);
        let (ca, _) = with_centers(&mut world, a, b);
        world.destroy_city(ca);
        let next = check(&world);
        assert!(!next.is_active(a));
        let a2 = next.city_key_by_name(a, "A2").unwrap();
        assert!(!next.city(a2).unwrap().alive);
        assert_eq!(next.phase, Phase::GameOver);
    }

    #[test]
    fn successor_takes_over() {
        let (mut world, a, b) = battle_world(&[("A1", 100), ("A2", 500)], &[("B1", 100)]);
        let (ca, _) = with_centers(&mut world, a, b);
        let a2 = world.city_key_by_name(a, "A2").unwrap();
        world.status.set_successor(a, a2.city);
        world.destroy_city(ca);
        let next = check(&world);
        assert!(next.is_active(a));
        assert_eq!(next.player(a).unwrap().center(), Some(a2.city));
        assert!(next.city(a2).unwrap().is_center);
        assert!(next.status.successor(a).is_none());
        assert_ne!(next.phase, Phase::GameOver);
    }
}
