//! Whole-game scenarios driven through the [`Game`] facade.

use crate::ability::{Ability, AbilityRequest};
use crate::error::AbilityError;
use crate::game::Game;
use crate::log::Audience;
use crate::resolver::resolve_pair;
use crate::world::Phase;

use super::helpers::*;

// =============================================================================
// Rollback
// =============================================================================

fn assert_round_trip(request: impl Fn(&Game) -> AbilityRequest) {
    let (mut game, _, _) = two_player_game();
    let before = game.world().clone();
    let request = request(&game);
    game.try_activate(&request)
        .unwrap_or_else(|err| panic!("{} should succeed: {err}", request.ability));
    assert_ne!(game.world(), &before, "{} changed nothing", request.ability);

    game.rollback().unwrap();
    assert_eq!(game.world(), &before, "{} was not fully undone", request.ability);
    assert!(game.rollback().is_err());
}

#[test]
fn rollback_restores_gold_status_and_hp() {
    init_tracing();
    assert_round_trip(|g| AbilityRequest::new("set_barrier", alice_of(g)));
    assert_round_trip(|g| AbilityRequest::new("city_protection", alice_of(g)).city("Ningbo"));
    assert_round_trip(|g| {
        AbilityRequest::new("royal_expedition", alice_of(g)).target(bob_of(g))
    });
    assert_round_trip(|g| AbilityRequest::new("keen_insight", alice_of(g)).target(bob_of(g)));
    assert_round_trip(|g| AbilityRequest::new("conjure", alice_of(g)));
}

#[test]
fn paid_rollback_consumes_the_slot() {
    let (mut game, alice, bob) = two_player_game();
    game.try_activate(&AbilityRequest::new("set_barrier", alice))
        .unwrap();
    game.try_activate(&AbilityRequest::new("rollback", bob))
        .unwrap();
    assert!(game.world().status.barrier(alice).is_none());
    assert_eq!(game.world().ledger.gold(alice), 24);
    assert_eq!(game.world().ledger.gold(bob), 24 - 11);
    assert!(!game.can_roll_back());
    assert!(game.rollback().is_err());
}

fn alice_of(game: &Game) -> crate::entity::PlayerId {
    game.world().turn_order()[0]
}

fn bob_of(game: &Game) -> crate::entity::PlayerId {
    game.world().turn_order()[1]
}

// =============================================================================
// Costs and caps
// =============================================================================

#[test]
fn usage_cap_allows_exactly_k_successes() {
    for ability in [Ability::RoyalExpedition, Ability::Conjure] {
        let cap = ability.usage_cap().unwrap();
        let (mut game, alice, bob) = two_player_game();
        let mut successes = 0;
        for _ in 0..=cap {
            let request = AbilityRequest::new(ability.name(), alice).target(bob);
            match game.try_activate(&request) {
                Ok(_) => successes += 1,
                Err(err) => assert!(
                    matches!(
                        err,
                        AbilityError::UsageCapReached { .. } | AbilityError::InsufficientGold { .. }
                    ),
                    "unexpected failure: {err}"
                ),
            }
        }
        assert_eq!(successes, cap, "{ability}");
        assert_eq!(game.world().ledger.uses(ability, alice), cap);
    }
}

#[test]
fn inflation_mark_applies_once() {
    let (mut game, alice, bob) = two_player_game();
    game.try_activate(&AbilityRequest::new("cost_inflation", bob).target(alice))
        .unwrap();
    assert_eq!(game.world().ledger.cost(Ability::RoyalExpedition, alice), 12);

    game.try_activate(&AbilityRequest::new("royal_expedition", alice).target(bob))
        .unwrap();
    assert_eq!(game.world().ledger.gold(alice), 12);
    assert!(!game.world().ledger.has_inflation_mark(alice));

    game.try_activate(&AbilityRequest::new("royal_expedition", alice).target(bob))
        .unwrap();
    assert_eq!(game.world().ledger.gold(alice), 4);
}

#[test]
fn failed_debit_leaves_everything_unchanged() {
    let (mut game, alice, _) = game_with_gold(2);
    let before = game.world().clone();
    let result = game.activate_ability(&AbilityRequest::new("set_barrier", alice));
    assert!(!result.success);
    assert!(result.public_message.contains("insufficient gold"));
    assert_eq!(game.world(), &before);
}

// =============================================================================
// Battles
// =============================================================================

#[test]
fn protection_blocks_a_whole_battle_hit() {
    let (mut world, a, b) = battle_world(&[("A1", 5000)], &[("X", 9000)]);
    let x = world.city_key_by_name(b, "X").unwrap();
    world.status.set_protection(x, 10);
    let mut next = world.clone();
    let outcome = resolve_pair(&world, &mut next, a, b).unwrap();
    assert_eq!(next.city(x).unwrap().current_hp, 9000);
    assert!(!next.status.has_protection(x));
    assert_eq!(outcome.blocked_cities, vec!["X".to_string()]);
    assert_eq!(outcome.net_damage_a_to_b, 0);
}

#[test]
fn full_round_applies_battle_and_settlement() {
    init_tracing();
    let (mut game, alice, bob) = game_with_gold(10);
    game.deploy(alice, &["Hangzhou"]).unwrap();
    game.deploy(bob, &["Wuxi"]).unwrap();

    let snapshot = game.advance_round().unwrap();
    assert_eq!(snapshot.round, 2);
    assert_eq!(snapshot.phase, Phase::AbilityWindow);

    assert_eq!(hp_of(&game, alice, "Hangzhou"), 5000);
    let wuxi = city_key(&game, bob, "Wuxi");
    assert!(!game.world().city(wuxi).unwrap().alive);
    assert_eq!(game.world().ledger.gold(alice), 13);
    assert_eq!(game.world().ledger.gold(bob), 13);

    let hangzhou = city_key(&game, alice, "Hangzhou");
    assert_eq!(game.world().player(alice).unwrap().streak(hangzhou.city), 1);
    assert!(game.world().status.is_known(bob, hangzhou));
    assert_eq!(game.world().declared_deployment(alice), &[hangzhou.city]);
    assert!(game.world().declared_deployment(bob).is_empty());

    assert!(game
        .log()
        .entries()
        .iter()
        .any(|e| e.audience == Audience::Public && e.text.contains("Wuxi")));
}

#[test]
fn mutual_center_kill_ends_with_no_winner() {
    let (mut game, alice, bob) = two_player_game();
    game.deploy(alice, &["Beijing"]).unwrap();
    game.deploy(bob, &["Shanghai"]).unwrap();
    let snapshot = game.advance_round().unwrap();
    assert_eq!(snapshot.phase, Phase::GameOver);
    assert!(snapshot.players.iter().all(|p| p.eliminated));
    assert!(game.world().teams_remaining().is_empty());
    assert!(game.advance_round().is_err());
}

#[test]
fn phase_order_is_fixed() {
    let (mut game, _, _) = two_player_game();
    let mut seen = vec![game.world().phase];
    for _ in 0..5 {
        seen.push(game.advance_phase().unwrap());
    }
    assert_eq!(
        seen,
        vec![
            Phase::AbilityWindow,
            Phase::DeploymentLocked,
            Phase::Resolving,
            Phase::Settling,
            Phase::Expiring,
            Phase::WinCheck,
        ]
    );
    assert_eq!(game.advance_phase(), Ok(Phase::AbilityWindow));
    assert_eq!(game.world().round, 2);
}

#[test]
fn barrier_expires_after_its_rounds() {
    let (mut game, alice, _) = two_player_game();
    game.try_activate(&AbilityRequest::new("set_barrier", alice))
        .unwrap();
    for _ in 0..4 {
        game.advance_round().unwrap();
        assert!(game.world().status.barrier(alice).is_some());
    }
    game.advance_round().unwrap();
    assert!(game.world().status.barrier(alice).is_none());
}

#[test]
fn view_reveals_only_what_battle_exposed() {
    let (mut game, alice, bob) = two_player_game();
    game.deploy(alice, &["Ningbo"]).unwrap();
    game.deploy(bob, &["Nanjing"]).unwrap();
    game.advance_round().unwrap();

    let view = game.view_for(alice);
    let names: Vec<_> = view.players[1]
        .cities
        .iter()
        .filter_map(|c| c.name.clone())
        .collect();
    assert_eq!(names, vec!["Nanjing".to_string()]);
}
