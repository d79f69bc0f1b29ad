use std::collections::HashMap;

use crate::models::*;

/// Run every aggregation pass over a parsed session and bundle the results.
pub fn build_analysis(session: CombatSession) -> CombatAnalysis {
    let player_stats = calculate_player_stats(&session.events);
    let item_usage = calculate_item_usage(&session.events);
    let stamina_stats = calculate_stamina_stats(&session.events);
    let timeline = build_timeline(&session.events);

    CombatAnalysis {
        session,
        player_stats,
        item_usage,
        timeline,
        stamina_stats,
    }
}

/// Fold the event sequence into per-player statistics.
///
/// Accumulators exist only for players seen as an actor. A target that
/// never acts has no accumulator and gets no damage-taken credit; stored
/// sessions rely on that behavior, so it stays.
pub fn calculate_player_stats(events: &[CombatEvent]) -> Vec<PlayerStats> {
    let mut stats: Vec<PlayerStats> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for event in events {
        if !index.contains_key(event.player.as_str()) {
            index.insert(event.player.as_str(), stats.len());
            stats.push(PlayerStats::new(event.player.clone()));
        }
    }

    for event in events {
        let value = event.value.unwrap_or(0);
        let actor = index[event.player.as_str()];

        match event.action {
            ActionKind::Damage => {
                stats[actor].total_damage += value;
                if event.is_critical == Some(true) {
                    stats[actor].critical_hits += 1;
                }
                if let Some(target) = event.target.as_deref() {
                    if let Some(&t) = index.get(target) {
                        stats[t].damage_taken += value;
                    }
                }
            }
            ActionKind::Healing => stats[actor].total_healing += value,
            ActionKind::Armor => stats[actor].total_armor_gained += value,
            ActionKind::Burn | ActionKind::Blind | ActionKind::Stun => {
                stats[actor].status_effects_applied += 1;
                if let Some(target) = event.target.as_deref() {
                    if let Some(&t) = index.get(target) {
                        stats[t].status_effects_received += 1;
                    }
                }
            }
            ActionKind::Miss => stats[actor].missed_attacks += 1,
            // Thorns reflect onto the actor itself
            ActionKind::ThornsDamage => stats[actor].damage_taken += value,
            _ => {}
        }
    }

    stats
}

/// Fold the event sequence into per-player, per-item usage counters.
/// Mechanic pseudo-items are not items and are skipped entirely.
pub fn calculate_item_usage(events: &[CombatEvent]) -> Vec<PlayerItemStats> {
    let mut players: Vec<PlayerItemStats> = Vec::new();
    let mut player_index: HashMap<&str, usize> = HashMap::new();
    // Composite key keeps first-seen item order per player
    let mut item_index: HashMap<(usize, &str), usize> = HashMap::new();

    for event in events {
        if event.item.ends_with(MECHANIC_SUFFIX) {
            continue;
        }

        let p = *player_index.entry(event.player.as_str()).or_insert_with(|| {
            players.push(PlayerItemStats {
                player_name: event.player.clone(),
                items: Vec::new(),
            });
            players.len() - 1
        });

        let i = *item_index.entry((p, event.item.as_str())).or_insert_with(|| {
            players[p].items.push(ItemUsage {
                item_name: event.item.clone(),
                usage_count: 0,
                total_damage: 0,
                total_healing: 0,
            });
            players[p].items.len() - 1
        });

        let usage = &mut players[p].items[i];
        usage.usage_count += 1;

        let value = event.value.unwrap_or(0);
        match event.action {
            ActionKind::Damage => usage.total_damage += value,
            ActionKind::Healing => usage.total_healing += value,
            _ => {}
        }
    }

    players
}

/// Fold "Out of Stamina" events into per-player, per-item counts with
/// the ordered timestamps of each occurrence.
pub fn calculate_stamina_stats(events: &[CombatEvent]) -> Vec<PlayerStaminaStats> {
    let mut players: Vec<PlayerStaminaStats> = Vec::new();
    let mut player_index: HashMap<&str, usize> = HashMap::new();
    let mut item_index: HashMap<(usize, &str), usize> = HashMap::new();

    for event in events {
        if event.action != ActionKind::OutOfStamina {
            continue;
        }

        let p = *player_index.entry(event.player.as_str()).or_insert_with(|| {
            players.push(PlayerStaminaStats {
                player_name: event.player.clone(),
                items: Vec::new(),
                total_stamina_events: 0,
            });
            players.len() - 1
        });

        let i = *item_index.entry((p, event.item.as_str())).or_insert_with(|| {
            players[p].items.push(StaminaItemEvent {
                item_name: event.item.clone(),
                event_count: 0,
                timestamps: Vec::new(),
            });
            players[p].items.len() - 1
        });

        players[p].items[i].event_count += 1;
        players[p].items[i].timestamps.push(event.timestamp);
    }

    for player in &mut players {
        player.total_stamina_events = player.items.iter().map(|i| i.event_count).sum();
    }

    players
}

/// Group events by floored timestamp, ascending. Events within a second
/// keep their original relative order.
pub fn build_timeline(events: &[CombatEvent]) -> Vec<TimelineEvent> {
    let mut buckets: Vec<TimelineEvent> = Vec::new();
    let mut index: HashMap<u32, usize> = HashMap::new();

    for event in events {
        let second = event.timestamp.max(0.0) as u32;
        let b = *index.entry(second).or_insert_with(|| {
            buckets.push(TimelineEvent {
                timestamp: second,
                events: Vec::new(),
            });
            buckets.len() - 1
        });
        buckets[b].events.push(event.clone());
    }

    buckets.sort_by_key(|b| b.timestamp);
    buckets
}
