use std::collections::HashSet;
use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;
use uuid::Uuid;

use crate::models::*;

/// Parse raw combat log text into a session.
///
/// The parser is best-effort: lines that don't look like combat events
/// are dropped without an error. An empty log yields a session with zero
/// events and a duration of 0.
pub fn parse_combat_log(log_text: &str) -> CombatSession {
    let mut events: Vec<CombatEvent> = Vec::new();
    let mut player_names: Vec<String> = Vec::new();
    let mut seen_players: HashSet<String> = HashSet::new();

    for line in log_text.trim().lines() {
        if let Some(event) = parse_log_line(line) {
            if seen_players.insert(event.player.clone()) {
                player_names.push(event.player.clone());
            }
            events.push(event);
        }
    }

    let total_duration = events.iter().map(|e| e.timestamp).fold(0.0, f64::max);

    CombatSession {
        session_id: generate_session_id(),
        player_names,
        total_duration,
        total_events: events.len(),
        events,
    }
}

static TIMESTAMP_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+\.?\d*)s?").unwrap());

/// Parse one tab-delimited line: `timestamp\tplayer\taction description`.
/// Returns `None` for anything that doesn't fit the shape.
fn parse_log_line(line: &str) -> Option<CombatEvent> {
    let parts: Vec<&str> = line.split('\t').collect();
    if parts.len() < 3 {
        return None;
    }

    let timestamp_str = parts[0].trim();
    let player = parts[1].trim();
    let action_text = parts[2].trim();

    // "-" marks a continuation line at time 0
    let mut timestamp = 0.0;
    if timestamp_str != "-" {
        if let Some(cap) = TIMESTAMP_RE.captures(timestamp_str) {
            timestamp = cap[1].parse().unwrap_or(0.0);
        }
    }

    if action_text.split_whitespace().count() < 2 {
        return None;
    }

    let item = extract_item_name(action_text);
    let (action, value, target, is_critical) = classify_action(action_text);

    Some(CombatEvent {
        timestamp,
        player: player.to_string(),
        item,
        action,
        value,
        target,
        is_critical,
    })
}

static BURN_EXTINGUISHED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\s+Burn\s+extinguished").unwrap());
static BURN_DAMAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Burn\s+\d+\s+Damage").unwrap());

/// Leading-phrase patterns tried in order; the first capture wins.
static ITEM_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"^(.+?)\s+gained",
        r"^(.+?)\s+inflicted",
        r"^(.+?)\s+added",
        r"^(.+?)\s+\d+\s+(?:Damage|CritDamage|Healing)",
        r"^(.+?)\s+healed",
        r"^(.+?)\s+stunned",
        r"^(.+?)\s+missed",
        r"^(.+?)\s+out\s+of",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Extract the item name from an action description.
///
/// Mechanic phrasings ("5 Burn extinguished", "Burn 3 Damage", "Day
/// begins") map to fixed pseudo-item labels so they can be excluded from
/// item statistics later. Everything else is matched against the leading
/// phrase patterns, falling back to the first three words.
fn extract_item_name(action_text: &str) -> String {
    if BURN_EXTINGUISHED_RE.is_match(action_text) || BURN_DAMAGE_RE.is_match(action_text) {
        return BURN_MECHANIC.to_string();
    }
    if action_text.contains("Day begins") {
        return DAY_CYCLE_MECHANIC.to_string();
    }

    for pattern in ITEM_PATTERNS.iter() {
        if let Some(cap) = pattern.captures(action_text) {
            return cap[1].trim().to_string();
        }
    }

    action_text
        .split_whitespace()
        .take(3)
        .collect::<Vec<_>>()
        .join(" ")
}

type Predicate = fn(&str) -> bool;

/// Keyword rules in priority order; the first matching rule decides the
/// action kind, so "Sword inflicted 10 Damage to Bob" is Damage, not
/// Burn, even though it also contains "inflicted".
static ACTION_RULES: &[(Predicate, ActionKind)] = &[
    (|t| t.contains("Damage"), ActionKind::Damage),
    (|t| t.contains("healed") || t.contains("Health"), ActionKind::Healing),
    (|t| t.contains("Armor") || t.contains("added"), ActionKind::Armor),
    (|t| t.contains("gained") && t.contains("speed"), ActionKind::SpeedBuff),
    (
        |t| t.contains("gained") && (t.contains("Stamina") || t.contains("Luck") || t.contains("Haste")),
        ActionKind::Buff,
    ),
    (|t| t.contains("inflicted") && t.contains("Burn"), ActionKind::Burn),
    (|t| t.contains("inflicted") && t.contains("Blind"), ActionKind::Blind),
    (|t| t.contains("stunned"), ActionKind::Stun),
    (|t| t.contains("missed"), ActionKind::Miss),
    (|t| t.contains("extinguished"), ActionKind::BurnExtinguished),
    (|t| t.contains("out of Stamina"), ActionKind::OutOfStamina),
    (|t| t.contains("Day begins"), ActionKind::DayBegins),
    (|t| t.contains("Thorns"), ActionKind::ThornsDamage),
];

// First integer followed by whitespace, anywhere in the text. Known to
// grab the wrong number on descriptions carrying extra numerics (e.g. a
// target's remaining health); kept as-is for parity with stored data.
static VALUE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)\s+").unwrap());

static STUN_TARGET_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"stunned\s+(\w+)").unwrap());

/// Classify an action description into (kind, value, target, criticality).
fn classify_action(action_text: &str) -> (ActionKind, Option<i64>, Option<String>, Option<bool>) {
    let value = VALUE_RE
        .captures(action_text)
        .and_then(|cap| cap[1].parse().ok());

    let action = ACTION_RULES
        .iter()
        .find(|(matches, _)| matches(action_text))
        .map(|&(_, kind)| kind)
        .unwrap_or(ActionKind::Unknown);

    let mut target = None;
    let mut is_critical = None;
    match action {
        ActionKind::Damage => {
            if action_text.contains("Critical") || action_text.contains("CritDamage") {
                is_critical = Some(true);
            }
        }
        ActionKind::Stun => {
            target = STUN_TARGET_RE
                .captures(action_text)
                .map(|cap| cap[1].to_string());
        }
        _ => {}
    }

    (action, value, target, is_critical)
}

/// Unique per invocation: millisecond clock plus a random suffix.
fn generate_session_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("session_{}_{}", Utc::now().timestamp_millis(), &suffix[..9])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_damage_line() {
        let event = parse_log_line("1.5s\tAlice\tSword inflicted 10 Damage to Bob").unwrap();
        assert_eq!(event.timestamp, 1.5);
        assert_eq!(event.player, "Alice");
        assert_eq!(event.item, "Sword");
        assert_eq!(event.action, ActionKind::Damage);
        assert_eq!(event.value, Some(10));
        assert_eq!(event.is_critical, None);
    }

    #[test]
    fn continuation_timestamp_maps_to_zero() {
        let event = parse_log_line("-\tBob\tShield added 5 Armor").unwrap();
        assert_eq!(event.timestamp, 0.0);
        assert_eq!(event.item, "Shield");
        assert_eq!(event.action, ActionKind::Armor);
        assert_eq!(event.value, Some(5));
    }

    #[test]
    fn out_of_stamina_line() {
        let event = parse_log_line("2.0s\tAlice\tPotion out of Stamina").unwrap();
        assert_eq!(event.action, ActionKind::OutOfStamina);
        assert_eq!(event.item, "Potion");
        assert_eq!(event.timestamp, 2.0);
    }

    #[test]
    fn non_numeric_timestamp_defaults_to_zero() {
        let event = parse_log_line("???\tAlice\tSword inflicted 10 Damage").unwrap();
        assert_eq!(event.timestamp, 0.0);
    }

    #[test]
    fn malformed_lines_are_dropped() {
        // too few fields
        assert!(parse_log_line("1.0s\tAlice").is_none());
        assert!(parse_log_line("just some text").is_none());
        // action text with fewer than two words
        assert!(parse_log_line("1.0s\tAlice\tSword").is_none());
        assert!(parse_log_line("").is_none());
    }

    #[test]
    fn critical_damage_sets_flag() {
        let event = parse_log_line("3.2s\tAlice\tSword 25 CritDamage to Bob").unwrap();
        assert_eq!(event.action, ActionKind::Damage);
        assert_eq!(event.is_critical, Some(true));
        assert_eq!(event.item, "Sword");
        assert_eq!(event.value, Some(25));
    }

    #[test]
    fn stun_captures_target() {
        let event = parse_log_line("4.0s\tAlice\tHammer stunned Bob briefly").unwrap();
        assert_eq!(event.action, ActionKind::Stun);
        assert_eq!(event.target.as_deref(), Some("Bob"));
        assert_eq!(event.item, "Hammer");
    }

    #[test]
    fn burn_mechanic_labels() {
        let event = parse_log_line("5.0s\tAlice\t2 Burn extinguished by water").unwrap();
        assert_eq!(event.item, BURN_MECHANIC);
        assert_eq!(event.action, ActionKind::BurnExtinguished);

        let event = parse_log_line("6.0s\tAlice\tBurn 3 Damage over time").unwrap();
        assert_eq!(event.item, BURN_MECHANIC);
        assert_eq!(event.action, ActionKind::Damage);
    }

    #[test]
    fn day_cycle_mechanic_label() {
        let event = parse_log_line("7.0s\tAlice\tDay begins anew").unwrap();
        assert_eq!(event.item, DAY_CYCLE_MECHANIC);
        assert_eq!(event.action, ActionKind::DayBegins);
    }

    #[test]
    fn item_name_falls_back_to_first_three_words() {
        let event = parse_log_line("1.0s\tAlice\tSome strange unmatched phrase here").unwrap();
        assert_eq!(event.item, "Some strange unmatched");
        assert_eq!(event.action, ActionKind::Unknown);
        assert_eq!(event.value, None);
    }

    #[test]
    fn gained_buff_classification() {
        let event = parse_log_line("2.0s\tBob\tBoots gained 20 speed bonus").unwrap();
        assert_eq!(event.action, ActionKind::SpeedBuff);
        assert_eq!(event.item, "Boots");

        let event = parse_log_line("2.5s\tBob\tRing gained 5 Luck for a while").unwrap();
        assert_eq!(event.action, ActionKind::Buff);
        assert_eq!(event.item, "Ring");
    }

    #[test]
    fn inflicted_status_effects() {
        let event = parse_log_line("3.0s\tBob\tTorch inflicted Burn on Alice").unwrap();
        assert_eq!(event.action, ActionKind::Burn);

        let event = parse_log_line("3.5s\tBob\tSand inflicted Blind on Alice").unwrap();
        assert_eq!(event.action, ActionKind::Blind);
    }

    #[test]
    fn damage_keyword_wins_over_later_rules() {
        // Contains both "inflicted" and "Damage"; the Damage rule is first.
        let event = parse_log_line("1.0s\tAlice\tTorch inflicted 4 Burn Damage").unwrap();
        assert_eq!(event.action, ActionKind::Damage);
    }

    #[test]
    fn value_is_first_whitespace_terminated_integer() {
        let (_, value, _, _) = classify_action("Sword inflicted 10 Damage leaving 90 health");
        assert_eq!(value, Some(10));
        let (_, value, _, _) = classify_action("Sword missed wildly");
        assert_eq!(value, None);
    }

    #[test]
    fn session_assembles_players_and_duration() {
        let log = "1.0s\tAlice\tSword inflicted 10 Damage\n\
                   2.5s\tBob\tBow inflicted 7 Damage\n\
                   not a real line\n\
                   1.5s\tAlice\tPotion healed 5 Health";
        let session = parse_combat_log(log);
        assert_eq!(session.total_events, 3);
        assert_eq!(session.player_names, vec!["Alice", "Bob"]);
        assert_eq!(session.total_duration, 2.5);
        // no more events than non-empty lines
        assert!(session.total_events <= log.lines().count());
    }

    #[test]
    fn empty_log_yields_zero_duration() {
        let session = parse_combat_log("");
        assert_eq!(session.total_events, 0);
        assert_eq!(session.total_duration, 0.0);
        assert!(session.player_names.is_empty());
    }

    #[test]
    fn reparsing_is_idempotent_except_session_id() {
        let log = "1.0s\tAlice\tSword inflicted 10 Damage\n2.0s\tBob\tBow missed";
        let a = parse_combat_log(log);
        let b = parse_combat_log(log);
        assert_eq!(a.player_names, b.player_names);
        assert_eq!(a.total_duration, b.total_duration);
        assert_eq!(a.total_events, b.total_events);
        assert_eq!(a.events, b.events);
        assert_ne!(a.session_id, b.session_id);
    }
}
