use serde::{Deserialize, Serialize};

/// Item label used when a log line describes a burn mechanic rather than
/// an item the player used.
pub const BURN_MECHANIC: &str = "Burn (Mechanic)";
/// Item label for day-cycle log lines.
pub const DAY_CYCLE_MECHANIC: &str = "Day Cycle (Mechanic)";
/// Suffix shared by all mechanic pseudo-items.
pub const MECHANIC_SUFFIX: &str = "(Mechanic)";

/// What a combat event did, derived from the free-text action description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    Damage,
    Healing,
    Armor,
    #[serde(rename = "Speed Buff")]
    SpeedBuff,
    Buff,
    Burn,
    Blind,
    Stun,
    Miss,
    #[serde(rename = "Burn Extinguished")]
    BurnExtinguished,
    #[serde(rename = "Out of Stamina")]
    OutOfStamina,
    #[serde(rename = "Day Begins")]
    DayBegins,
    #[serde(rename = "Thorns Damage")]
    ThornsDamage,
    Unknown,
}

impl ActionKind {
    /// The wire/database string for this kind (matches the serde rename).
    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::Damage => "Damage",
            ActionKind::Healing => "Healing",
            ActionKind::Armor => "Armor",
            ActionKind::SpeedBuff => "Speed Buff",
            ActionKind::Buff => "Buff",
            ActionKind::Burn => "Burn",
            ActionKind::Blind => "Blind",
            ActionKind::Stun => "Stun",
            ActionKind::Miss => "Miss",
            ActionKind::BurnExtinguished => "Burn Extinguished",
            ActionKind::OutOfStamina => "Out of Stamina",
            ActionKind::DayBegins => "Day Begins",
            ActionKind::ThornsDamage => "Thorns Damage",
            ActionKind::Unknown => "Unknown",
        }
    }
}

/// One parsed combat log line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombatEvent {
    /// Seconds into the session. `-` lines (continuations) map to 0.
    pub timestamp: f64,
    pub player: String,
    pub item: String,
    pub action: ActionKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_critical: Option<bool>,
}

/// One complete parsed combat log and its derived event sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombatSession {
    pub session_id: String,
    /// Distinct player names in first-seen order.
    pub player_names: Vec<String>,
    /// Max event timestamp, or 0 for an empty log.
    pub total_duration: f64,
    pub total_events: usize,
    pub events: Vec<CombatEvent>,
}

/// Accumulated statistics for one player (as an actor).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStats {
    pub player_name: String,
    pub total_damage: i64,
    pub total_healing: i64,
    pub total_armor_gained: i64,
    pub damage_taken: i64,
    pub status_effects_applied: u32,
    pub status_effects_received: u32,
    pub critical_hits: u32,
    pub missed_attacks: u32,
}

impl PlayerStats {
    pub fn new(player_name: String) -> Self {
        PlayerStats {
            player_name,
            total_damage: 0,
            total_healing: 0,
            total_armor_gained: 0,
            damage_taken: 0,
            status_effects_applied: 0,
            status_effects_received: 0,
            critical_hits: 0,
            missed_attacks: 0,
        }
    }
}

/// Usage counters for one item used by one player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemUsage {
    pub item_name: String,
    pub usage_count: u32,
    pub total_damage: i64,
    pub total_healing: i64,
}

/// All items used by one player, in first-seen order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerItemStats {
    pub player_name: String,
    pub items: Vec<ItemUsage>,
}

/// "Ran out of stamina" occurrences for one item of one player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaminaItemEvent {
    pub item_name: String,
    pub event_count: u32,
    pub timestamps: Vec<f64>,
}

/// Per-player stamina breakdown plus the total across its items.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStaminaStats {
    pub player_name: String,
    pub items: Vec<StaminaItemEvent>,
    pub total_stamina_events: u32,
}

/// Events grouped by whole second, for time-series charts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEvent {
    /// Integer second (floored event timestamp).
    pub timestamp: u32,
    pub events: Vec<CombatEvent>,
}

/// Composite analysis returned to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombatAnalysis {
    pub session: CombatSession,
    pub player_stats: Vec<PlayerStats>,
    pub item_usage: Vec<PlayerItemStats>,
    pub timeline: Vec<TimelineEvent>,
    pub stamina_stats: Vec<PlayerStaminaStats>,
}

/// Row returned by the session listing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: String,
    pub player_names: Vec<String>,
    pub total_duration: f64,
    pub total_events: i64,
    pub created_at: String,
}
