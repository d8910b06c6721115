//! Optimizer catalog.
//!
//! Keyword vocabularies, app category tables, drain rates and savings
//! tables used by the analysis pipeline. Built once at startup and shared
//! read-only by every request.

use std::collections::BTreeSet;

use crate::models::{ActionType, AppCategory, IntentCategory, ResourceFocus, SavingsTargets, Tier};

/// Terms that mark a resource as the focus of a prompt.
#[derive(Debug, Clone)]
pub struct FocusVocabulary {
    pub focus: ResourceFocus,
    pub terms: Vec<String>,
}

/// Phrases that signal an intent. Multi-word phrases weigh more than single
/// words.
#[derive(Debug, Clone)]
pub struct IntentVocabulary {
    pub intent: IntentCategory,
    pub phrases: Vec<String>,
}

/// Keywords for a critical-app category and the packages it protects.
#[derive(Debug, Clone)]
pub struct CategoryEntry {
    pub category: AppCategory,
    pub keywords: Vec<String>,
    /// Lowercased canonical package ids.
    pub packages: Vec<String>,
}

/// Typical cost of one hour of an activity, used for feasibility answers.
#[derive(Debug, Clone)]
pub struct ActivityProfile {
    pub label: String,
    pub keywords: Vec<String>,
    pub battery_percent_per_hour: f64,
    pub data_mb_per_hour: f64,
}

/// Estimated gain from one action.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActionSavings {
    pub action_type: ActionType,
    pub battery_minutes: f64,
    pub data_mb: f64,
}

/// Usage thresholds that decide which apps get restricted at each tier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActionThresholds {
    /// Very aggressive: at or above these an app is terminated instead of
    /// restricted.
    pub kill_battery_percent: f64,
    pub kill_data_mb: f64,
    /// Balanced: apps below both thresholds are left alone.
    pub balanced_battery_percent: f64,
    pub balanced_data_mb: f64,
    /// Minimal: the single top app is restricted only above these.
    pub outlier_battery_percent: f64,
    pub outlier_data_mb: f64,
    /// Upper bound on per-app restrictions in one response.
    pub max_app_actions: usize,
}

/// Process-wide immutable tables for the analysis pipeline.
#[derive(Debug, Clone)]
pub struct OptimizerCatalog {
    pub focus: Vec<FocusVocabulary>,
    pub negations: Vec<String>,
    pub intents: Vec<IntentVocabulary>,
    pub categories: Vec<CategoryEntry>,
    pub activities: Vec<ActivityProfile>,
    pub action_savings: Vec<ActionSavings>,
    pub thresholds: ActionThresholds,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl OptimizerCatalog {
    /// The built-in tables.
    pub fn standard() -> Self {
        Self {
            focus: vec![
                FocusVocabulary {
                    focus: ResourceFocus::Battery,
                    terms: strings(&[
                        "battery", "batteries", "power", "charge", "charging", "drain",
                        "draining", "juice", "battery life",
                    ]),
                },
                FocusVocabulary {
                    focus: ResourceFocus::Data,
                    terms: strings(&[
                        "data", "network", "internet", "mobile data", "cellular", "wifi",
                        "wi fi", "bandwidth", "mb", "gb", "megabytes", "gigabytes",
                        "data plan", "allowance",
                    ]),
                },
            ],
            negations: strings(&["don't", "dont", "do not", "not", "without", "except"]),
            intents: vec![
                IntentVocabulary {
                    intent: IntentCategory::Information,
                    phrases: strings(&[
                        "what", "which", "show", "show me", "list", "display", "tell me",
                        "how much", "how many", "top", "most", "using the most", "stats",
                        "statistics", "report", "breakdown", "consuming",
                    ]),
                },
                IntentVocabulary {
                    intent: IntentCategory::Predictive,
                    phrases: strings(&[
                        "will", "can i", "could i", "last", "enough", "how long", "make it",
                        "survive", "until", "able to", "will my",
                    ]),
                },
                IntentVocabulary {
                    intent: IntentCategory::Optimization,
                    phrases: strings(&[
                        "save", "saving", "reduce", "optimize", "optimise", "extend", "conserve",
                        "limit", "minimize", "improve", "boost", "stop", "restrict", "need",
                        "i need", "keep", "make sure", "preserve", "cut", "lower", "prioritize",
                        "protect", "how can i", "how do i", "how to", "best way", "help me",
                    ]),
                },
                IntentVocabulary {
                    intent: IntentCategory::Monitoring,
                    phrases: strings(&[
                        "notify", "notify me", "alert", "alert me", "remind", "remind me",
                        "warn", "warn me", "let me know", "tell me when", "when it reaches",
                        "monitor", "track",
                    ]),
                },
                IntentVocabulary {
                    intent: IntentCategory::PatternAnalysis,
                    phrases: strings(&[
                        "pattern", "patterns", "my pattern", "usage pattern", "usage patterns",
                        "history", "my history", "usage history", "historical", "usually",
                        "typically", "habit", "habits", "past", "over time", "based on my usage",
                        "last week", "trend", "trends",
                    ]),
                },
            ],
            categories: vec![
                CategoryEntry {
                    category: AppCategory::Messaging,
                    keywords: strings(&[
                        "message", "messages", "messaging", "messenger", "text", "texts",
                        "texting", "chat", "chats", "sms", "whatsapp", "telegram", "signal",
                        "viber", "call", "calls", "calling",
                    ]),
                    packages: strings(&[
                        "com.whatsapp",
                        "com.facebook.orca",
                        "com.viber.voip",
                        "org.telegram.messenger",
                        "org.thoughtcrime.securesms",
                        "com.google.android.apps.messaging",
                        "com.google.android.dialer",
                    ]),
                },
                CategoryEntry {
                    category: AppCategory::Navigation,
                    keywords: strings(&[
                        "map", "maps", "navigation", "navigate", "navigating", "directions",
                        "gps", "route", "waze", "driving",
                    ]),
                    packages: strings(&[
                        "com.google.android.apps.maps",
                        "com.waze",
                        "com.mapbox.app",
                        "com.here.app.maps",
                    ]),
                },
                CategoryEntry {
                    category: AppCategory::Email,
                    keywords: strings(&["email", "emails", "mail", "gmail", "outlook", "inbox"]),
                    packages: strings(&[
                        "com.google.android.gm",
                        "com.microsoft.office.outlook",
                        "com.yahoo.mobile.client.android.mail",
                    ]),
                },
                CategoryEntry {
                    category: AppCategory::Work,
                    keywords: strings(&[
                        "work", "meeting", "meetings", "slack", "teams", "zoom", "calendar",
                        "office", "docs", "conference",
                    ]),
                    packages: strings(&[
                        "com.slack",
                        "com.microsoft.teams",
                        "us.zoom.videomeetings",
                        "com.google.android.calendar",
                        "com.google.android.apps.docs",
                        "com.microsoft.office.officehubrow",
                    ]),
                },
                CategoryEntry {
                    category: AppCategory::HealthSafety,
                    keywords: strings(&[
                        "health", "emergency", "safety", "medical", "fitness", "heart",
                        "insulin", "glucose",
                    ]),
                    packages: strings(&[
                        "com.google.android.apps.fitness",
                        "com.sec.android.app.shealth",
                        "com.google.android.apps.safetyhub",
                        "com.fitbit.fitbitmobile",
                    ]),
                },
            ],
            activities: vec![
                activity("YouTube", &["youtube"], 25.0, 500.0),
                activity("Netflix", &["netflix"], 20.0, 700.0),
                activity("video streaming", &["video", "videos", "stream", "streaming", "movie", "movies"], 20.0, 500.0),
                activity("gaming", &["game", "games", "gaming", "play"], 25.0, 50.0),
                activity("navigation", &["navigation", "navigate", "maps", "map", "gps", "drive", "driving"], 18.0, 5.0),
                activity("calls", &["call", "calls", "calling", "phone"], 15.0, 30.0),
                activity("messaging", &["message", "messages", "messaging", "chat", "text", "texting"], 10.0, 5.0),
                activity("browsing", &["browse", "browsing", "web", "internet", "social"], 12.0, 60.0),
            ],
            action_savings: vec![
                savings(ActionType::SetStandbyBucket, 15.0, 10.0),
                savings(ActionType::RestrictBackgroundData, 0.0, 30.0),
                savings(ActionType::KillApp, 25.0, 15.0),
                savings(ActionType::ManageWakeLocks, 20.0, 0.0),
                savings(ActionType::ThrottleCpuUsage, 10.0, 0.0),
                savings(ActionType::EnableBatterySaver, 30.0, 0.0),
                savings(ActionType::EnableDataSaver, 0.0, 40.0),
                savings(ActionType::AdjustSyncSettings, 5.0, 10.0),
            ],
            thresholds: ActionThresholds {
                kill_battery_percent: 10.0,
                kill_data_mb: 100.0,
                balanced_battery_percent: 5.0,
                balanced_data_mb: 50.0,
                outlier_battery_percent: 20.0,
                outlier_data_mb: 200.0,
                max_app_actions: 10,
            },
        }
    }

    pub fn intent_phrases(&self, intent: IntentCategory) -> &[String] {
        self.intents
            .iter()
            .find(|v| v.intent == intent)
            .map(|v| v.phrases.as_slice())
            .unwrap_or(&[])
    }

    pub fn category(&self, category: AppCategory) -> Option<&CategoryEntry> {
        self.categories.iter().find(|c| c.category == category)
    }

    /// Canonical packages for a set of categories.
    pub fn packages_for(&self, categories: &BTreeSet<AppCategory>) -> BTreeSet<String> {
        categories
            .iter()
            .filter_map(|c| self.category(*c))
            .flat_map(|entry| entry.packages.iter().cloned())
            .collect()
    }

    pub fn savings_for(&self, action_type: ActionType) -> ActionSavings {
        self.action_savings
            .iter()
            .copied()
            .find(|s| s.action_type == action_type)
            .unwrap_or(ActionSavings {
                action_type,
                battery_minutes: 0.0,
                data_mb: 0.0,
            })
    }

    /// Fixed per-tier caps on claimed savings.
    pub fn tier_targets(&self, tier: Tier) -> SavingsTargets {
        let (battery_minutes, data_mb) = match tier {
            Tier::VeryAggressive => (180.0, 300.0),
            Tier::Aggressive => (120.0, 200.0),
            Tier::Balanced => (60.0, 100.0),
            Tier::Minimal => (30.0, 50.0),
        };
        SavingsTargets {
            battery_minutes,
            data_mb,
        }
    }
}

impl Default for OptimizerCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

fn activity(label: &str, keywords: &[&str], battery: f64, data: f64) -> ActivityProfile {
    ActivityProfile {
        label: label.to_string(),
        keywords: strings(keywords),
        battery_percent_per_hour: battery,
        data_mb_per_hour: data,
    }
}

fn savings(action_type: ActionType, battery_minutes: f64, data_mb: f64) -> ActionSavings {
    ActionSavings {
        action_type,
        battery_minutes,
        data_mb,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_action_type_has_savings() {
        let catalog = OptimizerCatalog::standard();
        for action_type in ActionType::ALL {
            assert!(catalog
                .action_savings
                .iter()
                .any(|s| s.action_type == action_type));
        }
    }

    #[test]
    fn test_every_category_has_packages() {
        let catalog = OptimizerCatalog::standard();
        for category in AppCategory::ALL {
            let entry = catalog.category(category).unwrap();
            assert!(!entry.keywords.is_empty());
            assert!(!entry.packages.is_empty());
            assert!(entry.packages.iter().all(|p| *p == p.to_ascii_lowercase()));
        }
    }

    #[test]
    fn test_packages_for_navigation() {
        let catalog = OptimizerCatalog::standard();
        let categories: BTreeSet<_> = [AppCategory::Navigation].into_iter().collect();
        let packages = catalog.packages_for(&categories);
        assert!(packages.contains("com.google.android.apps.maps"));
        assert!(!packages.contains("com.whatsapp"));
    }

    #[test]
    fn test_tier_targets_grow_with_aggressiveness() {
        let catalog = OptimizerCatalog::standard();
        let minimal = catalog.tier_targets(Tier::Minimal);
        let very = catalog.tier_targets(Tier::VeryAggressive);
        assert!(very.battery_minutes > minimal.battery_minutes);
        assert!(very.data_mb > minimal.data_mb);
    }
}
