//! Game option records.
//!
//! Every rule of a game lives in a name-keyed options snapshot. Each record
//! is one of three variants, discriminated by its `type` field:
//!
//! - `game`: a plain setting such as `team_scoring` or `better_points`
//! - `junk`: a side bet awarding additive points
//! - `multiplier`: a press or automatic multiplier
//!
//! The engine never interprets option names beyond the few documented game
//! settings; everything else is driven by the record's fields.

use crate::ranking::RankDirection;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Where an option applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionScope {
    #[default]
    Player,
    Team,
    Hole,
    RestOfNine,
    Game,
}

/// Which score a player junk is judged on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JunkBasis {
    #[default]
    Gross,
    Net,
    /// Marked by hand in the player's round (prox, sandie, ...).
    User,
}

/// How a team junk is decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JunkCalculation {
    /// Decided by the junk's `logic` expression.
    Logic,
    /// Best low ball among teams.
    BestBall,
    /// Best team total among teams.
    Sum,
    #[serde(other)]
    Unsupported,
}

/// How many times a junk can be won on one hole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JunkLimit {
    OnePerGroup,
    OneTeamPerGroup,
    #[default]
    #[serde(rename = "", other)]
    Unlimited,
}

impl JunkLimit {
    /// Limited junk counts toward a hole's possible points up front.
    pub fn is_limited(self) -> bool {
        !matches!(self, JunkLimit::Unlimited)
    }
}

/// Declared value type of a game option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    Bool,
    Num,
    #[default]
    Text,
}

/// A typed game option value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Num(f64),
    Text(String),
}

impl OptionValue {
    /// Convert a raw persisted value according to the declared type.
    ///
    /// Returns `None` when the raw value cannot be read as that type.
    pub fn from_raw(raw: &serde_json::Value, value_type: ValueType) -> Option<Self> {
        use serde_json::Value;
        match (value_type, raw) {
            (ValueType::Bool, Value::Bool(b)) => Some(OptionValue::Bool(*b)),
            (ValueType::Bool, Value::String(s)) => Some(OptionValue::Bool(s.trim() == "true")),
            (ValueType::Num, Value::Number(n)) => n.as_f64().map(OptionValue::Num),
            (ValueType::Num, Value::String(s)) => s.trim().parse().ok().map(OptionValue::Num),
            (ValueType::Text, Value::String(s)) => Some(OptionValue::Text(s.clone())),
            (ValueType::Text, Value::Null) => None,
            (ValueType::Text, other) => Some(OptionValue::Text(other.to_string())),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            OptionValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            OptionValue::Num(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            OptionValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// A plain game setting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameOption {
    pub name: String,
    #[serde(default)]
    pub disp: String,
    #[serde(default, alias = "valueType")]
    pub value_type: ValueType,
    #[serde(default)]
    pub value: Option<serde_json::Value>,
    #[serde(default, alias = "defaultValue")]
    pub default_value: Option<serde_json::Value>,
}

impl GameOption {
    /// The effective value: `value` if set, otherwise `default_value`.
    pub fn effective_value(&self) -> Option<OptionValue> {
        self.value
            .as_ref()
            .or(self.default_value.as_ref())
            .and_then(|raw| OptionValue::from_raw(raw, self.value_type))
    }
}

fn default_seq() -> u32 {
    999
}

/// A side bet awarding additive points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JunkOption {
    pub name: String,
    #[serde(default)]
    pub disp: String,
    #[serde(default = "default_seq")]
    pub seq: u32,
    #[serde(default)]
    pub value: f64,
    #[serde(default)]
    pub scope: OptionScope,
    #[serde(default)]
    pub based_on: JunkBasis,
    /// Condition such as `"exactly -1"`.
    #[serde(default)]
    pub score_to_par: Option<String>,
    /// Logic expression such as `"{'rankWithTies': [1, 1]}"`.
    #[serde(default)]
    pub logic: Option<String>,
    #[serde(default)]
    pub calculation: Option<JunkCalculation>,
    #[serde(default)]
    pub better: Option<RankDirection>,
    #[serde(default)]
    pub limit: JunkLimit,
}

impl JunkOption {
    /// Create a junk option with the given name, value and scope.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use golfjunk::options::{JunkOption, OptionScope};
    ///
    /// let birdie = JunkOption::new("birdie", 1.0, OptionScope::Player)
    ///     .with_score_to_par("exactly -1");
    /// assert_eq!(birdie.score_to_par.as_deref(), Some("exactly -1"));
    /// ```
    pub fn new(name: impl Into<String>, value: f64, scope: OptionScope) -> Self {
        let name = name.into();
        Self {
            disp: name.clone(),
            name,
            seq: default_seq(),
            value,
            scope,
            based_on: JunkBasis::default(),
            score_to_par: None,
            logic: None,
            calculation: None,
            better: None,
            limit: JunkLimit::default(),
        }
    }

    pub fn with_seq(mut self, seq: u32) -> Self {
        self.seq = seq;
        self
    }

    pub fn with_based_on(mut self, based_on: JunkBasis) -> Self {
        self.based_on = based_on;
        self
    }

    pub fn with_score_to_par(mut self, condition: impl Into<String>) -> Self {
        self.score_to_par = Some(condition.into());
        self
    }

    pub fn with_logic(mut self, logic: impl Into<String>) -> Self {
        self.logic = Some(logic.into());
        self
    }

    pub fn with_calculation(mut self, calculation: JunkCalculation) -> Self {
        self.calculation = Some(calculation);
        self
    }

    pub fn with_better(mut self, better: RankDirection) -> Self {
        self.better = Some(better);
        self
    }

    pub fn with_limit(mut self, limit: JunkLimit) -> Self {
        self.limit = limit;
        self
    }
}

/// Kind of multiplier, when declared explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MultiplierSubType {
    Press,
    Automatic,
    Bbq,
    #[serde(other)]
    Other,
}

/// Where a multiplier reads its value from instead of its static `value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueFrom {
    /// Doubles once for every `pre_double` pressed on the front nine ("Re Pre").
    FrontNinePreDoubleTotal,
    #[serde(other)]
    Unknown,
}

fn default_multiplier_value() -> f64 {
    2.0
}

/// A point multiplier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiplierOption {
    pub name: String,
    #[serde(default)]
    pub disp: String,
    #[serde(default = "default_seq")]
    pub seq: u32,
    #[serde(default = "default_multiplier_value")]
    pub value: f64,
    #[serde(default = "default_multiplier_scope")]
    pub scope: OptionScope,
    /// Logic expression gating the multiplier. Empty means always available.
    #[serde(default)]
    pub availability: Option<String>,
    /// `"user"` for presses; otherwise the name of the junk that triggers it.
    #[serde(default)]
    pub based_on: Option<String>,
    #[serde(default)]
    pub sub_type: Option<MultiplierSubType>,
    /// When set, this multiplier replaces every other one on the hole.
    #[serde(default, rename = "override")]
    pub overrides: bool,
    #[serde(default)]
    pub invalidation_reason: Option<String>,
    #[serde(default, alias = "valueFrom")]
    pub value_from: Option<ValueFrom>,
}

fn default_multiplier_scope() -> OptionScope {
    OptionScope::Hole
}

impl MultiplierOption {
    /// Create a multiplier with the given name, value and scope.
    pub fn new(name: impl Into<String>, value: f64, scope: OptionScope) -> Self {
        let name = name.into();
        Self {
            disp: name.clone(),
            name,
            seq: default_seq(),
            value,
            scope,
            availability: None,
            based_on: None,
            sub_type: None,
            overrides: false,
            invalidation_reason: None,
            value_from: None,
        }
    }

    /// A press activated from recorded team options.
    pub fn press(name: impl Into<String>, value: f64, scope: OptionScope) -> Self {
        let mut mult = Self::new(name, value, scope);
        mult.based_on = Some("user".to_string());
        mult
    }

    /// A multiplier earned automatically when a team wins `junk_name`.
    pub fn automatic(name: impl Into<String>, value: f64, junk_name: impl Into<String>) -> Self {
        let mut mult = Self::new(name, value, OptionScope::Hole);
        mult.based_on = Some(junk_name.into());
        mult
    }

    pub fn with_seq(mut self, seq: u32) -> Self {
        self.seq = seq;
        self
    }

    pub fn with_availability(mut self, availability: impl Into<String>) -> Self {
        self.availability = Some(availability.into());
        self
    }

    pub fn with_override(mut self) -> Self {
        self.overrides = true;
        self
    }

    pub fn with_value_from(mut self, value_from: ValueFrom) -> Self {
        self.value_from = Some(value_from);
        self
    }

    /// Presses are activated by players rather than earned.
    pub fn is_user_activated(&self) -> bool {
        self.sub_type == Some(MultiplierSubType::Press) || self.based_on.as_deref() == Some("user")
    }

    /// The junk that triggers an automatic multiplier.
    pub fn trigger_junk(&self) -> Option<&str> {
        if self.is_user_activated() {
            return None;
        }
        self.based_on.as_deref().filter(|s| !s.is_empty())
    }

    /// The availability expression, if one is set and non-blank.
    pub fn availability_expr(&self) -> Option<&str> {
        self.availability.as_deref().filter(|s| !s.trim().is_empty())
    }
}

/// One option record, discriminated by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScoringOption {
    Game(GameOption),
    Junk(JunkOption),
    Multiplier(MultiplierOption),
}

impl ScoringOption {
    pub fn name(&self) -> &str {
        match self {
            ScoringOption::Game(o) => &o.name,
            ScoringOption::Junk(o) => &o.name,
            ScoringOption::Multiplier(o) => &o.name,
        }
    }
}

impl From<GameOption> for ScoringOption {
    fn from(option: GameOption) -> Self {
        ScoringOption::Game(option)
    }
}

impl From<JunkOption> for ScoringOption {
    fn from(option: JunkOption) -> Self {
        ScoringOption::Junk(option)
    }
}

impl From<MultiplierOption> for ScoringOption {
    fn from(option: MultiplierOption) -> Self {
        ScoringOption::Multiplier(option)
    }
}

/// The name-keyed options snapshot of a game.
///
/// # Examples
///
/// ```rust
/// use golfjunk::options::{JunkOption, MultiplierOption, OptionScope, Options};
///
/// let mut options = Options::new();
/// options.insert(JunkOption::new("prox", 1.0, OptionScope::Player).with_seq(2));
/// options.insert(JunkOption::new("birdie", 1.0, OptionScope::Player).with_seq(1));
/// options.insert(MultiplierOption::press("double", 2.0, OptionScope::Hole));
///
/// let names: Vec<_> = options.junk().map(|j| j.name.as_str()).collect();
/// assert_eq!(names, vec!["birdie", "prox"]);
/// assert_eq!(options.multipliers().count(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Options {
    records: BTreeMap<String, ScoringOption>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an option, keyed by its name. Replaces any option of the same name.
    pub fn insert(&mut self, option: impl Into<ScoringOption>) {
        let option = option.into();
        self.records.insert(option.name().to_string(), option);
    }

    pub fn get(&self, name: &str) -> Option<&ScoringOption> {
        self.records.get(name)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScoringOption> {
        self.records.values()
    }

    /// Look up a game setting by name.
    pub fn game_option(&self, name: &str) -> Option<&GameOption> {
        match self.records.get(name) {
            Some(ScoringOption::Game(o)) => Some(o),
            _ => None,
        }
    }

    pub fn junk_option(&self, name: &str) -> Option<&JunkOption> {
        match self.records.get(name) {
            Some(ScoringOption::Junk(o)) => Some(o),
            _ => None,
        }
    }

    pub fn multiplier_option(&self, name: &str) -> Option<&MultiplierOption> {
        match self.records.get(name) {
            Some(ScoringOption::Multiplier(o)) => Some(o),
            _ => None,
        }
    }

    /// Junk options in evaluation order (`seq`, then name).
    pub fn junk(&self) -> impl Iterator<Item = &JunkOption> {
        let mut junk: Vec<&JunkOption> = self
            .records
            .values()
            .filter_map(|o| match o {
                ScoringOption::Junk(j) => Some(j),
                _ => None,
            })
            .collect();
        junk.sort_by(|a, b| a.seq.cmp(&b.seq).then_with(|| a.name.cmp(&b.name)));
        junk.into_iter()
    }

    /// Multiplier options in evaluation order (`seq`, then name).
    pub fn multipliers(&self) -> impl Iterator<Item = &MultiplierOption> {
        let mut mults: Vec<&MultiplierOption> = self
            .records
            .values()
            .filter_map(|o| match o {
                ScoringOption::Multiplier(m) => Some(m),
                _ => None,
            })
            .collect();
        mults.sort_by(|a, b| a.seq.cmp(&b.seq).then_with(|| a.name.cmp(&b.name)));
        mults.into_iter()
    }

    /// Every logic expression stored in the snapshot.
    pub fn expressions(&self) -> impl Iterator<Item = &str> {
        self.records.values().filter_map(|o| match o {
            ScoringOption::Junk(j) => j.logic.as_deref(),
            ScoringOption::Multiplier(m) => m.availability_expr(),
            ScoringOption::Game(_) => None,
        })
    }
}

impl FromIterator<ScoringOption> for Options {
    fn from_iter<I: IntoIterator<Item = ScoringOption>>(iter: I) -> Self {
        let mut options = Options::new();
        for option in iter {
            options.insert(option);
        }
        options
    }
}
