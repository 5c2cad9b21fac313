use crate::bounded::{new_aggression, new_combat_odds, Aggression, CombatOdds};
use crate::defines::{army as army_defines, troops::TROOP_TYPES};
use crate::error::{ActionError, Conflict, Missing};
use crate::ids::{ArmyId, CharId, FiefId, SiegeId, TransferId};
use crate::validation::{self, ValidationError};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type Troops = [u32; TROOP_TYPES];

/// Season of the game year. The discriminant is the season index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Season {
    Spring = 0,
    Summer = 1,
    Autumn = 2,
    Winter = 3,
}

impl Season {
    pub fn index(self) -> u8 {
        self as u8
    }

    /// Winter and spring raise both attrition chance and casualties.
    pub fn is_harsh(self) -> bool {
        matches!(self, Season::Spring | Season::Winter)
    }

    pub fn next(self) -> Self {
        match self {
            Season::Spring => Season::Summer,
            Season::Summer => Season::Autumn,
            Season::Autumn => Season::Winter,
            Season::Winter => Season::Spring,
        }
    }
}

/// Current point in game time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GameClock {
    pub year: u32,
    pub season: Season,
}

impl GameClock {
    pub fn new(year: u32, season: Season) -> Self {
        Self { year, season }
    }

    /// Advance by one season, rolling the year over after winter.
    pub fn advance(&self) -> Self {
        let season = self.season.next();
        let year = if season == Season::Spring {
            self.year + 1
        } else {
            self.year
        };
        Self { year, season }
    }
}

impl Default for GameClock {
    fn default() -> Self {
        Self::new(1194, Season::Spring)
    }
}

impl std::fmt::Display for GameClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} {}", self.season, self.year)
    }
}

/// Raw construction input for an army; every field is validated by
/// [`Army::new`].
#[derive(Debug, Clone)]
pub struct NewArmy<'a> {
    pub id: &'a str,
    pub leader: Option<&'a str>,
    pub owner: &'a str,
    pub days: f64,
    pub location: &'a str,
    pub maintained: bool,
    pub aggression: u8,
    pub combat_odds: u8,
    pub troops: Option<&'a [u32]>,
}

impl<'a> NewArmy<'a> {
    pub fn new(id: &'a str, owner: &'a str, days: f64, location: &'a str) -> Self {
        Self {
            id,
            leader: None,
            owner,
            days,
            location,
            maintained: false,
            aggression: army_defines::DEFAULT_AGGRESSION,
            combat_odds: army_defines::DEFAULT_COMBAT_ODDS,
            troops: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Army {
    pub id: ArmyId,
    pub owner: CharId,
    pub leader: Option<CharId>,
    pub location: FiefId,
    /// Counts per troop type, see [`crate::defines::troops`]
    pub troops: Troops,
    /// Remaining activity budget this season
    pub days: f64,
    /// Upkeep paid this season (suppresses attrition)
    pub is_maintained: bool,
    pub aggression: Aggression,
    pub combat_odds: CombatOdds,
}

impl Army {
    pub fn new(params: NewArmy<'_>) -> Result<Self, ValidationError> {
        let id = ArmyId::parse(params.id)?;
        let owner = CharId::parse(params.owner)?;
        let leader = params.leader.map(CharId::parse).transpose()?;
        let location = FiefId::parse(params.location)?;
        let days = validation::validate_days(params.days)?;
        let aggression = validation::validate_aggression(params.aggression)?;
        let combat_odds = validation::validate_combat_odds(params.combat_odds)?;
        let troops = params
            .troops
            .map(validation::troop_array_or_default)
            .unwrap_or([0; TROOP_TYPES]);

        Ok(Self {
            id,
            owner,
            leader,
            location,
            troops,
            days,
            is_maintained: params.maintained,
            aggression: new_aggression(aggression as i32),
            combat_odds: new_combat_odds(combat_odds as i32),
        })
    }

    /// Leaderless army built from a detachment payload; never registered.
    pub(crate) fn transient(owner: CharId, location: FiefId, troops: Troops, days: f64) -> Self {
        Self {
            id: ArmyId::field(0),
            owner,
            leader: None,
            location,
            troops,
            days,
            is_maintained: false,
            aggression: new_aggression(army_defines::DEFAULT_AGGRESSION as i32),
            combat_odds: new_combat_odds(army_defines::DEFAULT_COMBAT_ODDS as i32),
        }
    }

    pub fn calc_army_size(&self) -> u32 {
        self.troops.iter().sum()
    }

    /// Clamp and store new standing orders; out-of-range input is never an error.
    pub fn adjust_standing_orders(&mut self, aggression: i32, combat_odds: i32) {
        self.aggression.set(aggression);
        self.combat_odds.set(combat_odds);
    }

    /// Remove `floor(count * modifier)` of every troop type and return the
    /// total removed.
    pub fn apply_troop_losses(&mut self, modifier: f64) -> u32 {
        let modifier = modifier.clamp(0.0, 1.0);
        let mut total = 0;
        for count in &mut self.troops {
            let loss = ((*count as f64) * modifier).floor() as u32;
            let loss = loss.min(*count);
            *count -= loss;
            total += loss;
        }
        total
    }

    pub fn add_troops(&mut self, troops: &Troops) {
        for (held, extra) in self.troops.iter_mut().zip(troops) {
            *held += extra;
        }
    }
}

/// Troops parked in a fief awaiting pickup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detachment {
    pub id: TransferId,
    pub left_by: CharId,
    pub left_for: CharId,
    pub troops: Troops,
    /// Day budget remaining when the troops were dropped off
    pub days: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CharacterRole {
    Player {
        home_fief: Option<FiefId>,
        /// Armies owned by this player
        armies: Vec<ArmyId>,
        entourage: Vec<CharId>,
    },
    Npc {
        employer: Option<CharId>,
        in_entourage: bool,
    },
}

/// Leader-capable character. Player and non-player characters share one
/// shape; the role carries what differs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub id: CharId,
    pub name: String,
    pub is_male: bool,
    pub nationality: String,
    pub location: FiefId,
    pub days: f64,
    pub stature: f64,
    pub management: f64,
    pub combat: f64,
    /// Skill effect on field battles (0.1 = +10%)
    pub battle_bonus: f64,
    /// Skill effect on storming a besieged keep
    pub siege_bonus: f64,
    /// Army this character currently leads
    pub army: Option<ArmyId>,
    pub role: CharacterRole,
}

impl Character {
    pub fn is_player(&self) -> bool {
        matches!(self.role, CharacterRole::Player { .. })
    }

    pub fn leadership_value(&self, is_siege_storm: bool) -> f64 {
        let base = (self.stature + self.management + self.combat) / 3.0;
        let bonus = if is_siege_storm {
            self.siege_bonus
        } else {
            self.battle_bonus
        };
        base * (1.0 + bonus)
    }

    pub fn combat_value(&self) -> f64 {
        (self.combat + (self.management + self.stature) / 2.0) * (1.0 + self.battle_bonus)
    }

    /// Fractional error applied when this character estimates enemy numbers.
    pub fn estimate_variance(&self, step: f64) -> f64 {
        (10.0 - self.management).max(0.0) * step
    }

    pub fn is_active_entourage(&self) -> bool {
        matches!(
            self.role,
            CharacterRole::Npc {
                in_entourage: true,
                ..
            }
        )
    }

    /// Whether this character may command `lord`'s armies: the lord
    /// himself, or an NPC in his employ.
    pub fn serves(&self, lord: &CharId) -> bool {
        match &self.role {
            CharacterRole::Player { .. } => &self.id == lord,
            CharacterRole::Npc { employer, .. } => employer.as_ref() == Some(lord),
        }
    }

    /// Taking command of an army removes an NPC from its employer's
    /// travelling entourage.
    pub fn leave_entourage(&mut self) {
        if let CharacterRole::Npc { in_entourage, .. } = &mut self.role {
            *in_entourage = false;
        }
    }

    pub fn entourage(&self) -> &[CharId] {
        match &self.role {
            CharacterRole::Player { entourage, .. } => entourage,
            CharacterRole::Npc { .. } => &[],
        }
    }

    pub fn home_fief(&self) -> Option<&FiefId> {
        match &self.role {
            CharacterRole::Player { home_fief, .. } => home_fief.as_ref(),
            CharacterRole::Npc { .. } => None,
        }
    }

    pub fn owned_armies(&self) -> &[ArmyId] {
        match &self.role {
            CharacterRole::Player { armies, .. } => armies,
            CharacterRole::Npc { .. } => &[],
        }
    }

    fn owned_armies_mut(&mut self) -> Option<&mut Vec<ArmyId>> {
        match &mut self.role {
            CharacterRole::Player { armies, .. } => Some(armies),
            CharacterRole::Npc { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fief {
    pub id: FiefId,
    pub name: String,
    pub owner: Option<CharId>,
    pub population: u32,
    pub treasury: f64,
    pub bailiff: Option<CharId>,
    pub keep_level: u8,
    /// Armies currently in the fief
    pub armies: Vec<ArmyId>,
    /// Detachments waiting to be collected
    pub transfers: BTreeMap<TransferId, Detachment>,
    pub siege: Option<SiegeId>,
}

impl Fief {
    pub fn add_army(&mut self, army: ArmyId) {
        if !self.armies.contains(&army) {
            self.armies.push(army);
        }
    }

    /// Returns `false` when the army was not listed.
    pub fn remove_army(&mut self, army: &ArmyId) -> bool {
        match self.armies.iter().position(|a| a == army) {
            Some(pos) => {
                self.armies.remove(pos);
                true
            }
            None => false,
        }
    }
}

/// Active siege of a fief's keep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Siege {
    pub id: SiegeId,
    pub fief: FiefId,
    pub besieging_army: ArmyId,
    pub defending_garrison: ArmyId,
    pub additional_defender: Option<ArmyId>,
    pub besieger_owner: CharId,
    pub defender_owner: CharId,
    /// Day budget shared by everyone involved
    pub days: f64,
    pub besieger_casualties: u32,
    pub defender_casualties: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WorldState {
    pub clock: GameClock,
    pub characters: FxHashMap<CharId, Character>,
    pub fiefs: FxHashMap<FiefId, Fief>,
    pub armies: FxHashMap<ArmyId, Army>,
    pub sieges: FxHashMap<SiegeId, Siege>,
    pub next_army_id: u32,
    pub next_transfer_id: u32,
    pub next_siege_id: u32,
}

impl WorldState {
    pub fn get_owner(&self, army: &Army) -> Option<&Character> {
        self.characters.get(&army.owner)
    }

    pub fn get_leader(&self, army: &Army) -> Option<&Character> {
        army.leader.as_ref().and_then(|id| self.characters.get(id))
    }

    pub fn get_location(&self, army: &Army) -> Option<&Fief> {
        self.fiefs.get(&army.location)
    }

    pub fn is_player(&self, id: &CharId) -> bool {
        self.characters.get(id).is_some_and(Character::is_player)
    }

    pub fn army(&self, id: &ArmyId) -> Result<&Army, ActionError> {
        self.armies
            .get(id)
            .ok_or_else(|| ActionError::NotFound(Missing::Army(id.clone())))
    }

    pub fn fief(&self, id: &FiefId) -> Result<&Fief, ActionError> {
        self.fiefs
            .get(id)
            .ok_or_else(|| ActionError::NotFound(Missing::Fief(id.clone())))
    }

    pub fn character(&self, id: &CharId) -> Result<&Character, ActionError> {
        self.characters
            .get(id)
            .ok_or_else(|| ActionError::NotFound(Missing::Character(id.clone())))
    }

    /// Issue the next field-army ID.
    pub fn issue_army_id(&mut self) -> ArmyId {
        self.next_army_id += 1;
        ArmyId::field(self.next_army_id)
    }

    pub fn issue_garrison_id(&mut self) -> ArmyId {
        self.next_army_id += 1;
        ArmyId::garrison(self.next_army_id)
    }

    pub fn issue_transfer_id(&mut self) -> TransferId {
        self.next_transfer_id += 1;
        TransferId(self.next_transfer_id)
    }

    pub fn issue_siege_id(&mut self) -> SiegeId {
        self.next_siege_id += 1;
        SiegeId(self.next_siege_id)
    }

    /// Register a freshly constructed army in the army registry, its owner's
    /// holdings, its leader's back-reference and its fief's army list.
    ///
    /// All references are checked before anything is written, so a rejected
    /// army leaves no trace.
    pub fn add_army(&mut self, army: Army) -> Result<(), ActionError> {
        if self.armies.contains_key(&army.id) {
            return Err(ActionError::StateConflict(Conflict::DuplicateArmy(
                army.id.clone(),
            )));
        }
        if !self.is_player(&army.owner) {
            return Err(ActionError::NotFound(Missing::Player(army.owner.clone())));
        }
        self.fief(&army.location)?;
        let previous_command = match &army.leader {
            Some(leader) => self.character(leader)?.army.clone(),
            None => None,
        };

        // A leader commands at most one army.
        if let Some(previous) = previous_command {
            if let Some(prev_army) = self.armies.get_mut(&previous) {
                prev_army.leader = None;
            }
        }
        if let Some(leader) = army.leader.as_ref().and_then(|id| self.characters.get_mut(id)) {
            leader.army = Some(army.id.clone());
        }
        if let Some(holdings) = self
            .characters
            .get_mut(&army.owner)
            .and_then(Character::owned_armies_mut)
        {
            holdings.push(army.id.clone());
        }
        if let Some(fief) = self.fiefs.get_mut(&army.location) {
            fief.add_army(army.id.clone());
        }

        log::debug!("Registered {} for {} in {}", army.id, army.owner, army.location);
        self.armies.insert(army.id.clone(), army);
        Ok(())
    }

    /// Remove an army from all four registration points.
    pub fn unregister_army(&mut self, id: &ArmyId) -> Option<Army> {
        let army = self.armies.remove(id)?;

        if let Some(leader) = army.leader.as_ref().and_then(|l| self.characters.get_mut(l)) {
            if leader.army.as_ref() == Some(id) {
                leader.army = None;
            }
        }
        if let Some(holdings) = self
            .characters
            .get_mut(&army.owner)
            .and_then(Character::owned_armies_mut)
        {
            holdings.retain(|a| a != id);
        }
        if let Some(fief) = self.fiefs.get_mut(&army.location) {
            fief.remove_army(id);
        }

        log::debug!("Unregistered {}", id);
        Some(army)
    }

    /// Compute a deterministic checksum of the world state.
    ///
    /// Used by tests to prove that rejected operations left the world
    /// untouched, and by the simulator to report desyncs between runs.
    pub fn checksum(&self) -> u64 {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();

        self.clock.hash(&mut hasher);
        self.next_army_id.hash(&mut hasher);
        self.next_transfer_id.hash(&mut hasher);
        self.next_siege_id.hash(&mut hasher);

        // Armies (sorted by ID)
        let mut army_ids: Vec<_> = self.armies.keys().collect();
        army_ids.sort();
        for id in army_ids {
            let a = &self.armies[id];
            id.hash(&mut hasher);
            a.owner.hash(&mut hasher);
            a.leader.hash(&mut hasher);
            a.location.hash(&mut hasher);
            a.troops.hash(&mut hasher);
            a.days.to_bits().hash(&mut hasher);
            a.is_maintained.hash(&mut hasher);
            a.aggression.hash(&mut hasher);
            a.combat_odds.hash(&mut hasher);
        }

        // Characters (sorted by ID)
        let mut char_ids: Vec<_> = self.characters.keys().collect();
        char_ids.sort();
        for id in char_ids {
            let c = &self.characters[id];
            id.hash(&mut hasher);
            c.location.hash(&mut hasher);
            c.days.to_bits().hash(&mut hasher);
            c.army.hash(&mut hasher);
            match &c.role {
                CharacterRole::Player {
                    armies, entourage, ..
                } => {
                    armies.hash(&mut hasher);
                    entourage.hash(&mut hasher);
                }
                CharacterRole::Npc { in_entourage, .. } => in_entourage.hash(&mut hasher),
            }
        }

        // Fiefs (sorted by ID)
        let mut fief_ids: Vec<_> = self.fiefs.keys().collect();
        fief_ids.sort();
        for id in fief_ids {
            let f = &self.fiefs[id];
            id.hash(&mut hasher);
            f.treasury.to_bits().hash(&mut hasher);
            f.armies.hash(&mut hasher);
            f.siege.hash(&mut hasher);
            for (tid, det) in &f.transfers {
                tid.hash(&mut hasher);
                det.left_for.hash(&mut hasher);
                det.troops.hash(&mut hasher);
                det.days.to_bits().hash(&mut hasher);
            }
        }

        // Sieges (sorted by ID)
        let mut siege_ids: Vec<_> = self.sieges.keys().collect();
        siege_ids.sort();
        for id in siege_ids {
            let s = &self.sieges[id];
            id.hash(&mut hasher);
            s.besieging_army.hash(&mut hasher);
            s.defending_garrison.hash(&mut hasher);
            s.additional_defender.hash(&mut hasher);
            s.days.to_bits().hash(&mut hasher);
            s.besieger_casualties.hash(&mut hasher);
            s.defender_casualties.hash(&mut hasher);
        }

        hasher.finish()
    }
}
