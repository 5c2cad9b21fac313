//! Fixtures for tests: a world builder, a scripted random source and a
//! harness bundling the collaborators an operation needs.

use crate::config::SimConfig;
use crate::ids::{ArmyId, CharId, FiefId, SiegeId};
use crate::observer::Outbox;
use crate::rng::RandomSource;
use crate::state::{
    Army, Character, CharacterRole, Fief, GameClock, NewArmy, Season, Siege, Troops, WorldState,
};
use crate::systems::SimContext;
use std::collections::{BTreeMap, VecDeque};

fn char_id(raw: &str) -> CharId {
    CharId::parse(raw).expect("test character ID")
}

fn fief_id(raw: &str) -> FiefId {
    FiefId::parse(raw).expect("test fief ID")
}

fn army_id(raw: &str) -> ArmyId {
    ArmyId::parse(raw).expect("test army ID")
}

pub struct WorldStateBuilder {
    state: WorldState,
}

impl WorldStateBuilder {
    pub fn new() -> Self {
        Self {
            state: WorldState {
                clock: GameClock::new(1194, Season::Summer),
                ..Default::default()
            },
        }
    }

    pub fn season(mut self, season: Season) -> Self {
        self.state.clock.season = season;
        self
    }

    pub fn with_fief(self, id: &str, population: u32) -> Self {
        let fief = Fief {
            id: fief_id(id),
            name: format!("Fief {}", id),
            owner: None,
            population,
            treasury: 0.0,
            bailiff: None,
            keep_level: 0,
            armies: Vec::new(),
            transfers: BTreeMap::new(),
            siege: None,
        };
        self.with_fief_state(fief)
    }

    pub fn with_fief_state(mut self, fief: Fief) -> Self {
        self.state.fiefs.insert(fief.id.clone(), fief);
        self
    }

    pub fn treasury(mut self, fief: &str, amount: f64) -> Self {
        if let Some(f) = self.state.fiefs.get_mut(&fief_id(fief)) {
            f.treasury = amount;
        }
        self
    }

    /// A male player character of nationality "E" whose home fief is `location`.
    pub fn with_player(self, id: &str, location: &str) -> Self {
        let character = Character {
            id: char_id(id),
            name: format!("Lord {}", id),
            is_male: true,
            nationality: "E".into(),
            location: fief_id(location),
            days: 90.0,
            stature: 5.0,
            management: 5.0,
            combat: 5.0,
            battle_bonus: 0.0,
            siege_bonus: 0.0,
            army: None,
            role: CharacterRole::Player {
                home_fief: Some(fief_id(location)),
                armies: Vec::new(),
                entourage: Vec::new(),
            },
        };
        self.with_character(character)
    }

    /// A male NPC; when employed he joins the employer's active entourage.
    pub fn with_npc(mut self, id: &str, location: &str, employer: Option<&str>) -> Self {
        let id = char_id(id);
        let employer = employer.map(char_id);
        if let Some(boss) = employer.as_ref().and_then(|e| self.state.characters.get_mut(e)) {
            if let CharacterRole::Player { entourage, .. } = &mut boss.role {
                entourage.push(id.clone());
            }
        }
        let character = Character {
            id: id.clone(),
            name: format!("Sir {}", id),
            is_male: true,
            nationality: "E".into(),
            location: fief_id(location),
            days: 90.0,
            stature: 3.0,
            management: 3.0,
            combat: 3.0,
            battle_bonus: 0.0,
            siege_bonus: 0.0,
            army: None,
            role: CharacterRole::Npc {
                in_entourage: employer.is_some(),
                employer,
            },
        };
        self.with_character(character)
    }

    pub fn with_character(mut self, character: Character) -> Self {
        self.state.characters.insert(character.id.clone(), character);
        self
    }

    /// Construct and register an army through the public API.
    pub fn with_army(
        mut self,
        id: &str,
        owner: &str,
        leader: Option<&str>,
        location: &str,
        troops: Troops,
        days: f64,
    ) -> Self {
        let army = Army::new(NewArmy {
            leader,
            troops: Some(&troops),
            ..NewArmy::new(id, owner, days, location)
        })
        .expect("valid test army");
        self.state.add_army(army).expect("registrable test army");
        self
    }

    /// Start a siege of `fief` by `besieger` against `garrison`.
    pub fn with_siege(mut self, fief: &str, besieger: &str, garrison: &str) -> Self {
        let fief = fief_id(fief);
        let besieger = army_id(besieger);
        let garrison = army_id(garrison);
        let besieger_owner = self.state.armies[&besieger].owner.clone();
        let defender_owner = self.state.armies[&garrison].owner.clone();
        let days = self.state.armies[&besieger].days;

        let id = self.state.issue_siege_id();
        self.state.sieges.insert(
            id,
            Siege {
                id,
                fief: fief.clone(),
                besieging_army: besieger,
                defending_garrison: garrison,
                additional_defender: None,
                besieger_owner,
                defender_owner,
                days,
                besieger_casualties: 0,
                defender_casualties: 0,
            },
        );
        if let Some(f) = self.state.fiefs.get_mut(&fief) {
            f.siege = Some(id);
        }
        self
    }

    pub fn additional_defender(mut self, siege: u32, army: &str) -> Self {
        if let Some(s) = self.state.sieges.get_mut(&SiegeId(siege)) {
            s.additional_defender = Some(army_id(army));
        }
        self
    }

    pub fn build(self) -> WorldState {
        self.state
    }
}

impl Default for WorldStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Random source that replays queued values.
///
/// When a queue runs dry: `percent` returns 100 (no attrition unless the
/// chance is at its maximum), `range_inclusive` returns the lower bound and
/// `signed_unit` returns 0.
#[derive(Debug, Default, Clone)]
pub struct ScriptedRng {
    percents: VecDeque<f64>,
    ranges: VecDeque<u32>,
    units: VecDeque<f64>,
}

impl ScriptedRng {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn percents(mut self, values: &[f64]) -> Self {
        self.percents.extend(values);
        self
    }

    pub fn ranges(mut self, values: &[u32]) -> Self {
        self.ranges.extend(values);
        self
    }

    pub fn units(mut self, values: &[f64]) -> Self {
        self.units.extend(values);
        self
    }
}

impl RandomSource for ScriptedRng {
    fn percent(&mut self) -> f64 {
        self.percents.pop_front().unwrap_or(100.0)
    }

    fn range_inclusive(&mut self, lo: u32, hi: u32) -> u32 {
        self.ranges
            .pop_front()
            .map(|v| v.clamp(lo, hi))
            .unwrap_or(lo)
    }

    fn signed_unit(&mut self) -> f64 {
        self.units.pop_front().unwrap_or(0.0)
    }
}

/// Owns the collaborators so tests can hand out a [`SimContext`].
pub struct Harness {
    pub config: SimConfig,
    pub rng: ScriptedRng,
    pub outbox: Outbox,
}

impl Harness {
    pub fn new(rng: ScriptedRng) -> Self {
        Self {
            config: SimConfig::default(),
            rng,
            outbox: Outbox::new(),
        }
    }

    pub fn ctx(&mut self) -> SimContext<'_> {
        SimContext::new(&self.config, &mut self.rng, &mut self.outbox)
    }
}
