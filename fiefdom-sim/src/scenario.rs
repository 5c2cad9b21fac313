use anyhow::{Context, Result};
use fiefdom_core::state::CharacterRole;
use fiefdom_core::{
    Army, ArmyId, CharId, Character, Command, Fief, FiefId, NewArmy, PlayerInputs, Siege,
    TravelMap, WorldState,
};
use std::collections::BTreeMap;
use std::path::Path;

struct FiefSeed {
    id: &'static str,
    name: &'static str,
    owner: Option<&'static str>,
    population: u32,
    treasury: f64,
    keep_level: u8,
}

const FIEFS: &[FiefSeed] = &[
    FiefSeed {
        id: "ESX02",
        name: "Essex",
        owner: Some("Char_1"),
        population: 12_000,
        treasury: 600_000.0,
        keep_level: 2,
    },
    FiefSeed {
        id: "KNT01",
        name: "Kent",
        owner: Some("Char_2"),
        population: 9_000,
        treasury: 150_000.0,
        keep_level: 1,
    },
    FiefSeed {
        id: "SRY03",
        name: "Surrey",
        owner: Some("Char_2"),
        population: 6_000,
        treasury: 80_000.0,
        keep_level: 0,
    },
    FiefSeed {
        id: "MDX01",
        name: "Middlesex",
        owner: None,
        population: 15_000,
        treasury: 0.0,
        keep_level: 0,
    },
];

/// Roads between fiefs, with travel cost in days.
const ROADS: &[(&str, &str, f64)] = &[
    ("ESX02", "MDX01", 9.0),
    ("ESX02", "KNT01", 14.0),
    ("MDX01", "KNT01", 11.0),
    ("MDX01", "SRY03", 8.0),
    ("KNT01", "SRY03", 10.0),
];

fn character(
    id: &str,
    name: &str,
    nationality: &str,
    location: &str,
    stats: [f64; 3],
    role: CharacterRole,
) -> Result<Character> {
    let [stature, management, combat] = stats;
    Ok(Character {
        id: CharId::parse(id)?,
        name: name.to_string(),
        is_male: true,
        nationality: nationality.to_string(),
        location: FiefId::parse(location)?,
        days: 90.0,
        stature,
        management,
        combat,
        battle_bonus: 0.0,
        siege_bonus: 0.0,
        army: None,
        role,
    })
}

fn player(home: &str, entourage: &[&str]) -> Result<CharacterRole> {
    Ok(CharacterRole::Player {
        home_fief: Some(FiefId::parse(home)?),
        armies: Vec::new(),
        entourage: entourage
            .iter()
            .map(|id| CharId::parse(id))
            .collect::<Result<_, _>>()?,
    })
}

fn retainer(employer: &str) -> Result<CharacterRole> {
    Ok(CharacterRole::Npc {
        employer: Some(CharId::parse(employer)?),
        in_entourage: true,
    })
}

/// A small realm: two rival lords, four fiefs, a siege under way at Kent.
pub fn demo_realm() -> Result<(WorldState, TravelMap)> {
    let mut state = WorldState::default();

    for seed in FIEFS {
        let fief = Fief {
            id: FiefId::parse(seed.id)?,
            name: seed.name.to_string(),
            owner: seed.owner.map(CharId::parse).transpose()?,
            population: seed.population,
            treasury: seed.treasury,
            bailiff: None,
            keep_level: seed.keep_level,
            armies: Vec::new(),
            transfers: BTreeMap::new(),
            siege: None,
        };
        state.fiefs.insert(fief.id.clone(), fief);
    }

    let characters = [
        character(
            "Char_1",
            "Geoffrey de Mandeville",
            "E",
            "ESX02",
            [6.0, 5.0, 7.0],
            player("ESX02", &["Char_3", "Char_4"])?,
        )?,
        character(
            "Char_2",
            "Hubert de Burgh",
            "F",
            "KNT01",
            [5.0, 7.0, 5.0],
            player("KNT01", &["Char_5"])?,
        )?,
        character(
            "Char_3",
            "William Marshal",
            "E",
            "ESX02",
            [5.0, 6.0, 8.0],
            retainer("Char_1")?,
        )?,
        character(
            "Char_4",
            "Roger Bigod",
            "E",
            "KNT01",
            [3.0, 4.0, 5.0],
            retainer("Char_1")?,
        )?,
        character(
            "Char_5",
            "Falkes de Breaute",
            "F",
            "KNT01",
            [4.0, 6.0, 6.0],
            retainer("Char_2")?,
        )?,
    ];
    for c in characters {
        state.characters.insert(c.id.clone(), c);
    }
    if let Some(kent) = state.fiefs.get_mut(&FiefId::parse("KNT01")?) {
        kent.bailiff = Some(CharId::parse("Char_5")?);
    }

    let armies: [(&str, Option<&str>, &str, &str, [u32; 7], f64); 4] = [
        ("Army_1", Some("Char_3"), "Char_1", "ESX02", [40, 80, 60, 120, 30, 400, 150], 90.0),
        ("Army_2", None, "Char_2", "SRY03", [10, 20, 0, 40, 60, 180, 90], 90.0),
        ("GarrisonArmy_3", None, "Char_2", "KNT01", [0, 10, 0, 30, 40, 120, 0], 90.0),
        ("Army_4", Some("Char_4"), "Char_1", "KNT01", [20, 40, 30, 60, 0, 250, 100], 90.0),
    ];
    for (id, leader, owner, location, troops, days) in armies {
        let army = Army::new(NewArmy {
            leader,
            troops: Some(&troops),
            ..NewArmy::new(id, owner, days, location)
        })?;
        state.add_army(army)?;
    }
    state.next_army_id = 4;

    let siege_id = state.issue_siege_id();
    let kent = FiefId::parse("KNT01")?;
    state.sieges.insert(
        siege_id,
        Siege {
            id: siege_id,
            fief: kent.clone(),
            besieging_army: ArmyId::parse("Army_4")?,
            defending_garrison: ArmyId::parse("GarrisonArmy_3")?,
            additional_defender: None,
            besieger_owner: CharId::parse("Char_1")?,
            defender_owner: CharId::parse("Char_2")?,
            days: 90.0,
            besieger_casualties: 0,
            defender_casualties: 0,
        },
    );
    if let Some(fief) = state.fiefs.get_mut(&kent) {
        fief.siege = Some(siege_id);
    }

    let mut map = TravelMap::new();
    for (a, b, cost) in ROADS {
        map.connect(&FiefId::parse(a)?, &FiefId::parse(b)?, *cost);
    }

    log::info!(
        "Demo realm: {} fiefs, {} characters, {} armies, {} siege(s)",
        state.fiefs.len(),
        state.characters.len(),
        state.armies.len(),
        state.sieges.len()
    );
    Ok((state, map))
}

/// Orders issued in the first season when no command file is given.
pub fn opening_moves() -> Result<Vec<PlayerInputs>> {
    let army = |id: &str| ArmyId::parse(id);
    Ok(vec![
        PlayerInputs {
            player: CharId::parse("Char_1")?,
            commands: vec![
                Command::Maintain { army: army("Army_1")? },
                Command::Detach {
                    army: army("Army_1")?,
                    troops: vec![0, 20, 0, 40, 0, 100, 50],
                    recipient: CharId::parse("Char_1")?,
                },
                Command::March {
                    army: army("Army_1")?,
                    target: FiefId::parse("MDX01")?,
                    travel_cost: 9.0,
                },
            ],
        },
        PlayerInputs {
            player: CharId::parse("Char_2")?,
            commands: vec![
                Command::StandingOrders {
                    army: army("Army_2")?,
                    aggression: 1,
                    combat_odds: 3,
                },
                Command::Estimate { army: army("Army_4")? },
                Command::MoveWithoutLeader {
                    army: army("Army_2")?,
                    target: FiefId::parse("KNT01")?,
                    travel_cost: 10.0,
                },
            ],
        },
    ])
}

/// Read a JSON array of player inputs.
pub fn load_commands(path: &Path) -> Result<Vec<PlayerInputs>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read commands from {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse commands in {}", path.display()))
}
