//! Integration tests for floor generation against the bundled content.

use delve::{
    utils, DelveResult, Difficulty, DungeonMapData, Encounter, EncounterCategory, EncounterLibrary, FloorGenerator,
    GenerationConfig, Generator, MonsterLibrary, NodeStatus, NodeType, PartyConfig,
};
use proptest::prelude::*;
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};

fn generate(config: &GenerationConfig) -> DelveResult<DungeonMapData> {
    generate_with(&EncounterLibrary::builtin()?, config)
}

fn generate_with(encounters: &EncounterLibrary, config: &GenerationConfig) -> DelveResult<DungeonMapData> {
    let monsters = MonsterLibrary::builtin()?;
    let generator = FloorGenerator::new(encounters, &monsters);
    let mut rng = utils::create_rng(config);
    let map = generator.generate(config, &mut rng)?;
    generator.validate(&map, config)?;
    Ok(map)
}

/// A level-1 combat encounter with a single goblin.
fn goblin_fight(name: String, difficulty: &str) -> Encounter {
    serde_json::from_value(json!({
        "name": name,
        "type": "combat",
        "level": 1,
        "difficulty": difficulty,
        "roomDescription": "A goblin blocks the corridor.",
        "xpBudget": 50,
        "monsters": [{"name": "Goblin", "cr": 0.25, "exp": 50, "pb": 2, "count": 1}]
    }))
    .unwrap()
}

fn count_of(map: &DungeonMapData, node_type: NodeType) -> usize {
    map.nodes.iter().filter(|n| n.node_type == node_type).count()
}

fn assert_connected(map: &DungeonMapData) {
    let boss_layer = map.layer_count() - 1;
    let mut from_nodes = BTreeSet::new();
    for node in &map.nodes {
        if node.node_type != NodeType::Start {
            assert!(!node.parents.is_empty(), "{} has no parent", node.id);
        }
        if node.layer != boss_layer {
            assert!(!node.connections.is_empty(), "{} is a dead end", node.id);
        }
        for child in &node.connections {
            from_nodes.insert((node.id.clone(), child.clone()));
            let child = map.node(child).expect("connection to a missing node");
            assert_eq!(child.layer, node.layer + 1);
            assert!(child.parents.contains(&node.id));
        }
    }
    let edges: BTreeSet<_> = map.edges.iter().map(|e| (e.from.clone(), e.to.clone())).collect();
    assert_eq!(edges, from_nodes);
    assert_eq!(edges.len(), map.edges.len());
}

#[test]
fn test_small_floor_example() -> DelveResult<()> {
    let config = GenerationConfig::for_testing(2024).with_party(PartyConfig::new(4, 1));
    let map = generate(&config)?;

    assert_eq!(count_of(&map, NodeType::Start), 1);
    assert_eq!(count_of(&map, NodeType::Boss), 1);
    assert_eq!(map.start().map(|n| n.layer), Some(0));
    assert_eq!(map.boss().map(|n| n.layer), Some(config.layers_per_floor));
    assert_eq!(map.layer_count(), config.layers_per_floor + 1);
    assert_eq!(map.nodes_in_layer(1).count(), 3);
    assert_eq!(count_of(&map, NodeType::Rest), 1);
    assert!(count_of(&map, NodeType::Treasure) <= 1);
    assert!(count_of(&map, NodeType::Social) <= 1);
    assert!(count_of(&map, NodeType::Exploration) <= 1);
    assert_connected(&map);

    let boss = map.boss().expect("boss node");
    assert!(boss.encounter.is_some());
    assert_eq!(map.current_floor, 1);
    assert_eq!(map.total_floors, 21);
    Ok(())
}

#[test]
fn test_standard_floor_has_content_everywhere() -> DelveResult<()> {
    let map = generate(&GenerationConfig::new(99))?;
    assert_eq!(map.layer_count(), 16);
    assert_connected(&map);

    for node in map.nodes.iter().filter(|n| n.node_type != NodeType::Start) {
        assert!(node.description.is_some(), "{} has no description", node.id);
        let (Some(encounter), Some(original)) = (&node.encounter, &node.original_encounter) else {
            continue;
        };
        assert_eq!(encounter.name, original.name);
        assert!(!encounter.rendered_room_description().contains("{{"));
    }

    let start = map.start().expect("start node");
    assert_eq!(start.status, NodeStatus::Visited);
    let available: Vec<_> = map.available_nodes().map(|n| n.id.as_str()).collect();
    assert_eq!(available, vec!["l1-n0", "l1-n1", "l1-n2"]);
    Ok(())
}

#[test]
fn test_boss_falls_back_to_high_combat() -> DelveResult<()> {
    let fights = (0..24).flat_map(|i| {
        [
            goblin_fight(format!("Skirmish {i}"), "low"),
            goblin_fight(format!("Raid {i}"), "high"),
        ]
    });
    let encounters = EncounterLibrary::new(fights.collect());
    assert!(encounters.by_category(EncounterCategory::Boss).is_empty());

    for seed in 0..8 {
        let map = generate_with(&encounters, &GenerationConfig::for_testing(seed))?;
        let boss = map.boss().expect("boss node");
        let original = boss.original_encounter.as_ref().expect("boss fallback encounter");
        assert_eq!(original.category(), EncounterCategory::Combat);
        assert_eq!(original.difficulty, Difficulty::High);
        assert!(original.name.starts_with("Raid"), "{}", original.name);
        assert!(boss.encounter.is_some());
    }
    Ok(())
}

#[test]
fn test_floor_without_combat_content_still_generates() -> DelveResult<()> {
    let config = GenerationConfig::for_testing(77);

    let bare = EncounterLibrary::new(Vec::new()).without_defaults();
    let map = generate_with(&bare, &config)?;
    assert_connected(&map);
    for node in map.nodes.iter().filter(|n| n.node_type != NodeType::Start) {
        assert!(node.encounter.is_none(), "{} has an encounter", node.id);
        assert!(node.original_encounter.is_none());
        assert_eq!(node.description.as_deref(), Some(node.node_type.placeholder_description()));
    }
    let boss = map.boss().expect("boss node");
    assert_eq!(boss.layer, config.layers_per_floor);
    assert!(boss.encounter.is_none());

    // Stand-ins cover the non-combat rooms, never combat or the boss
    let map = generate_with(&EncounterLibrary::new(Vec::new()), &config)?;
    for node in map.nodes.iter().filter(|n| n.node_type != NodeType::Start) {
        let combat = matches!(node.node_type, NodeType::Combat | NodeType::Boss);
        assert_eq!(node.encounter.is_none(), combat, "{}", node.id);
        assert!(node.description.is_some());
    }
    Ok(())
}

#[test]
fn test_floor_json_round_trip() -> DelveResult<()> {
    let map = generate(&GenerationConfig::for_testing(5))?;
    let json = serde_json::to_value(&map)?;
    assert_eq!(json["bossNodeId"], map.boss_node_id.as_str());
    assert_eq!(json["nodes"][0]["type"], "start");

    let parsed: DungeonMapData = serde_json::from_value(json)?;
    assert_eq!(parsed.edges, map.edges);
    for (a, b) in parsed.nodes.iter().zip(&map.nodes) {
        assert_eq!(a.id, b.id);
        assert_eq!(a.status, b.status);
        assert_eq!(a.encounter, b.encounter);
        assert!((a.x - b.x).abs() < 1e-9 && (a.y - b.y).abs() < 1e-9);
    }
    Ok(())
}

#[test]
fn test_higher_tiers_draw_their_own_content() -> DelveResult<()> {
    for level in [5, 11, 17] {
        let config = GenerationConfig::for_testing(level as u64).with_party(PartyConfig::new(4, level));
        let map = generate(&config)?;
        for encounter in map.nodes.iter().filter_map(|n| n.encounter.as_ref()) {
            assert!(encounter.level <= level, "{} is above level {level}", encounter.name);
            assert_eq!(delve::Tier::of(encounter.level), delve::Tier::of(level));
        }
    }
    Ok(())
}

fn caps_strategy() -> impl Strategy<Value = BTreeMap<String, u32>> {
    (1u32..20, 0u32..4, 0u32..4, 0u32..4, 0u32..4).prop_map(|(combat, rest, treasure, social, exploration)| {
        [
            ("combat", combat),
            ("rest", rest),
            ("treasure", treasure),
            ("social", social),
            ("exploration", exploration),
        ]
        .into_iter()
        .map(|(name, count)| (name.to_string(), count))
        .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_floors_are_connected(seed in any::<u64>(), layers in 2usize..12, level in 1u8..=20) {
        let config = GenerationConfig {
            layers_per_floor: layers,
            ..GenerationConfig::new(seed)
        }
        .with_party(PartyConfig::new(4, level));
        let map = generate(&config).unwrap();

        prop_assert_eq!(map.layer_count(), layers + 1);
        prop_assert_eq!(count_of(&map, NodeType::Start), 1);
        prop_assert_eq!(count_of(&map, NodeType::Boss), 1);
        assert_connected(&map);
    }

    #[test]
    fn prop_caps_are_respected(seed in any::<u64>(), layers in 2usize..16, counts in caps_strategy()) {
        let config = GenerationConfig {
            layers_per_floor: layers,
            node_type_counts: Some(counts.clone()),
            ..GenerationConfig::new(seed)
        };
        let map = generate(&config).unwrap();

        for (name, node_type) in [
            ("rest", NodeType::Rest),
            ("treasure", NodeType::Treasure),
            ("social", NodeType::Social),
            ("exploration", NodeType::Exploration),
        ] {
            prop_assert!(count_of(&map, node_type) <= counts[name] as usize, "{} over cap", name);
        }
    }

    #[test]
    fn prop_rest_layers_are_spaced(seed in any::<u64>(), layers in 4usize..20, rest in 2u32..8) {
        let counts = [("combat", 40), ("rest", rest)]
            .into_iter()
            .map(|(name, count)| (name.to_string(), count))
            .collect();
        let config = GenerationConfig {
            layers_per_floor: layers,
            node_type_counts: Some(counts),
            ..GenerationConfig::new(seed)
        };
        let map = generate(&config).unwrap();

        let rest_layers: Vec<usize> = map
            .nodes
            .iter()
            .filter(|n| n.node_type == NodeType::Rest)
            .map(|n| n.layer)
            .collect();
        let unique: BTreeSet<usize> = rest_layers.iter().copied().collect();
        prop_assert_eq!(unique.len(), rest_layers.len(), "two rests share a layer");
        let sorted: Vec<usize> = unique.into_iter().collect();
        for pair in sorted.windows(2) {
            prop_assert!(pair[1] - pair[0] >= 2, "rests on layers {} and {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn prop_same_seed_same_floor(seed in any::<u64>()) {
        let config = GenerationConfig::for_testing(seed);
        prop_assert_eq!(generate(&config).unwrap(), generate(&config).unwrap());
    }
}
