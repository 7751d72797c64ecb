//! Property tests over the pure core: preset priority, target sort
//! stability and cursor arithmetic.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use proptest::prelude::*;

use game::error::GameError;
use game::services::TravelCalculator;
use game::types::{
    MapVillage, OrderType, Position, Preset, UnitAvailability, UnitCounts, UnitKind, Village,
};
use scheduler::presets::{PresetChoice, select_preset};
use scheduler::targets::TargetDirectory;

struct InstantTravel;

#[async_trait]
impl TravelCalculator for InstantTravel {
    async fn travel_time(
        &self,
        _preset: &Preset,
        _distance: f64,
        _order: OrderType,
    ) -> Result<f64, GameError> {
        Ok(0.0)
    }
}

fn preset(id: u64, cavalry: u32) -> Preset {
    Preset {
        id,
        name: "raid".into(),
        units: HashMap::from([(UnitKind::LightCavalry, cavalry)]),
    }
}

fn run<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("test runtime")
        .block_on(future)
}

proptest! {
    #[test]
    fn first_sufficient_preset_is_always_selected(
        requirements in proptest::collection::vec(1u32..100, 1..10),
        available in 1u32..100,
    ) {
        let presets: Vec<Preset> = requirements
            .iter()
            .enumerate()
            .map(|(i, required)| preset(i as u64, *required))
            .collect();
        let units: UnitCounts = HashMap::from([(
            UnitKind::LightCavalry,
            UnitAvailability { in_town: available, support: 0 },
        )]);

        let choice = run(select_preset(
            &presets,
            &units,
            Position::new(500, 500),
            Position::new(503, 500),
            Duration::from_secs(3600),
            &InstantTravel,
        ))
        .unwrap();

        match requirements.iter().position(|required| *required <= available) {
            Some(index) => prop_assert_eq!(choice, PresetChoice::Selected(presets[index].clone())),
            None => prop_assert_eq!(choice, PresetChoice::NoUnits),
        }
    }

    #[test]
    fn target_lists_sort_ascending_with_stable_ties(
        offsets in proptest::collection::vec(
            (-10i32..=10).prop_filter("not the origin", |dx| *dx != 0),
            1..20,
        ),
    ) {
        let origin = Village { id: 1_000_000, name: "Origin".into(), x: 500, y: 500 };
        let snapshot: Vec<MapVillage> = offsets
            .iter()
            .enumerate()
            .map(|(i, dx)| MapVillage {
                id: i as u64,
                name: format!("{i}"),
                x: 500 + *dx,
                y: 500,
                character_id: None,
            })
            .collect();

        let mut directory = TargetDirectory::new();
        prop_assert!(directory.build(&origin, snapshot, 0.0, 10.0, &HashSet::new()));

        let entries = directory.get(1_000_000).unwrap().entries().to_vec();
        for pair in entries.windows(2) {
            prop_assert!(pair[0].distance <= pair[1].distance);
            if pair[0].distance == pair[1].distance {
                // Stable sort: equal distances keep snapshot order, which is
                // id order here.
                prop_assert!(pair[0].id < pair[1].id);
            }
        }
    }

    #[test]
    fn cursor_advances_modulo_the_list_length(
        len in 1usize..8,
        advances in 0usize..40,
    ) {
        let origin = Village { id: 999, name: "Origin".into(), x: 500, y: 500 };
        let snapshot: Vec<MapVillage> = (0..len)
            .map(|i| MapVillage {
                id: i as u64,
                name: format!("{i}"),
                x: 500 + i as i32 + 1,
                y: 500,
                character_id: None,
            })
            .collect();

        let mut directory = TargetDirectory::new();
        prop_assert!(directory.build(&origin, snapshot, 0.0, 10.0, &HashSet::new()));

        for _ in 0..advances {
            directory.advance(999, &HashSet::new(), false);
        }

        prop_assert_eq!(directory.get(999).unwrap().cursor(), advances % len);
    }
}
