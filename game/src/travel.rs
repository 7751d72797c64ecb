//! Column travel times.
//!
//! A marching column moves at the pace of its slowest unit; the game client
//! computes the same figure before the server validates it.

use async_trait::async_trait;

use crate::error::GameError;
use crate::services::TravelCalculator;
use crate::types::{OrderType, Preset, UnitKind};

/// Minutes per field for each unit kind at world speed 1.
fn pace_minutes(unit: UnitKind) -> f64 {
    match unit {
        UnitKind::Spear => 18.0,
        UnitKind::Sword => 22.0,
        UnitKind::Axe => 18.0,
        UnitKind::Archer => 18.0,
        UnitKind::LightCavalry => 8.0,
        UnitKind::MountedArcher => 10.0,
        UnitKind::HeavyCavalry => 11.0,
        UnitKind::Ram => 30.0,
        UnitKind::Catapult => 30.0,
        UnitKind::Knight => 10.0,
        UnitKind::Snob => 35.0,
        UnitKind::Trebuchet => 50.0,
        UnitKind::Doppelsoldner => 18.0,
    }
}

pub struct ArmyTravelCalculator {
    world_speed: f64,
}

impl ArmyTravelCalculator {
    pub fn new(world_speed: f64) -> Self {
        Self { world_speed }
    }
}

impl Default for ArmyTravelCalculator {
    fn default() -> Self {
        Self::new(1.0)
    }
}

#[async_trait]
impl TravelCalculator for ArmyTravelCalculator {
    async fn travel_time(
        &self,
        preset: &Preset,
        distance: f64,
        _order: OrderType,
    ) -> Result<f64, GameError> {
        let slowest = preset
            .units
            .keys()
            .map(|unit| pace_minutes(*unit))
            .fold(0.0_f64, f64::max);

        Ok(distance * slowest * 60.0 / self.world_speed)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn preset(units: &[(UnitKind, u32)]) -> Preset {
        Preset {
            id: 1,
            name: "raid".into(),
            units: units.iter().copied().collect::<HashMap<_, _>>(),
        }
    }

    #[tokio::test]
    async fn slowest_unit_sets_the_pace() {
        let calc = ArmyTravelCalculator::default();
        let p = preset(&[(UnitKind::LightCavalry, 50), (UnitKind::Ram, 2)]);

        let secs = calc.travel_time(&p, 4.0, OrderType::Attack).await.unwrap();

        // Rams at 30 min/field dominate the cavalry.
        assert_eq!(secs, 4.0 * 30.0 * 60.0);
    }

    #[tokio::test]
    async fn world_speed_divides_travel_time() {
        let calc = ArmyTravelCalculator::new(2.0);
        let p = preset(&[(UnitKind::LightCavalry, 50)]);

        let secs = calc.travel_time(&p, 10.0, OrderType::Attack).await.unwrap();

        assert_eq!(secs, 10.0 * 8.0 * 60.0 / 2.0);
    }

    #[tokio::test]
    async fn empty_preset_travels_instantly() {
        let calc = ArmyTravelCalculator::default();
        let p = preset(&[]);

        let secs = calc.travel_time(&p, 10.0, OrderType::Attack).await.unwrap();

        assert_eq!(secs, 0.0);
    }
}
