//! Preset evaluation: which army template, if any, can leave the origin
//! village and reach the target within the travel-time budget.

use std::time::Duration;

use game::error::GameError;
use game::geometry::actual_distance;
use game::services::TravelCalculator;
use game::types::{OrderType, Position, Preset, UnitCounts};

/// Outcome of one evaluation pass.
#[derive(Debug, Clone, PartialEq)]
pub enum PresetChoice {
    /// First registered preset with sufficient troops inside the budget.
    Selected(Preset),
    /// At least one preset had the troops, but none fit the time budget.
    TimeExceeded,
    /// No preset has sufficient troops at all.
    NoUnits,
}

/// Walk `presets` in registration order and take the first that is both
/// troop-sufficient and time-sufficient. Tie-break is strictly registration
/// order; a "better" later preset is never preferred.
pub async fn select_preset(
    presets: &[Preset],
    available: &UnitCounts,
    origin: Position,
    target: Position,
    max_travel_time: Duration,
    travel: &dyn TravelCalculator,
) -> Result<PresetChoice, GameError> {
    let distance = actual_distance(origin, target);
    let mut time_limited = false;

    for preset in presets {
        if !has_units(preset, available) {
            continue;
        }

        let seconds = travel
            .travel_time(preset, distance, OrderType::Attack)
            .await?;

        if seconds <= max_travel_time.as_secs_f64() {
            return Ok(PresetChoice::Selected(preset.clone()));
        }

        time_limited = true;
    }

    Ok(if time_limited {
        PresetChoice::TimeExceeded
    } else {
        PresetChoice::NoUnits
    })
}

fn has_units(preset: &Preset, available: &UnitCounts) -> bool {
    preset
        .units
        .iter()
        .all(|(unit, required)| available.get(unit).is_some_and(|a| a.in_town >= *required))
}
