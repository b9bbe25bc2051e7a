use crate::{Key, LightColor, Simulation};
use serde_json::json;

/// Builds a JSON snapshot of the vehicles and traffic lights in the current frame.
pub(crate) fn frame_json(sim: &Simulation) -> serde_json::Value {
    let vehicles = sim
        .iter_vehicles()
        .map(|vehicle| {
            let lane_change = sim.lane_change(vehicle.vehicle_id).copied().unwrap_or_default();
            json!({
                "id": vehicle.vehicle_id.data().as_ffi(),
                "lane": vehicle.lane_index,
                "pos": vehicle.position_m,
                "vel": vehicle.speed_mps,
                "acc": vehicle.acceleration_mps2,
                "lane_change": lane_change.active.then(|| json!({
                    "from": lane_change.source_lane,
                    "to": lane_change.target_lane,
                    "lateral": lane_change.lateral_fraction(),
                })),
            })
        })
        .collect::<Vec<_>>();

    let lights = sim
        .iter_light_groups()
        .map(|(params, state)| {
            let color = match state.color(params) {
                LightColor::Green => "green",
                LightColor::Amber => "amber",
                LightColor::Red => "red",
            };
            json!({ "t": state.time_in_cycle_s, "color": color })
        })
        .collect::<Vec<_>>();

    json!({
        "frame": sim.frame(),
        "time": sim.time(),
        "vehicles": vehicles,
        "lights": lights,
    })
}
