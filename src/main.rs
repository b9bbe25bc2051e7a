use std::time::Instant;

use lane_traffic::{Simulation, TrafficLightGroupParameters, VehicleAttributes};
use rand::{Rng, SeedableRng};

const LANES: usize = 3;
const LANE_LENGTH: f64 = 5000.0;
const VEHICLES_PER_LANE: usize = 400;

fn build_ring_road() -> lane_traffic::Result<Simulation> {
    let mut sim = Simulation::new();
    let lanes = (0..LANES)
        .map(|_| sim.add_lane(LANE_LENGTH, 27.0))
        .collect::<lane_traffic::Result<Vec<_>>>()?;
    for (i, &lane) in lanes.iter().enumerate() {
        let left = i.checked_sub(1).map(|j| lanes[j]);
        let right = lanes.get(i + 1).copied();
        sim.set_adjacent_lanes(lane, left, right)?;
    }

    let mut rng = rand::rngs::StdRng::seed_from_u64(42);
    let attributes = VehicleAttributes::default();
    let spacing = LANE_LENGTH / VEHICLES_PER_LANE as f64;
    for &lane in &lanes {
        for i in 0..VEHICLES_PER_LANE {
            let pos = i as f64 * spacing + rng.gen_range(0.0..0.25 * spacing);
            sim.add_vehicle(&attributes, lane, pos, rng.gen_range(10.0..25.0))?;
        }
    }
    sim.randomise_desired_speeds_with(0.1, &mut rng)?;
    sim.add_light_group(TrafficLightGroupParameters::default())?;
    Ok(sim)
}

fn main() -> lane_traffic::Result<()> {
    let mut sim = build_ring_road()?;

    println!("Simulating...");
    let num_frames = 1000;
    loop {
        let start = Instant::now();
        for _ in 0..num_frames {
            sim.step(0.05);
        }
        let frame = start.elapsed() / num_frames;
        let changing = sim
            .vehicle_store()
            .lane_changes()
            .iter()
            .filter(|lc| lc.active)
            .count();
        println!(
            "Avg. frame: {:?} --> {}x speedup ({:.0} vehs --> {:.0} vehs, {} changing lanes)",
            frame,
            0.05 / frame.as_secs_f32(),
            sim.iter_vehicles().count(),
            0.05 / frame.as_secs_f32() * (sim.iter_vehicles().count() as f32),
            changing,
        )
    }
}
