/// The outcome of integrating a vehicle's motion over one time step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Motion {
    /// The velocity at the end of the step in m/s.
    pub speed: f64,
    /// The distance travelled during the step in m.
    pub distance: f64,
}

/// Integrates a vehicle's velocity and position, never letting it reverse.
///
/// # Parameters
/// * `speed` - The velocity at the start of the step in m/s
/// * `acc` - The acceleration over the step in m/s<sup>2</sup>
/// * `dt` - The time step in seconds
pub fn integrate(speed: f64, acc: f64, dt: f64) -> Motion {
    let new_speed = f64::max(speed + dt * acc, 0.0);
    Motion {
        speed: new_speed,
        distance: 0.5 * (speed + new_speed) * dt,
    }
}
