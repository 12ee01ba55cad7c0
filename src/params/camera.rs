//! Camera projection and orbit control parameters.

/// Perspective camera and orbit control configuration
#[derive(Debug, Clone)]
pub struct CameraParams {
    /// Vertical field of view (degrees)
    pub fov_degrees: f32,

    /// Near clipping plane (world units)
    pub near_plane_m: f32,

    /// Far clipping plane (world units)
    pub far_plane_m: f32,

    /// Initial eye position (world units)
    pub position: [f32; 3],

    /// Orbit pivot (world units)
    pub target: [f32; 3],

    /// Fraction of the pending orbit motion applied per update (0 disables damping)
    pub damping_factor: f32,

    /// Radians of orbit per viewport height dragged, divided by 2π
    pub rotate_speed: f32,

    /// Dolly strength per scroll line
    pub zoom_speed: f32,

    /// Closest allowed orbit distance (world units)
    pub min_distance_m: f32,

    /// Farthest allowed orbit distance (world units)
    pub max_distance_m: f32,
}

impl Default for CameraParams {
    fn default() -> Self {
        Self {
            fov_degrees: 75.0,
            near_plane_m: 0.1,
            far_plane_m: 200.0,
            position: [2.87, 2.87, -0.57],
            target: [0.0, 0.0, 0.0],
            damping_factor: 0.05,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            min_distance_m: 0.5,
            max_distance_m: 150.0, // Inside the far plane so the sea never clips entirely
        }
    }
}
