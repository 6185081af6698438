/// Fixed timestep: 60 Hz
pub const TICK_RATE: f32 = 60.0;
pub const DT: f32 = 1.0 / TICK_RATE;

/// Sentinel id for a handle whose object has been destroyed. External code
/// holding a stale handle sees this id and knows the object is gone.
pub const DEAD_OBJECT_ID: u64 = u64::MAX;

/// Sentinel for a slot that has no handle assigned yet.
pub const NULL_HANDLE_INDEX: usize = usize::MAX;

/// Margin outside a pool's boundary box before an object is marked for
/// destruction (lets bullets drift fully off-screen first).
pub const BOUNDS_MARGIN: f32 = 32.0;

/// Player movement speeds (units/second)
pub const PLAYER_SPEED: f32 = 220.0;
pub const PLAYER_FOCUS_SPEED: f32 = 90.0;
