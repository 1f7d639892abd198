//! Normalized cable configuration decoded from a source entity's name.

/// Diameter of the swept cable in meters.
pub const DEFAULT_DIAMETER: f64 = 0.010;
/// Scaling compensation applied to the sweep size, in percent.
pub const DEFAULT_COMPENSATION: f64 = 100.0;
/// Sweep segments along the path.
pub const DEFAULT_STEPS: u32 = 24;
/// Cross-section side count (circle primitive resolution).
pub const DEFAULT_SIDES: u32 = 8;
/// Output polygon type: 1 = subdivision patches, 0 = plain faces.
pub const DEFAULT_POLYGON_TYPE: i32 = 1;

/// Control channel names exposed on a generated assembly container.
pub mod channel {
    pub const DIAMETER: &str = "diameter";
    pub const COMPENSATION: &str = "compensation";
    pub const POLYGON_TYPE: &str = "polygonType";
    pub const STEPS: &str = "steps";
    pub const SIDES: &str = "sides";
    pub const FLIP: &str = "flip";
    pub const MATERIAL_NAME: &str = "materialName";
}

/// Fully-defaulted build configuration for one cable assembly.
///
/// Re-derived from the source entity's name on every run; never persisted.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ParameterSet {
    pub basename: String,
    pub diameter: f64,      // meters
    pub compensation: f64,  // percent
    pub steps: u32,
    pub sides: u32,
    pub flip: bool,
    pub polygon_type: i32,
    pub material: String,
}

impl Default for ParameterSet {
    fn default() -> Self {
        Self {
            basename: String::new(),
            diameter: DEFAULT_DIAMETER,
            compensation: DEFAULT_COMPENSATION,
            steps: DEFAULT_STEPS,
            sides: DEFAULT_SIDES,
            flip: false,
            polygon_type: DEFAULT_POLYGON_TYPE,
            material: String::new(),
        }
    }
}

impl ParameterSet {
    /// Name of the assembly container generated for this configuration.
    pub fn container_name(&self) -> String {
        format!("{}_cable", self.basename)
    }

    /// Base name for a private (independent-mode) profile entity.
    pub fn profile_basename(&self) -> String {
        format!("{}_profile", self.basename)
    }
}
