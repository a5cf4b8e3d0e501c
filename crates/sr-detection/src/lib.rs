pub mod clustering;
pub mod data_loader;
pub mod extrema;
pub mod level_projector;
pub mod level_validator;
pub mod strength;
pub mod volume_profile;

pub use clustering::DbscanClusterer;
pub use data_loader::{BarProvider, BarSource, DataLoader, MockBarProvider};
pub use extrema::ExtremaDetector;
pub use level_projector::LevelProjector;
pub use level_validator::LevelValidator;
pub use strength::StrengthCalculator;
pub use volume_profile::{VolumeBin, VolumeProfiler};
