//! Scene data: transform hierarchy and cameras

pub mod camera;
pub mod transform;

pub use camera::{CameraProjection, MainCameraSlot, OrthographicCamera, PerspectiveCamera};
pub use transform::{TransformHierarchy, TransformKey, TransformNode};
