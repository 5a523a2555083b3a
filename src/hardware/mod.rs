pub mod camera;
pub mod lens;
pub mod rig;
