use strum_macros::{AsRefStr, Display, EnumIter, FromRepr, VariantNames};

/// Phase of the guider.
#[derive(FromRepr, Debug, PartialEq, Clone, Copy, AsRefStr, Display)]
#[repr(u8)]
pub enum GuiderPhase {
    Disconnected = 1,
    Idle = 2,
    Guiding = 3,
}

/// Kind of the exposure.
#[derive(FromRepr, Debug, PartialEq, Clone, Copy, AsRefStr, Display, EnumIter, VariantNames)]
#[repr(u8)]
pub enum ImageKind {
    Light = 1,
    Dark = 2,
    Bias = 3,
    Flat = 4,
}

/// Axis of the image stabilization unit.
#[derive(Debug, PartialEq, Clone, Copy, AsRefStr, Display)]
pub enum Axis {
    X,
    Y,
}

/// Category of a failure. This tells the operator what to do next: check the
/// hardware (and reconnect), try again, or fix the state of the guider (e.g.
/// recalibrate).
#[derive(Debug, PartialEq, Clone, Copy, AsRefStr, Display)]
pub enum FailureCategory {
    Hardware,
    Algorithm,
    Precondition,
}
