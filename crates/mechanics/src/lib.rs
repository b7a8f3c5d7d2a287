pub mod drivetrain;
pub mod surface;
pub mod torque_curve;
pub mod wheel;
pub mod yaw;

pub use drivetrain::{
    DrivetrainConfig, DrivetrainInput, DrivetrainModel, DrivetrainOutput, EngineConfig, Gear,
    GearRatio, GearRatioTable, GearboxConfig, ShiftOutcome, TorquePolicy, average_wheel_rpm,
};
pub use surface::{SurfaceCatalog, SurfaceProfile};
pub use torque_curve::TorqueCurve;
pub use wheel::{
    Axle, BrakeBiasTarget, BrakeConfig, GripConfig, GripSource, Side, SurfaceContribution,
    WheelConfig, WheelDrive, WheelState, WheelTuning,
};
pub use yaw::YawDampingConfig;
