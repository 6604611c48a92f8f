//! Hardware drivers for the robot control system.
//!
//! This crate provides drivers for sensors attached to the robot
//! controller, along with the transport boundaries they are written
//! against.
//!
//! # Modules
//!
//! - [`spi`] - SPI transport trait, the free-running accumulation engine,
//!   and a scripted mock transport for tests
//! - [`adxrs450`] - ADXRS450 single-axis SPI rate gyro driver, with a
//!   behavioral simulation of the part
//! - [`gyro`] - the gyro interface the control loop consumes

pub mod adxrs450;
pub mod gyro;
pub mod spi;
