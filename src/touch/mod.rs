//! Touch resolution: orientation correction, hit testing and the
//! touch-and-hold gate.

mod core;

pub use core::{
    Orientation, ScriptedTouch, TouchGate, TouchSample, TouchSensor, TouchTransform, resolve,
};
