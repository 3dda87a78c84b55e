use std::collections::VecDeque;

use serde::Deserialize;

use crate::geometry::{Point, Rect, Size};

/// Fixed flip/rotation between the sensor's native axes and the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    #[default]
    Native,
    /// Panel mounted upside down: both axes mirrored.
    Rotate180,
    MirrorX,
    MirrorY,
    SwapXy,
}

/// Orientation plus the sensor extent the mirroring is measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TouchTransform {
    pub orientation: Orientation,
    pub sensor: Size,
}

impl TouchTransform {
    pub const fn new(orientation: Orientation, sensor: Size) -> Self {
        Self {
            orientation,
            sensor,
        }
    }

    pub const fn identity(sensor: Size) -> Self {
        Self::new(Orientation::Native, sensor)
    }

    pub fn apply(&self, raw: Point) -> Point {
        let Size { width, height } = self.sensor;
        match self.orientation {
            Orientation::Native => raw,
            Orientation::Rotate180 => {
                Point::new(width.saturating_sub(raw.x), height.saturating_sub(raw.y))
            }
            Orientation::MirrorX => Point::new(width.saturating_sub(raw.x), raw.y),
            Orientation::MirrorY => Point::new(raw.x, height.saturating_sub(raw.y)),
            Orientation::SwapXy => Point::new(raw.y, raw.x),
        }
    }
}

/// Map a raw sensor point to the index of the first rectangle containing it.
pub fn resolve(raw: Point, transform: &TouchTransform, rects: &[Rect]) -> Option<usize> {
    let point = transform.apply(raw);
    rects.iter().position(|rect| rect.contains(point))
}

/// One reading from the touch sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TouchSample {
    pub touched: bool,
    pub point: Point,
}

impl TouchSample {
    pub const fn pressed(x: u16, y: u16) -> Self {
        Self {
            touched: true,
            point: Point::new(x, y),
        }
    }

    pub const fn released() -> Self {
        Self {
            touched: false,
            point: Point::new(0, 0),
        }
    }
}

/// Touch sensor capability polled once per loop iteration.
pub trait TouchSensor {
    fn read(&mut self) -> TouchSample;
}

/// Replays queued samples, then reports no touch.
#[derive(Debug, Default)]
pub struct ScriptedTouch {
    samples: VecDeque<TouchSample>,
}

impl ScriptedTouch {
    pub fn new(samples: impl IntoIterator<Item = TouchSample>) -> Self {
        Self {
            samples: samples.into_iter().collect(),
        }
    }

    pub fn push(&mut self, sample: TouchSample) {
        self.samples.push_back(sample);
    }

    pub fn remaining(&self) -> usize {
        self.samples.len()
    }
}

impl TouchSensor for ScriptedTouch {
    fn read(&mut self) -> TouchSample {
        self.samples.pop_front().unwrap_or_else(TouchSample::released)
    }
}

/// Wait state that turns a touch-and-hold into a single toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TouchGate {
    #[default]
    Ready,
    AwaitingRelease,
}

impl TouchGate {
    /// Pass a pressed sample through, or swallow it while a press is held.
    pub fn admit(&mut self, sample: TouchSample) -> Option<Point> {
        match (*self, sample.touched) {
            (TouchGate::AwaitingRelease, false) => {
                *self = TouchGate::Ready;
                None
            }
            (TouchGate::AwaitingRelease, true) => None,
            (TouchGate::Ready, true) => Some(sample.point),
            (TouchGate::Ready, false) => None,
        }
    }

    /// Block further touches until the sensor reports a release.
    pub fn hold(&mut self) {
        *self = TouchGate::AwaitingRelease;
    }

    pub fn is_holding(&self) -> bool {
        matches!(self, TouchGate::AwaitingRelease)
    }
}
