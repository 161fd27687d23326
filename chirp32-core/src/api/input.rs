//! Input state exposed alongside the audio table.
//!
//! These fields are *unrelated* to the audio engine: they are published in
//! the same device table because the original hardware table interleaves
//! them, and the engine must coexist with them without assuming exclusive
//! ownership of the surrounding structure. The core never interprets them;
//! the host driver writes them, the application reads them.

use bitflags::bitflags;

bitflags! {
    /// Button bitmask as published by the device firmware.
    ///
    /// Bit values are part of the device contract; keep them stable.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Buttons: u32 {
        const DPAD_LEFT  = 1 << 0;
        const DPAD_RIGHT = 1 << 1;
        const DPAD_UP    = 1 << 2;
        const DPAD_DOWN  = 1 << 3;
        const A          = 1 << 4;
        const B          = 1 << 5;
        const X          = 1 << 6;
        const Y          = 1 << 7;
        const MENU       = 1 << 8;
        const HOME       = 1 << 9;
        const JOYSTICK   = 1 << 10;
    }
}

impl Default for Buttons {
    fn default() -> Self {
        Buttons::empty()
    }
}

/// Analog stick position, each axis in -1.0..=1.0.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

/// Accelerometer tilt vector.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// An RGBA colour as the device palette and LED understand it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Pen {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

/// Snapshot of the device's user-facing input and feedback state.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct InputState {
    pub buttons: Buttons,
    pub joystick: Vec2,
    pub tilt: Vec3,
    /// Rumble strength, 0.0..=1.0. Written by the application, consumed by
    /// the host driver.
    pub vibration: f32,
    /// Front LED colour. Same ownership as `vibration`.
    pub led: Pen,
}
