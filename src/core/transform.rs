//! Rotation/mirror algebra on integer block coordinates.
//!
//! Y is the vertical axis and is never changed. A transform `(r, m)` rotates
//! first (clockwise seen from above, pivot at the origin) and mirrors second.
//! Translation by pivot and anchor happens in [`transform_around`] and at the
//! call sites that own an anchor.

use glam::IVec3;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid rotation {0:?}, expected one of \"0\", \"90\", \"180\", \"270\"")]
pub struct InvalidRotation(pub String);

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Rotation {
    #[default]
    R0,
    R90,
    R180,
    R270,
}

impl Rotation {
    pub const ALL: [Rotation; 4] = [Rotation::R0, Rotation::R90, Rotation::R180, Rotation::R270];

    pub fn degrees(self) -> u16 {
        self.quarter_turns() as u16 * 90
    }

    fn quarter_turns(self) -> u8 {
        match self {
            Rotation::R0 => 0,
            Rotation::R90 => 1,
            Rotation::R180 => 2,
            Rotation::R270 => 3,
        }
    }

    fn from_quarter_turns(turns: u8) -> Self {
        Self::ALL[(turns % 4) as usize]
    }

    /// Sum of two rotations, mod 360.
    pub fn rotate(self, other: Rotation) -> Rotation {
        Self::from_quarter_turns(self.quarter_turns() + other.quarter_turns())
    }

    pub fn inverse(self) -> Rotation {
        Self::from_quarter_turns(4 - self.quarter_turns())
    }

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Rotation {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Rotation::R0 => "0",
            Rotation::R90 => "90",
            Rotation::R180 => "180",
            Rotation::R270 => "270",
        }
    }
}

impl FromStr for Rotation {
    type Err = InvalidRotation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "0" => Ok(Rotation::R0),
            "90" => Ok(Rotation::R90),
            "180" => Ok(Rotation::R180),
            "270" => Ok(Rotation::R270),
            other => Err(InvalidRotation(other.to_owned())),
        }
    }
}

impl TryFrom<String> for Rotation {
    type Error = InvalidRotation;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Rotation> for String {
    fn from(rotation: Rotation) -> Self {
        rotation.as_str().to_owned()
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mirror {
    #[default]
    None,
    /// Negates X.
    AlongX,
    /// Negates Z.
    AlongZ,
}

impl Mirror {
    pub const ALL: [Mirror; 3] = [Mirror::None, Mirror::AlongX, Mirror::AlongZ];

    fn reflect(self, pos: IVec3) -> IVec3 {
        match self {
            Mirror::None => pos,
            Mirror::AlongX => IVec3::new(-pos.x, pos.y, pos.z),
            Mirror::AlongZ => IVec3::new(pos.x, pos.y, -pos.z),
        }
    }
}

fn rotate(rotation: Rotation, pos: IVec3) -> IVec3 {
    match rotation {
        Rotation::R0 => pos,
        Rotation::R90 => IVec3::new(-pos.z, pos.y, pos.x),
        Rotation::R180 => IVec3::new(-pos.x, pos.y, -pos.z),
        Rotation::R270 => IVec3::new(pos.z, pos.y, -pos.x),
    }
}

/// Rotate, then mirror. Exact integer arithmetic.
pub fn apply(rotation: Rotation, mirror: Mirror, pos: IVec3) -> IVec3 {
    mirror.reflect(rotate(rotation, pos))
}

/// The single transform equivalent to applying `(first_rotation, first_mirror)`
/// and then `(then_rotation, then_mirror)`.
pub fn compose(
    first_rotation: Rotation,
    first_mirror: Mirror,
    then_rotation: Rotation,
    then_mirror: Mirror,
) -> (Rotation, Mirror) {
    // A reflection conjugates a rotation into its inverse, so moving the
    // second rotation past the first mirror inverts it.
    let then_rotation = if first_mirror == Mirror::None {
        then_rotation
    } else {
        then_rotation.inverse()
    };
    let rotation = then_rotation.rotate(first_rotation);
    match (then_mirror, first_mirror) {
        (Mirror::None, m) | (m, Mirror::None) => (rotation, m),
        (a, b) if a == b => (rotation, Mirror::None),
        // Two perpendicular reflections make a half turn.
        _ => (rotation.rotate(Rotation::R180), Mirror::None),
    }
}

pub fn invert(rotation: Rotation, mirror: Mirror) -> (Rotation, Mirror) {
    match mirror {
        Mirror::None => (rotation.inverse(), Mirror::None),
        // (m . r)^-1 = r^-1 . m = m . r
        m => (rotation, m),
    }
}

/// Transform `pos` about `pivot` in the horizontal plane.
pub fn transform_around(rotation: Rotation, mirror: Mirror, pivot: IVec3, pos: IVec3) -> IVec3 {
    let pivot = IVec3::new(pivot.x, 0, pivot.z);
    apply(rotation, mirror, pos - pivot) + pivot
}
