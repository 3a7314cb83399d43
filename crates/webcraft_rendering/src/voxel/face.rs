//! Block faces.
//!
//! Indices are fixed by the quad format: positive directions take the axis
//! index, negative directions take `5 - axis`, so `opposite(f) == 5 - f`.

use std::fmt;
use std::str::FromStr;

use crate::error::VoxelError;

/// One of the six faces of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Face {
    /// +X (east).
    Right = 0,
    /// +Y (up).
    Top = 1,
    /// +Z (south).
    Front = 2,
    /// -Z (north).
    Back = 3,
    /// -Y (down).
    Bottom = 4,
    /// -X (west).
    Left = 5,
}

impl Face {
    /// All faces in index order.
    pub const ALL: [Self; 6] = [
        Self::Right,
        Self::Top,
        Self::Front,
        Self::Back,
        Self::Bottom,
        Self::Left,
    ];

    /// Face from its index.
    #[must_use]
    pub const fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Self::Right),
            1 => Some(Self::Top),
            2 => Some(Self::Front),
            3 => Some(Self::Back),
            4 => Some(Self::Bottom),
            5 => Some(Self::Left),
            _ => None,
        }
    }

    /// Index `0..6`.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Single-bit mask `1 << index`, as used by occlusion masks.
    #[inline]
    #[must_use]
    pub const fn bit(self) -> u8 {
        1 << (self as u8)
    }

    /// The face pointing the other way.
    #[inline]
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Right => Self::Left,
            Self::Top => Self::Bottom,
            Self::Front => Self::Back,
            Self::Back => Self::Front,
            Self::Bottom => Self::Top,
            Self::Left => Self::Right,
        }
    }

    /// Axis the face is perpendicular to: 0 = X, 1 = Y, 2 = Z.
    #[inline]
    #[must_use]
    pub const fn axis(self) -> usize {
        let i = self as usize;
        if i < 3 {
            i
        } else {
            5 - i
        }
    }

    /// True for +X, +Y and +Z.
    #[inline]
    #[must_use]
    pub const fn is_positive(self) -> bool {
        (self as u8) < 3
    }

    /// Unit normal.
    #[must_use]
    pub const fn normal(self) -> [i32; 3] {
        match self {
            Self::Right => [1, 0, 0],
            Self::Top => [0, 1, 0],
            Self::Front => [0, 0, 1],
            Self::Back => [0, 0, -1],
            Self::Bottom => [0, -1, 0],
            Self::Left => [-1, 0, 0],
        }
    }

    /// Canonical lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Right => "right",
            Self::Top => "top",
            Self::Front => "front",
            Self::Back => "back",
            Self::Bottom => "bottom",
            Self::Left => "left",
        }
    }
}

impl fmt::Display for Face {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Face {
    type Err = VoxelError;

    /// Accepts both relative names and compass names (`east`, `up`, ...).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "right" | "east" => Ok(Self::Right),
            "top" | "up" => Ok(Self::Top),
            "front" | "south" => Ok(Self::Front),
            "back" | "north" => Ok(Self::Back),
            "bottom" | "down" => Ok(Self::Bottom),
            "left" | "west" => Ok(Self::Left),
            other => Err(VoxelError::UnknownFace(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opposite_is_five_minus_index() {
        for face in Face::ALL {
            assert_eq!(face.opposite().index(), 5 - face.index());
            assert_eq!(face.opposite().opposite(), face);
        }
    }

    #[test]
    fn test_axis_and_normal_agree() {
        for face in Face::ALL {
            let n = face.normal();
            assert_eq!(n[face.axis()].abs(), 1);
            assert_eq!(n[face.axis()] > 0, face.is_positive());
            assert_eq!(face.axis(), face.opposite().axis());
        }
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("east".parse::<Face>().unwrap(), Face::Right);
        assert_eq!("down".parse::<Face>().unwrap(), Face::Bottom);
        for face in Face::ALL {
            assert_eq!(face.name().parse::<Face>().unwrap(), face);
            assert_eq!(Face::from_index(face as u8), Some(face));
        }
        assert!("sideways".parse::<Face>().is_err());
        assert_eq!(Face::from_index(6), None);
    }
}
