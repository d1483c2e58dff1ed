//! Named viewpoints for view captures
//!
//! Mirrors the standard view menu of a CAD application: each name fixes the
//! direction the camera looks from and which way is up.

use glam::DVec3;

/// Standard viewing directions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewName {
    /// Looking from front-right-top (default)
    #[default]
    Isometric,

    /// Looking from -Y toward +Y
    Front,

    /// Looking down from +Z
    Top,

    /// Looking from +X
    Right,

    /// Looking from +Y
    Back,

    /// Looking from -X
    Left,

    /// Looking up from -Z
    Bottom,

    /// Two equal axis foreshortenings
    Dimetric,

    /// Three distinct axis foreshortenings
    Trimetric,
}

impl ViewName {
    /// Unit direction from the scene toward the camera
    pub fn eye_direction(self) -> DVec3 {
        let dir = match self {
            Self::Isometric => DVec3::new(1.0, -1.0, 1.0),
            Self::Front => DVec3::NEG_Y,
            Self::Top => DVec3::Z,
            Self::Right => DVec3::X,
            Self::Back => DVec3::Y,
            Self::Left => DVec3::NEG_X,
            Self::Bottom => DVec3::NEG_Z,
            Self::Dimetric => DVec3::new(1.0, -1.0, 0.5),
            Self::Trimetric => DVec3::new(1.0, -2.0, 1.5),
        };
        dir.normalize()
    }

    /// Screen-up direction in world space
    pub fn up(self) -> DVec3 {
        match self {
            Self::Top => DVec3::Y,
            Self::Bottom => DVec3::NEG_Y,
            _ => DVec3::Z,
        }
    }

    /// Camera basis `(right, up, forward)`, forward pointing into the scene
    pub fn basis(self) -> (DVec3, DVec3, DVec3) {
        let forward = -self.eye_direction();
        let right = forward.cross(self.up()).normalize();
        let up = right.cross(forward);
        (right, up, forward)
    }

    /// Parse a view name
    ///
    /// Accepts case-insensitive names: "isometric" (or "iso"), "front",
    /// "top", "right", "back", "left", "bottom", "dimetric", "trimetric".
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "isometric" | "iso" => Some(Self::Isometric),
            "front" => Some(Self::Front),
            "top" => Some(Self::Top),
            "right" => Some(Self::Right),
            "back" | "rear" => Some(Self::Back),
            "left" => Some(Self::Left),
            "bottom" => Some(Self::Bottom),
            "dimetric" => Some(Self::Dimetric),
            "trimetric" => Some(Self::Trimetric),
            _ => None,
        }
    }

    /// Get all available view names
    pub fn all_names() -> &'static [&'static str] {
        &[
            "Isometric", "Front", "Top", "Right", "Back", "Left", "Bottom", "Dimetric",
            "Trimetric",
        ]
    }
}

impl std::str::FromStr for ViewName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| {
            format!(
                "Invalid view name '{}'. Valid options: {}",
                s,
                Self::all_names().join(", ")
            )
        })
    }
}

impl std::fmt::Display for ViewName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Isometric => "Isometric",
            Self::Front => "Front",
            Self::Top => "Top",
            Self::Right => "Right",
            Self::Back => "Back",
            Self::Left => "Left",
            Self::Bottom => "Bottom",
            Self::Dimetric => "Dimetric",
            Self::Trimetric => "Trimetric",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_parse_views() {
        assert_eq!(ViewName::parse("Isometric"), Some(ViewName::Isometric));
        assert_eq!(ViewName::parse("FRONT"), Some(ViewName::Front));
        assert_eq!(ViewName::parse("iso"), Some(ViewName::Isometric));
        assert_eq!(ViewName::parse("sideways"), None);
        assert!("sideways".parse::<ViewName>().is_err());
    }

    #[test]
    fn test_display_roundtrips_through_parse() {
        for name in ViewName::all_names() {
            let view = ViewName::parse(name).unwrap();
            assert_eq!(view.to_string(), *name);
        }
    }

    #[test]
    fn test_basis_is_orthonormal() {
        for name in ViewName::all_names() {
            let (right, up, forward) = ViewName::parse(name).unwrap().basis();
            assert_relative_eq!(right.dot(up), 0.0, epsilon = 1e-9);
            assert_relative_eq!(right.dot(forward), 0.0, epsilon = 1e-9);
            assert_relative_eq!(up.length(), 1.0, epsilon = 1e-9);
        }
    }
}
