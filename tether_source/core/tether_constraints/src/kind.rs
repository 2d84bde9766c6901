//! Static registry of constraint kinds. This is the list the "add constraint"
//! menus are built from; adding a kind means adding a variant here and in
//! [`crate::Constraint`].

use std::fmt;
use std::str::FromStr;

/// Transform channel a constraint writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Channel {
    Position,
    Rotation,
    Scale,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Channel::Position => "position",
            Channel::Rotation => "rotation",
            Channel::Scale => "scale",
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConstraintKind {
    CopyPosition,
    CopyRotation,
    CopyScale,
    LookAt,
}

impl ConstraintKind {
    pub const ALL: [ConstraintKind; 4] = [
        ConstraintKind::CopyPosition,
        ConstraintKind::CopyRotation,
        ConstraintKind::CopyScale,
        ConstraintKind::LookAt,
    ];

    /// Tag used in persisted records (`"type"` field).
    pub const fn tag(self) -> &'static str {
        match self {
            ConstraintKind::CopyPosition => "copy_position",
            ConstraintKind::CopyRotation => "copy_rotation",
            ConstraintKind::CopyScale => "copy_scale",
            ConstraintKind::LookAt => "look_at",
        }
    }

    pub const fn menu_path(self) -> &'static str {
        match self {
            ConstraintKind::CopyPosition => "Tether/Copy Position",
            ConstraintKind::CopyRotation => "Tether/Copy Rotation",
            ConstraintKind::CopyScale => "Tether/Copy Scale",
            ConstraintKind::LookAt => "Tether/Look At",
        }
    }

    /// Last segment of the menu path.
    pub fn display_name(self) -> &'static str {
        let path = self.menu_path();
        path.rsplit('/').next().unwrap_or(path)
    }

    pub const fn channel(self) -> Channel {
        match self {
            ConstraintKind::CopyPosition => Channel::Position,
            ConstraintKind::CopyRotation | ConstraintKind::LookAt => Channel::Rotation,
            ConstraintKind::CopyScale => Channel::Scale,
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for ConstraintKind {
    type Err = String;

    /// Accepts a tag (`look_at`) or a display name (`Look At`, any case).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::from_tag(s)
            .or_else(|| {
                Self::ALL
                    .into_iter()
                    .find(|kind| kind.display_name().eq_ignore_ascii_case(s))
            })
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(|k| k.tag()).collect();
                format!("unknown constraint kind `{s}` (expected one of: {})", known.join(", "))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_are_unique_and_parse_back() {
        for kind in ConstraintKind::ALL {
            assert_eq!(ConstraintKind::from_tag(kind.tag()), Some(kind));
            assert_eq!(kind.tag().parse::<ConstraintKind>().unwrap(), kind);
        }
        let tags: std::collections::HashSet<&str> =
            ConstraintKind::ALL.iter().map(|k| k.tag()).collect();
        assert_eq!(tags.len(), ConstraintKind::ALL.len());
    }

    #[test]
    fn display_name_is_last_menu_segment() {
        assert_eq!(ConstraintKind::LookAt.display_name(), "Look At");
        assert_eq!(ConstraintKind::CopyScale.to_string(), "Copy Scale");
        assert_eq!("copy position".parse::<ConstraintKind>().unwrap(), ConstraintKind::CopyPosition);
    }

    #[test]
    fn unknown_kind_lists_known_tags() {
        let err = "aim_at".parse::<ConstraintKind>().unwrap_err();
        assert!(err.contains("aim_at"));
        assert!(err.contains("look_at"));
    }

    #[test]
    fn look_at_writes_rotation() {
        assert_eq!(ConstraintKind::LookAt.channel(), Channel::Rotation);
        assert_eq!(ConstraintKind::CopyScale.channel(), Channel::Scale);
    }
}
