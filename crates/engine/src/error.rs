use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupError {
    /// The index is already a member of another group.
    IndexAlreadyGrouped { index: usize, group: String },
    /// A group needs at least one member.
    EmptySpan,
    /// No group matched the given reference.
    UnknownGroup(String),
    /// The index is not a member of the group.
    NotAMember { index: usize, group: String },
    /// The group is unbreakable and the operation would change its membership.
    Unbreakable(String),
    /// Rows would be dropped strictly inside this group.
    NestedGroup(String),
    /// Persisted state could not be decoded.
    InvalidState { key: String, message: String },
}

impl fmt::Display for GroupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IndexAlreadyGrouped { index, group } => {
                write!(f, "index {index} already belongs to group '{group}'")
            }
            Self::EmptySpan => write!(f, "a group needs at least one member"),
            Self::UnknownGroup(group) => write!(f, "unknown group: {group}"),
            Self::NotAMember { index, group } => {
                write!(f, "index {index} is not a member of group '{group}'")
            }
            Self::Unbreakable(group) => write!(f, "group '{group}' is unbreakable"),
            Self::NestedGroup(group) => write!(f, "cannot place a group inside group '{group}'"),
            Self::InvalidState { key, message } => {
                write!(f, "invalid group state at '{key}': {message}")
            }
        }
    }
}

impl std::error::Error for GroupError {}
