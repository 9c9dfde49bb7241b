use thiserror::Error;

use crate::NodeKind;

/// Errors returned by the inventory operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The node doesn't exist, or exists but is excluded by the active
    /// deletion filter.
    #[error("{kind} {id} not found")]
    NotFound { kind: NodeKind, id: String },

    #[error("a {child} can't be placed under a {parent}")]
    InvalidContainment { parent: NodeKind, child: NodeKind },

    #[error("capacity exceeded: {0}")]
    CapacityExceeded(String),

    /// A guarded write matched nothing, as the state it expected has changed
    /// in the meantime.
    #[error("stale update of {path} in branch {branch_id}")]
    StaleUpdate { branch_id: String, path: String },

    #[error("unsupported device type: {0}")]
    UnsupportedDeviceType(String),

    /// A positional path was requested without all indices the kind needs.
    #[error("incomplete position for {kind}: missing {missing} index")]
    IncompletePosition {
        kind: NodeKind,
        missing: &'static str,
    },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Storage(#[from] netinv_docstore::Error),
}

impl Error {
    pub(crate) fn not_found(kind: NodeKind, id: impl Into<String>) -> Self {
        Error::NotFound {
            kind,
            id: id.into(),
        }
    }
}

/// Problems found when checking a node and everything below it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{id}: a {found} can't be placed under a {parent}")]
    WrongKind {
        id: String,
        parent: NodeKind,
        found: NodeKind,
    },

    #[error("{kind} without an id")]
    MissingId { kind: NodeKind },

    #[error("{id}: label must not be empty")]
    EmptyLabel { id: String },

    #[error("{id}: invalid coordinates ({lon}, {lat})")]
    InvalidCoordinates { id: String, lon: f64, lat: f64 },

    #[error("{id}: invalid tcp port 0 for {conn}")]
    InvalidTcpPort { id: String, conn: &'static str },

    #[error("{id}: PON port numbers need to be at least 1")]
    InvalidPonPort { id: String },

    #[error("{id}: duplicate PON port {port}")]
    DuplicatePonPort { id: String, port: u32 },

    #[error("{id}: PON port {port} needs to allow at least one client")]
    InvalidMaxClient { id: String, port: u32 },

    #[error("{id}: tray numbers need to be at least 1")]
    InvalidTray { id: String },

    #[error("{id}: duplicate tray {tray}")]
    DuplicateTray { id: String, tray: u32 },

    #[error("{id}: tray {tray} has invalid core range [{start_core}, {end_core}]")]
    InvalidCoreRange {
        id: String,
        tray: u32,
        start_core: u32,
        end_core: u32,
    },

    #[error("{id}: core {core} is outside of the tray's range [{start_core}, {end_core}]")]
    CoreOutOfRange {
        id: String,
        core: u32,
        start_core: u32,
        end_core: u32,
    },

    #[error("{id}: holds {len} children, but only has room for {capacity}")]
    TooManyChildren { id: String, len: usize, capacity: u32 },

    #[error("{id}: the PON port already hosts a live ODC")]
    PortOccupied { id: String },

    #[error("id {id} is used more than once")]
    DuplicateId { id: String },

    #[error("{field} needs to be between 1 and {max}, got {value}")]
    OutOfBounds {
        field: &'static str,
        value: u32,
        max: u32,
    },
}

impl From<ValidationError> for Error {
    fn from(value: ValidationError) -> Self {
        match value {
            ValidationError::WrongKind { parent, found, .. } => Error::InvalidContainment {
                parent,
                child: found,
            },
            ValidationError::CoreOutOfRange { .. }
            | ValidationError::TooManyChildren { .. }
            | ValidationError::PortOccupied { .. } => Error::CapacityExceeded(value.to_string()),
            _ => Error::InvalidRequest(value.to_string()),
        }
    }
}
