//! Signal kinds, the three-tier category taxonomy, and status enums for Argus.
//!
//! Domain enums use `snake_case` serialization. The category taxonomy uses
//! `SCREAMING_SNAKE_CASE` (`TEXT`, `PERSON`, `LICENSE_PLATE`) because catalog
//! files are written that way. Status enums with state machines provide
//! `allowed_next_states()` to enforce valid transitions.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// Implements `as_str`, `Display`, `FromStr`, and `ALL` for a fieldless enum.
macro_rules! string_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// Every variant in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let needle = s.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(needle))
                    .ok_or_else(|| {
                        CoreError::Parse(format!(
                            "unknown {} '{needle}'",
                            stringify!($name)
                        ))
                    })
            }
        }
    };
}

// ---------------------------------------------------------------------------
// SignalKind
// ---------------------------------------------------------------------------

/// Kind of a subject signal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    Name,
    Phone,
    Email,
    Handle,
    Location,
    Vehicle,
    FreeText,
    Image,
}

string_enum!(SignalKind {
    Name => "name",
    Phone => "phone",
    Email => "email",
    Handle => "handle",
    Location => "location",
    Vehicle => "vehicle",
    FreeText => "free_text",
    Image => "image",
});

// ---------------------------------------------------------------------------
// Category taxonomy
// ---------------------------------------------------------------------------

/// Level 1 of the source taxonomy: the shape of data a source consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataType {
    Text,
    Image,
    Video,
    Location,
    Network,
}

string_enum!(DataType {
    Text => "TEXT",
    Image => "IMAGE",
    Video => "VIDEO",
    Location => "LOCATION",
    Network => "NETWORK",
});

/// Level 2 of the source taxonomy: what kind of entity the source describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    Person,
    Organization,
    Domain,
    Device,
    Address,
    Vehicle,
}

string_enum!(EntityType {
    Person => "PERSON",
    Organization => "ORGANIZATION",
    Domain => "DOMAIN",
    Device => "DEVICE",
    Address => "ADDRESS",
    Vehicle => "VEHICLE",
});

/// Level 3 of the source taxonomy: the specific attribute a source keys on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Attribute {
    Name,
    Email,
    Phone,
    Username,
    Ip,
    Host,
    Url,
    Domain,
    Face,
    Coordinates,
    LicensePlate,
    Text,
}

string_enum!(Attribute {
    Name => "NAME",
    Email => "EMAIL",
    Phone => "PHONE",
    Username => "USERNAME",
    Ip => "IP",
    Host => "HOST",
    Url => "URL",
    Domain => "DOMAIN",
    Face => "FACE",
    Coordinates => "COORDINATES",
    LicensePlate => "LICENSE_PLATE",
    Text => "TEXT",
});

// ---------------------------------------------------------------------------
// HttpMethod
// ---------------------------------------------------------------------------

/// HTTP method used to query a source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
}

string_enum!(HttpMethod {
    Get => "GET",
    Post => "POST",
});

// ---------------------------------------------------------------------------
// Confidence
// ---------------------------------------------------------------------------

/// Confidence attached to an extracted signal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    #[default]
    High,
    Medium,
    Low,
}

string_enum!(Confidence {
    High => "high",
    Medium => "medium",
    Low => "low",
});

// ---------------------------------------------------------------------------
// VisualizationKind
// ---------------------------------------------------------------------------

/// Visualization hint attached to a report section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum VisualizationKind {
    Map,
    PieChart,
    BarChart,
    Timeline,
    NetworkGraph,
    BulletList,
}

string_enum!(VisualizationKind {
    Map => "map",
    PieChart => "pie_chart",
    BarChart => "bar_chart",
    Timeline => "timeline",
    NetworkGraph => "network_graph",
    BulletList => "bullet_list",
});

// ---------------------------------------------------------------------------
// ExecutionStatus
// ---------------------------------------------------------------------------

/// Status of a workflow execution.
///
/// ```text
/// pending → running → succeeded
///                   → failed
///                   → partial
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Partial,
}

string_enum!(ExecutionStatus {
    Pending => "pending",
    Running => "running",
    Succeeded => "succeeded",
    Failed => "failed",
    Partial => "partial",
});

impl ExecutionStatus {
    /// Valid next states from the current state.
    #[must_use]
    pub const fn allowed_next_states(self) -> &'static [Self] {
        match self {
            Self::Pending => &[Self::Running],
            Self::Running => &[Self::Succeeded, Self::Failed, Self::Partial],
            Self::Succeeded | Self::Failed | Self::Partial => &[],
        }
    }

    /// Check whether transitioning to `next` is allowed.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.allowed_next_states().contains(&next)
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Partial)
    }
}

// ---------------------------------------------------------------------------
// StepStatus
// ---------------------------------------------------------------------------

/// Status recorded in a workflow step log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Succeeded,
    Failed,
    /// The step's condition evaluated to false.
    Skipped,
}

string_enum!(StepStatus {
    Succeeded => "succeeded",
    Failed => "failed",
    Skipped => "skipped",
});

// ---------------------------------------------------------------------------
// Workflow knobs
// ---------------------------------------------------------------------------

/// Operator-facing complexity tier of a workflow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowLevel {
    #[default]
    Basic,
    Intermediate,
    Expert,
}

string_enum!(WorkflowLevel {
    Basic => "basic",
    Intermediate => "intermediate",
    Expert => "expert",
});

/// What the sequencer does when a step fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    #[default]
    Halt,
    Continue,
}

string_enum!(FailurePolicy {
    Halt => "halt",
    Continue => "continue",
});

/// Unit of a schedule interval.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Minutes,
    Hourly,
    #[default]
    Daily,
    Weekly,
    /// Approximated as 30 days.
    Monthly,
}

string_enum!(Frequency {
    Minutes => "minutes",
    Hourly => "hourly",
    Daily => "daily",
    Weekly => "weekly",
    Monthly => "monthly",
});
