//! Status vocabulary for generated GFX cards and localization sub-stages.
//!
//! Each status carries its wire identifier (snake_case, matching the JSON
//! representation), a display label, and a colour tag used by whichever
//! front end renders the badge. Lookups are pure and total.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => ($ident:literal, $label:literal, $tag:literal) ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Wire identifier (snake_case).
            pub fn as_str(self) -> &'static str {
                match self {
                    $( $name::$variant => $ident ),+
                }
            }

            /// Human-readable label.
            pub fn label(self) -> &'static str {
                match self {
                    $( $name::$variant => $label ),+
                }
            }

            fn tag(self) -> &'static str {
                match self {
                    $( $name::$variant => $tag ),+
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
                match s {
                    $( $ident => Ok($name::$variant), )+
                    other => Err(CoreError::Validation(format!(
                        "Invalid {} '{other}'. Must be one of: {}",
                        stringify!($name),
                        [$($ident),+].join(", ")
                    ))),
                }
            }
        }
    };
}

define_status_enum! {
    /// Lifecycle state of a language's generated asset.
    GfxStatus {
        NotStarted => ("not_started", "Not Started", "gray"),
        Queued => ("queued", "Queued", "blue"),
        Generating => ("generating", "Generating", "yellow"),
        /// Part of the vocabulary but never produced by any transition.
        Completed => ("completed", "Completed", "green"),
        Failed => ("failed", "Failed", "red"),
        NeedsReview => ("needs_review", "Needs Review", "purple"),
        Approved => ("approved", "Approved", "emerald"),
        Rejected => ("rejected", "Rejected", "orange"),
        Delivered => ("delivered", "Delivered", "indigo"),
    }
}

define_status_enum! {
    /// Progress of an external localization pipeline step.
    SubStageStatus {
        Completed => ("completed", "Completed", "done"),
        InProgress => ("in_progress", "In Progress", "spinner"),
        Pending => ("pending", "Pending", "empty"),
    }
}

impl GfxStatus {
    /// Colour tag for the status badge.
    pub fn color_tag(self) -> &'static str {
        self.tag()
    }

    /// Whether a language in this status is promoted into the review set.
    ///
    /// True once the status has ever reached `needs_review`. `not_started`,
    /// `queued` and `failed` stay on the language row only.
    pub fn is_review_eligible(self) -> bool {
        matches!(
            self,
            GfxStatus::NeedsReview
                | GfxStatus::Approved
                | GfxStatus::Rejected
                | GfxStatus::Generating
                | GfxStatus::Delivered
        )
    }

    /// Whether a generation is pending or running.
    pub fn is_in_flight(self) -> bool {
        matches!(self, GfxStatus::Queued | GfxStatus::Generating)
    }
}

impl Default for GfxStatus {
    fn default() -> Self {
        GfxStatus::NotStarted
    }
}

impl SubStageStatus {
    /// Icon hint for the sub-stage checklist (`done`, `spinner`, `empty`).
    pub fn icon(self) -> &'static str {
        self.tag()
    }
}
