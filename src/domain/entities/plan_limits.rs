//! Plan policy: the single mapping from a plan tier to its quotas and flags.
//!
//! Every feature gate (wheel count, segment count, images, weights, custom
//! design, statistics) goes through [`resolve_limits`]; nothing else in the
//! crate encodes plan thresholds.

use serde::Serialize;
use strum::{AsRefStr, Display};

use super::plan::Plan;

/// Sentinel for an unbounded numeric limit.
pub const UNLIMITED: i64 = -1;

pub const FREE_MAX_WHEELS: i64 = 3;
pub const FREE_MAX_SEGMENTS: i64 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanLimits {
    pub max_wheels: i64,
    pub max_segments: i64,
    pub allow_images: bool,
    pub allow_weights: bool,
    pub allow_custom_design: bool,
    pub allow_statistics: bool,
}

/// Resolve the capability set for a plan. Total and pure.
pub fn resolve_limits(plan: Plan) -> PlanLimits {
    match plan {
        Plan::Free => PlanLimits {
            max_wheels: FREE_MAX_WHEELS,
            max_segments: FREE_MAX_SEGMENTS,
            allow_images: false,
            allow_weights: false,
            allow_custom_design: false,
            allow_statistics: false,
        },
        Plan::Pro => PlanLimits {
            max_wheels: UNLIMITED,
            max_segments: UNLIMITED,
            allow_images: true,
            allow_weights: true,
            allow_custom_design: true,
            allow_statistics: true,
        },
    }
}

/// Boolean capabilities a plan may unlock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Feature {
    Images,
    Weights,
    CustomDesign,
    Statistics,
}

/// Which gate refused the action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ViolationKind {
    WheelLimit,
    SegmentLimit,
    FeatureLocked,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanViolation {
    pub kind: ViolationKind,
    pub message: String,
}

impl PlanViolation {
    fn new<M: Into<String>>(kind: ViolationKind, message: M) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

fn within(limit: i64, value: i64) -> bool {
    limit == UNLIMITED || value <= limit
}

impl PlanLimits {
    pub fn is_unlimited_wheels(&self) -> bool {
        self.max_wheels == UNLIMITED
    }

    pub fn allows(&self, feature: Feature) -> bool {
        match feature {
            Feature::Images => self.allow_images,
            Feature::Weights => self.allow_weights,
            Feature::CustomDesign => self.allow_custom_design,
            Feature::Statistics => self.allow_statistics,
        }
    }

    /// Whether one more wheel may be created on top of `existing_wheels`.
    pub fn check_wheel_quota(&self, existing_wheels: i64) -> Result<(), PlanViolation> {
        if within(self.max_wheels, existing_wheels.saturating_add(1)) {
            Ok(())
        } else {
            Err(PlanViolation::new(
                ViolationKind::WheelLimit,
                format!(
                    "Your plan allows up to {} wheels. Upgrade to PRO for unlimited wheels.",
                    self.max_wheels
                ),
            ))
        }
    }

    pub fn check_segment_count(&self, segments: i64) -> Result<(), PlanViolation> {
        if within(self.max_segments, segments) {
            Ok(())
        } else {
            Err(PlanViolation::new(
                ViolationKind::SegmentLimit,
                format!(
                    "Your plan allows up to {} segments per wheel, got {}.",
                    self.max_segments, segments
                ),
            ))
        }
    }

    pub fn check_feature(&self, feature: Feature) -> Result<(), PlanViolation> {
        if self.allows(feature) {
            Ok(())
        } else {
            Err(PlanViolation::new(
                ViolationKind::FeatureLocked,
                format!("The {} feature requires a PRO plan.", feature),
            ))
        }
    }
}
