// Fixed text shared by every model call.

/// Framing placed ahead of every prompt before it reaches a model.
pub const SYSTEM_FRAMING: &str = "You are a benefits advisor.";

/// Returned in place of model output whenever the backend cannot be reached.
/// The leading marker lets a reader see at a glance that this is not a live answer.
pub const FALLBACK_ADVICE: &str = "[Advisor offline] Based on your profile, here are some general recommendations:

**Health Insurance**: Consider a mid-tier plan that balances cost and coverage.

**Dental & Vision**: Basic coverage is recommended for preventive care.

**Employee Assistance Program**: Valuable for work-life balance support.

*Note: this is a standard response because the benefits advisor is temporarily unavailable. Please try again later for personalized advice.*";
