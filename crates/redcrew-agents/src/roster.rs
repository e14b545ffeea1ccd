//! The production specialist roster.
//!
//! Role names are the routing keys the delegation protocol matches
//! against, so they are fixed identifiers rather than display names.
//! A deployment registers one [`crate::Specialist`] per role it needs;
//! nothing requires the full roster to be present.

/// Trend and competitor analysis across the target platform.
pub const CHIEF_MARKET_ANALYST: &str = "chief_market_analyst";

/// High-quality post generation (title, body, tags).
pub const CONTENT_CREATOR: &str = "content_creator";

/// Platform-policy and sensitive-word review of generated content.
pub const COMPLIANCE_REVIEWER: &str = "compliance_reviewer";

/// Publish planning: slots, cadence, scheduling recommendations.
pub const PUBLICATION_PLANNER: &str = "publication_planner";

/// Account persona construction and upkeep.
pub const PERSONA_MANAGER: &str = "persona_manager";

/// Product and brand research feeding penetration documents.
pub const PRODUCT_RESEARCHER: &str = "product_researcher";

/// Every roster role, for registration loops and validation.
pub const ALL: [&str; 6] = [
    CHIEF_MARKET_ANALYST,
    CONTENT_CREATOR,
    COMPLIANCE_REVIEWER,
    PUBLICATION_PLANNER,
    PERSONA_MANAGER,
    PRODUCT_RESEARCHER,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roster_roles_are_valid_identifiers() {
        for role in ALL {
            assert!(
                redcrew_protocol::is_role_identifier(role),
                "roster role {role:?} must be routable"
            );
        }
    }

    #[test]
    fn test_roster_roles_are_unique() {
        let mut roles = ALL.to_vec();
        roles.sort_unstable();
        roles.dedup();
        assert_eq!(roles.len(), ALL.len());
    }
}
