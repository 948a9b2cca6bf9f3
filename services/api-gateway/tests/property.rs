//! Property tests for the role gate and the lifecycle graph.

use proptest::prelude::*;

use api_gateway::auth::{authorize, Claims, Role};
use api_gateway::lifecycle::{validate_transition, ProjectStatus, Transition};
use api_gateway::GatewayError;

fn arb_role() -> impl Strategy<Value = Role> {
    prop_oneof![Just(Role::Admin), Just(Role::User)]
}

fn arb_requirement() -> impl Strategy<Value = Vec<Role>> {
    prop::collection::vec(arb_role(), 0..=2)
}

fn arb_status() -> impl Strategy<Value = ProjectStatus> {
    prop_oneof![
        Just(ProjectStatus::Pending),
        Just(ProjectStatus::Active),
        Just(ProjectStatus::Completed),
        Just(ProjectStatus::Cancelled),
    ]
}

fn claims_with_role(role: Role) -> Claims {
    Claims {
        sub: "u1".to_string(),
        email: "u1@example.com".to_string(),
        profile_id: "p1".to_string(),
        role,
        issued_at: None,
        expires_at: i64::MAX,
    }
}

proptest! {
    /// The role gate passes exactly when the role is a member of the
    /// required set.
    #[test]
    fn role_gate_is_exact_membership(role in arb_role(), required in arb_requirement()) {
        let claims = claims_with_role(role);
        let outcome = authorize(Some(&claims), &required);
        prop_assert_eq!(outcome.is_ok(), required.contains(&role));
    }

    /// The gate never reports a permission failure without naming both the
    /// required set and the actual role.
    #[test]
    fn role_gate_failures_carry_context(role in arb_role(), required in arb_requirement()) {
        let claims = claims_with_role(role);
        if let Err(GatewayError::InsufficientPermissions { required: r, actual }) =
            authorize(Some(&claims), &required)
        {
            prop_assert_eq!(r, required);
            prop_assert_eq!(actual, role);
        }
    }

    /// Transition validation succeeds exactly for self-transitions and
    /// edges of the static graph; nothing else.
    #[test]
    fn lifecycle_graph_is_closed(current in arb_status(), requested in arb_status()) {
        let outcome = validate_transition(current, requested);
        if requested == current {
            prop_assert_eq!(outcome.ok(), Some(Transition::Unchanged));
        } else if current.allowed_transitions().contains(&requested) {
            prop_assert_eq!(outcome.ok(), Some(Transition::Apply(requested)));
        } else {
            prop_assert!(outcome.is_err());
        }
    }

    /// Terminal states admit no change at all.
    #[test]
    fn terminal_states_reject_every_change(requested in arb_status()) {
        for terminal in [ProjectStatus::Completed, ProjectStatus::Cancelled] {
            if requested != terminal {
                prop_assert!(validate_transition(terminal, requested).is_err());
            }
        }
    }
}
