//! Tests for auth module
//!
//! These tests verify core authentication functionality including:
//! - JWT token issuance and validation
//! - Role parsing and the privilege ladder
//! - Superuser override

#[cfg(test)]
mod tests {
    use super::super::*;
    use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

    fn authed(role: Role, is_superuser: bool) -> AuthedUser {
        AuthedUser {
            id: "U_TEST01".to_string(),
            email: "test@example.com".to_string(),
            username: "tester".to_string(),
            full_name: None,
            role,
            is_superuser,
        }
    }

    #[test]
    fn test_issued_token_decodes_with_same_secret() {
        let token = models::create_access_token("test_secret_key", "U_ABC123", 30)
            .expect("Failed to encode token");

        let decoded = decode::<models::Claims>(
            &token,
            &DecodingKey::from_secret("test_secret_key".as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .expect("Failed to decode token");

        assert_eq!(decoded.claims.sub, "U_ABC123");
    }

    #[test]
    fn test_jwt_validation_fails_with_wrong_secret() {
        let token = models::create_access_token("test_secret_key", "U_ABC123", 30).unwrap();

        let result = decode::<models::Claims>(
            &token,
            &DecodingKey::from_secret("wrong_secret_key".as_bytes()),
            &Validation::new(Algorithm::HS256),
        );

        assert!(result.is_err(), "Token validation should fail with wrong secret");
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let token = models::create_access_token("test_secret_key", "U_ABC123", -120).unwrap();

        let result = decode::<models::Claims>(
            &token,
            &DecodingKey::from_secret("test_secret_key".as_bytes()),
            &Validation::new(Algorithm::HS256),
        );

        assert!(result.is_err());
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("HR_MANAGER".parse::<Role>().unwrap(), Role::HrManager);
        assert_eq!(" recruiter ".parse::<Role>().unwrap(), Role::Recruiter);
        assert!("owner".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_ladder() {
        assert!(authed(Role::Admin, false).has_role_at_least(Role::HrManager));
        assert!(authed(Role::HrManager, false).has_role_at_least(Role::Recruiter));
        assert!(authed(Role::Recruiter, false).require_recruiter().is_ok());
        assert!(authed(Role::Viewer, false).require_recruiter().is_err());
        assert!(authed(Role::HrManager, false).require_admin().is_err());
    }

    #[test]
    fn test_superuser_bypasses_role_checks() {
        let viewer = authed(Role::Viewer, true);
        assert!(viewer.require_admin().is_ok());
        assert!(viewer.require_recruiter().is_ok());
    }

    #[test]
    fn test_unknown_stored_role_is_least_privilege() {
        let user = models::User {
            id: "U_X".to_string(),
            email: "x@example.com".to_string(),
            username: "x".to_string(),
            full_name: Some("  ".to_string()),
            role: "owner".to_string(),
            is_active: true,
            is_superuser: false,
            created_at: None,
            updated_at: None,
        };

        assert_eq!(user.role(), Role::Viewer);
        assert_eq!(user.display_name(), "x");
    }
}
