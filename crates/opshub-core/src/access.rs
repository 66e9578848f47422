//! Role gating for the client's functional areas.

use crate::models::Role;

/// Functional area of the client, each gated to a fixed set of roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Area {
    /// News feed and published trainings.
    Home,
    /// Taking a training and tracking progress.
    Training,
    OperationsHub,
    /// Admin management, news fetcher, news sources, training builder.
    Superadmin,
    /// Managing invited users.
    Admin,
}

impl Area {
    pub fn allowed_roles(&self) -> &'static [Role] {
        match self {
            Area::Home | Area::Training | Area::OperationsHub => {
                &[Role::Superadmin, Role::Admin, Role::User]
            }
            Area::Superadmin => &[Role::Superadmin],
            Area::Admin => &[Role::Admin],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Area::Home => "home",
            Area::Training => "training",
            Area::OperationsHub => "operations hub",
            Area::Superadmin => "superadmin",
            Area::Admin => "admin",
        }
    }
}

impl Role {
    pub fn can_access(&self, area: Area) -> bool {
        area.allowed_roles().contains(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_role_reaches_shared_areas() {
        for role in [Role::Superadmin, Role::Admin, Role::User] {
            assert!(role.can_access(Area::Home));
            assert!(role.can_access(Area::Training));
            assert!(role.can_access(Area::OperationsHub));
        }
    }

    #[test]
    fn management_areas_are_exclusive() {
        assert!(Role::Superadmin.can_access(Area::Superadmin));
        assert!(!Role::Admin.can_access(Area::Superadmin));
        assert!(!Role::User.can_access(Area::Superadmin));

        assert!(Role::Admin.can_access(Area::Admin));
        assert!(!Role::Superadmin.can_access(Area::Admin));
        assert!(!Role::User.can_access(Area::Admin));
    }
}
