use common_auth::Role;
use common_security::{role_can, Capability};
use uuid::Uuid;

use crate::session::SessionUser;

/// Screens of the clinic client. Each guarded screen needs one capability;
/// the capability table is the same one the server's route policies use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientRoute {
    Login,
    SuperAdminDashboard,
    Centers,
    CenterAdmins,
    AllDoctors,
    CenterAdminDashboard,
    Staff,
    DoctorDashboard,
    Patients,
    PatientRecord(Uuid),
    FollowUpForm(Uuid),
    VisitHistoryForm(Uuid),
    PatientAccounts,
    ReceptionistDashboard,
    LabDashboard,
    PatientPortal,
}

impl ClientRoute {
    /// `None` for public screens.
    pub fn required_capability(&self) -> Option<Capability> {
        use ClientRoute::*;
        let cap = match self {
            Login => return None,
            SuperAdminDashboard | Centers => Capability::ManageCenters,
            CenterAdmins => Capability::ManageCenterAdmins,
            AllDoctors => Capability::ViewAllDoctors,
            CenterAdminDashboard => Capability::CenterOverview,
            Staff => Capability::ManageStaff,
            DoctorDashboard | FollowUpForm(_) => Capability::WriteClinicalRecords,
            Patients | PatientRecord(_) => Capability::ViewPatients,
            VisitHistoryForm(_) => Capability::WriteVisitHistory,
            PatientAccounts => Capability::ManagePatientAccounts,
            ReceptionistDashboard => Capability::FrontDesk,
            LabDashboard => Capability::LabWorkspace,
            PatientPortal => Capability::PatientPortal,
        };
        Some(cap)
    }

    pub fn is_public(&self) -> bool {
        self.required_capability().is_none()
    }

    pub fn path(&self) -> String {
        use ClientRoute::*;
        match self {
            Login => "/login".into(),
            SuperAdminDashboard => "/superadmin".into(),
            Centers => "/superadmin/centers".into(),
            CenterAdmins => "/superadmin/centeradmins".into(),
            AllDoctors => "/superadmin/doctors".into(),
            CenterAdminDashboard => "/centeradmin".into(),
            Staff => "/centeradmin/staff".into(),
            DoctorDashboard => "/doctor".into(),
            Patients => "/patients".into(),
            PatientRecord(id) => format!("/patients/{id}"),
            FollowUpForm(id) => format!("/patients/{id}/followups/new"),
            VisitHistoryForm(id) => format!("/patients/{id}/history/new"),
            PatientAccounts => "/patient-accounts".into(),
            ReceptionistDashboard => "/receptionist".into(),
            LabDashboard => "/lab".into(),
            PatientPortal => "/portal".into(),
        }
    }

    /// API resource the screen loads on entry, if any.
    pub fn data_path(&self) -> Option<String> {
        use ClientRoute::*;
        match self {
            Centers => Some("/api/superadmin/centers".into()),
            CenterAdmins => Some("/api/superadmin/centeradmins".into()),
            AllDoctors => Some("/api/superadmin/doctors".into()),
            Staff => Some("/api/centeradmin/doctors".into()),
            Patients => Some("/api/patients".into()),
            PatientRecord(id) => Some(format!("/api/patients/{id}")),
            PatientAccounts => Some("/api/patient-accounts".into()),
            _ => None,
        }
    }

    pub fn landing_for(role: Role) -> ClientRoute {
        match role {
            Role::SuperAdmin => ClientRoute::SuperAdminDashboard,
            Role::CenterAdmin => ClientRoute::CenterAdminDashboard,
            Role::Doctor => ClientRoute::DoctorDashboard,
            Role::Receptionist => ClientRoute::ReceptionistDashboard,
            Role::Lab => ClientRoute::LabDashboard,
            Role::Patient => ClientRoute::PatientPortal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect(ClientRoute),
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RouteGuard;

impl RouteGuard {
    /// A user never lands on a screen their role cannot use; a wrong role is
    /// sent to its own landing page rather than the requested one.
    pub fn can_enter(&self, route: &ClientRoute, user: Option<&SessionUser>) -> GuardDecision {
        match (route.required_capability(), user) {
            (None, Some(user)) if *route == ClientRoute::Login => {
                GuardDecision::Redirect(ClientRoute::landing_for(user.role))
            }
            (None, _) => GuardDecision::Allow,
            (Some(_), None) => GuardDecision::Redirect(ClientRoute::Login),
            (Some(cap), Some(user)) if role_can(user.role, cap) => GuardDecision::Allow,
            (Some(_), Some(user)) => GuardDecision::Redirect(ClientRoute::landing_for(user.role)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role) -> SessionUser {
        SessionUser {
            id: Uuid::new_v4(),
            name: "U".into(),
            email: "u@test.com".into(),
            role,
            center_id: role.requires_center().then(Uuid::new_v4),
        }
    }

    fn all_routes() -> Vec<ClientRoute> {
        let id = Uuid::new_v4();
        vec![
            ClientRoute::Login,
            ClientRoute::SuperAdminDashboard,
            ClientRoute::Centers,
            ClientRoute::CenterAdmins,
            ClientRoute::AllDoctors,
            ClientRoute::CenterAdminDashboard,
            ClientRoute::Staff,
            ClientRoute::DoctorDashboard,
            ClientRoute::Patients,
            ClientRoute::PatientRecord(id),
            ClientRoute::FollowUpForm(id),
            ClientRoute::VisitHistoryForm(id),
            ClientRoute::PatientAccounts,
            ClientRoute::ReceptionistDashboard,
            ClientRoute::LabDashboard,
            ClientRoute::PatientPortal,
        ]
    }

    #[test]
    fn anonymous_users_go_to_login() {
        let guard = RouteGuard;
        for route in all_routes() {
            let expected = if route.is_public() {
                GuardDecision::Allow
            } else {
                GuardDecision::Redirect(ClientRoute::Login)
            };
            assert_eq!(guard.can_enter(&route, None), expected, "{route:?}");
        }
    }

    #[test]
    fn wrong_role_lands_on_own_dashboard() {
        let guard = RouteGuard;
        let doctor = user(Role::Doctor);
        assert_eq!(
            guard.can_enter(&ClientRoute::AllDoctors, Some(&doctor)),
            GuardDecision::Redirect(ClientRoute::DoctorDashboard)
        );
        let admin = user(Role::CenterAdmin);
        assert_eq!(
            guard.can_enter(&ClientRoute::AllDoctors, Some(&admin)),
            GuardDecision::Redirect(ClientRoute::CenterAdminDashboard)
        );
        assert_eq!(
            guard.can_enter(&ClientRoute::Staff, Some(&admin)),
            GuardDecision::Allow
        );
    }

    #[test]
    fn never_redirects_to_a_forbidden_route() {
        let guard = RouteGuard;
        for role in Role::ALL {
            let u = user(role);
            let landing = ClientRoute::landing_for(role);
            assert_eq!(guard.can_enter(&landing, Some(&u)), GuardDecision::Allow, "{role}");
            for route in all_routes() {
                if let GuardDecision::Redirect(target) = guard.can_enter(&route, Some(&u)) {
                    assert_eq!(target, landing, "{role} on {route:?}");
                }
            }
        }
    }

    #[test]
    fn signed_in_users_skip_login() {
        let u = user(Role::Lab);
        assert_eq!(
            RouteGuard.can_enter(&ClientRoute::Login, Some(&u)),
            GuardDecision::Redirect(ClientRoute::LabDashboard)
        );
    }

    #[test]
    fn receptionist_can_record_history_but_not_follow_ups() {
        let u = user(Role::Receptionist);
        let patient = Uuid::new_v4();
        assert_eq!(
            RouteGuard.can_enter(&ClientRoute::VisitHistoryForm(patient), Some(&u)),
            GuardDecision::Allow
        );
        assert_eq!(
            RouteGuard.can_enter(&ClientRoute::FollowUpForm(patient), Some(&u)),
            GuardDecision::Redirect(ClientRoute::ReceptionistDashboard)
        );
        assert_eq!(ClientRoute::PatientRecord(patient).path(), format!("/patients/{patient}"));
    }
}
