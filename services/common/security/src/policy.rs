use common_auth::Role;
use serde::{Deserialize, Serialize};

use crate::{SecurityContext, SecurityError};

/// Actions a role may perform. Server route policies and the client route
/// guard both resolve access through this one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    ManageCenters,
    ManageCenterAdmins,
    ViewAllDoctors,
    ManageStaff,
    ManagePatientAccounts,
    ViewPatients,
    WritePatients,
    ViewClinicalRecords,
    WriteClinicalRecords,
    WriteVisitHistory,
    CenterOverview,
    FrontDesk,
    LabWorkspace,
    PatientPortal,
    Session,
}

impl Capability {
    pub const ALL: [Capability; 15] = [
        Capability::ManageCenters,
        Capability::ManageCenterAdmins,
        Capability::ViewAllDoctors,
        Capability::ManageStaff,
        Capability::ManagePatientAccounts,
        Capability::ViewPatients,
        Capability::WritePatients,
        Capability::ViewClinicalRecords,
        Capability::WriteClinicalRecords,
        Capability::WriteVisitHistory,
        Capability::CenterOverview,
        Capability::FrontDesk,
        Capability::LabWorkspace,
        Capability::PatientPortal,
        Capability::Session,
    ];

    pub fn allowed_roles(self) -> &'static [Role] {
        use Capability::*;
        use Role::*;
        match self {
            ManageCenters | ManageCenterAdmins | ViewAllDoctors => &[SuperAdmin],
            ManageStaff => &[SuperAdmin, CenterAdmin],
            ManagePatientAccounts => &[CenterAdmin, Receptionist],
            ViewPatients | WritePatients | ViewClinicalRecords => &[Doctor, Receptionist, CenterAdmin],
            WriteClinicalRecords => &[Doctor],
            WriteVisitHistory => &[Doctor, Receptionist],
            CenterOverview => &[CenterAdmin],
            FrontDesk => &[Receptionist],
            LabWorkspace => &[Lab],
            PatientPortal => &[Patient],
            Session => &Role::ALL,
        }
    }
}

pub fn role_can(role: Role, cap: Capability) -> bool {
    cap.allowed_roles().contains(&role)
}

pub fn capabilities_of(role: Role) -> Vec<Capability> {
    Capability::ALL
        .into_iter()
        .filter(|cap| role_can(role, *cap))
        .collect()
}

pub fn ensure_capability(ctx: &SecurityContext, cap: Capability) -> Result<(), SecurityError> {
    if role_can(ctx.role, cap) {
        return Ok(());
    }
    Err(SecurityError::Forbidden { capability: cap, role: ctx.role })
}
