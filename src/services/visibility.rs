use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::user::{Role, User};

/// The authenticated caller, as resolved by the auth layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requester {
    pub id: Uuid,
    pub role: Role,
    pub department_id: Option<Uuid>,
}

impl Requester {
    pub fn new(id: Uuid, role: Role, department_id: Option<Uuid>) -> Self {
        Self {
            id,
            role,
            department_id,
        }
    }

    /// Department an HR caller is scoped to. Admins are unscoped (`None`).
    pub fn department_scope(&self) -> Result<Option<Uuid>> {
        match self.role {
            Role::Admin => Ok(None),
            Role::Hr => self
                .department_id
                .map(Some)
                .ok_or_else(|| Error::BadRequest("HR not assigned to a department".to_string())),
            Role::Candidate => Err(Error::Forbidden("Access denied. HR only.".to_string())),
        }
    }
}

impl From<&User> for Requester {
    fn from(user: &User) -> Self {
        Requester::new(user.id, user.role, user.department_id)
    }
}

/// Whether `requester` may read interview data belonging to `candidate`.
pub fn can_view(requester: &Requester, candidate: &User) -> bool {
    match requester.role {
        Role::Admin => true,
        Role::Hr => requester.department_id.is_some() && requester.department_id == candidate.department_id,
        Role::Candidate => requester.id == candidate.id,
    }
}

/// Passes `record` through only when the caller may see it. A missing
/// candidate, a missing record and an out-of-scope record all produce the same
/// error.
pub fn gate<T>(requester: &Requester, candidate: Option<&User>, record: Option<T>) -> Result<T> {
    match (candidate, record) {
        (Some(candidate), Some(record)) if can_view(requester, candidate) => Ok(record),
        _ => Err(Error::not_found_or_unauthorized()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hr_sees_only_their_department() {
        let dept_a = Uuid::new_v4();
        let dept_b = Uuid::new_v4();
        let hr = Requester::new(Uuid::new_v4(), Role::Hr, Some(dept_a));

        let in_a = User::candidate("A", "a@x.io", Some(dept_a));
        let in_b = User::candidate("B", "b@x.io", Some(dept_b));

        assert!(can_view(&hr, &in_a));
        assert!(!can_view(&hr, &in_b));
    }

    #[test]
    fn hr_without_department_sees_nothing() {
        let hr = Requester::new(Uuid::new_v4(), Role::Hr, None);
        let unassigned = User::candidate("C", "c@x.io", None);
        assert!(!can_view(&hr, &unassigned));
    }

    #[test]
    fn candidates_see_only_themselves() {
        let me = User::candidate("Me", "me@x.io", None);
        let other = User::candidate("Other", "o@x.io", None);
        let requester = Requester::from(&me);

        assert!(can_view(&requester, &me));
        assert!(!can_view(&requester, &other));
    }

    #[test]
    fn gate_hides_out_of_scope_records_as_not_found() {
        let hr = Requester::new(Uuid::new_v4(), Role::Hr, Some(Uuid::new_v4()));
        let elsewhere = User::candidate("D", "d@x.io", Some(Uuid::new_v4()));

        let denied = gate(&hr, Some(&elsewhere), Some(1)).unwrap_err();
        let missing = gate::<i32>(&hr, None, None).unwrap_err();
        assert_eq!(denied.to_string(), missing.to_string());
    }

    #[test]
    fn admin_is_unscoped() {
        let admin = Requester::new(Uuid::new_v4(), Role::Admin, None);
        assert_eq!(admin.department_scope().unwrap(), None);
        let anyone = User::candidate("E", "e@x.io", Some(Uuid::new_v4()));
        assert!(can_view(&admin, &anyone));
    }
}
