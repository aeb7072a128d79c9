//! The authorized session: a principal plus the directory resources whose
//! lifetime it owns.

use std::fmt;

use kycdesk_core::Principal;
use kycdesk_directory::Directory;

/// One authorized administrator session.
///
/// Constructed only after the privilege check passes; dropping back to any
/// other gate state closes the directory with it.
pub struct AdminSession {
    principal: Principal,
    directory: Directory,
}

impl fmt::Debug for AdminSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminSession")
            .field("principal", &self.principal)
            .finish_non_exhaustive()
    }
}

impl AdminSession {
    #[must_use]
    pub(crate) fn new(principal: Principal, directory: Directory) -> Self {
        Self {
            principal,
            directory,
        }
    }

    /// The authenticated administrator.
    #[must_use]
    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    /// The live directory view bound to this session.
    #[must_use]
    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    /// Tears down the directory resources: stops the sync, clears the
    /// evidence cache.
    pub(crate) async fn close(&self) {
        self.directory.close().await;
    }
}
