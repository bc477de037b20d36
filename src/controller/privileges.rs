use log::debug;
use nix::unistd::{self, Gid, Group, Uid, User};

use crate::error_handling::types::{ConfigError, ControllerError};

/// Unprivileged identity the daemon switches to once its listeners are bound.
#[derive(Debug, Clone, Default)]
pub struct RunAs {
    pub user: Option<User>,
    pub group: Option<Group>,
}

impl RunAs {
    /// Looks up the user and group names in the system databases.
    pub fn resolve(user: Option<&str>, group: Option<&str>) -> Result<Self, ConfigError> {
        let group = match group {
            Some(name) => Some(
                Group::from_name(name)
                    .map_err(|e| ConfigError::IoError(e.into()))?
                    .ok_or_else(|| ConfigError::UnknownGroup(name.to_string()))?,
            ),
            None => None,
        };
        let user = match user {
            Some(name) => Some(
                User::from_name(name)
                    .map_err(|e| ConfigError::IoError(e.into()))?
                    .ok_or_else(|| ConfigError::UnknownUser(name.to_string()))?,
            ),
            None => None,
        };
        Ok(Self { user, group })
    }

    pub fn is_noop(&self) -> bool {
        self.user.is_none() && self.group.is_none()
    }

    /// Drops supplementary groups and switches group, then user.
    ///
    /// The group must change first: once the uid is unprivileged `setgid` is
    /// no longer permitted.
    pub fn apply(&self) -> Result<(), ControllerError> {
        if let Some(group) = &self.group {
            debug!("switching to group {}({})", group.gid, group.name);
            unistd::setgroups(&[])
                .map_err(|e| ControllerError::PrivilegeDropFailed(format!("setgroups: {}", e)))?;
            unistd::setgid(group.gid).map_err(|e| {
                ControllerError::PrivilegeDropFailed(format!("setgid({}): {}", group.gid, e))
            })?;
        }
        if let Some(user) = &self.user {
            debug!("switching to user {}({})", user.uid, user.name);
            unistd::setuid(user.uid).map_err(|e| {
                ControllerError::PrivilegeDropFailed(format!("setuid({}): {}", user.uid, e))
            })?;
        }
        Ok(())
    }
}

/// The process's real identity as `uid=N(name) gid=N(name)`.
pub fn describe_identity() -> String {
    format_identity(unistd::getuid(), unistd::getgid())
}

fn format_identity(uid: Uid, gid: Gid) -> String {
    let user = User::from_uid(uid)
        .ok()
        .flatten()
        .map(|u| u.name)
        .unwrap_or_else(|| "?".to_string());
    let group = Group::from_gid(gid)
        .ok()
        .flatten()
        .map(|g| g.name)
        .unwrap_or_else(|| "?".to_string());
    format!("uid={}({}) gid={}({})", uid, user, gid, group)
}
