//! Identity links: who is related to a task or process, and how

use crate::{CaseError, CaseResult, EntityKind, ExecutionId, IdentityLinkId, PersistentEntity, TaskId};
use serde::{Deserialize, Serialize};

/// The linked principal. Exactly one of user or group is ever set.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Principal {
    User(String),
    Group(String),
}

impl Principal {
    /// Build from the optional user/group pair used at the API surface.
    pub fn from_parts(
        user_id: Option<&str>,
        group_id: Option<&str>,
        entity_id: &str,
    ) -> CaseResult<Self> {
        match (user_id, group_id) {
            (Some(user), None) => Ok(Self::User(user.to_string())),
            (None, Some(group)) => Ok(Self::Group(group.to_string())),
            (Some(_), Some(_)) => Err(CaseError::illegal_state(
                entity_id,
                "add_identity_link",
                "userId and groupId cannot both be set",
            )),
            (None, None) => Err(CaseError::illegal_state(
                entity_id,
                "add_identity_link",
                "userId and groupId cannot both be null",
            )),
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        match self {
            Self::User(id) => Some(id),
            Self::Group(_) => None,
        }
    }

    pub fn group_id(&self) -> Option<&str> {
        match self {
            Self::Group(id) => Some(id),
            Self::User(_) => None,
        }
    }
}

impl std::fmt::Display for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User(id) => write!(f, "user:{id}"),
            Self::Group(id) => write!(f, "group:{id}"),
        }
    }
}

/// Relationship type of a link
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum IdentityLinkType {
    Assignee,
    Candidate,
    Owner,
    Starter,
    Participant,
    Custom(String),
}

impl IdentityLinkType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Assignee => "assignee",
            Self::Candidate => "candidate",
            Self::Owner => "owner",
            Self::Starter => "starter",
            Self::Participant => "participant",
            Self::Custom(name) => name,
        }
    }
}

impl From<String> for IdentityLinkType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "assignee" => Self::Assignee,
            "candidate" => Self::Candidate,
            "owner" => Self::Owner,
            "starter" => Self::Starter,
            "participant" => Self::Participant,
            _ => Self::Custom(value),
        }
    }
}

impl From<&str> for IdentityLinkType {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<IdentityLinkType> for String {
    fn from(value: IdentityLinkType) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for IdentityLinkType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a link hangs off
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum LinkOwner {
    Task(TaskId),
    ProcessInstance(ExecutionId),
}

impl LinkOwner {
    pub fn id(&self) -> &str {
        match self {
            Self::Task(id) => id.as_str(),
            Self::ProcessInstance(id) => id.as_str(),
        }
    }
}

/// A (principal, type) relationship owned by a task or a process instance.
/// The tuple is unique per owner.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IdentityLink {
    pub id: IdentityLinkId,
    #[serde(skip)]
    pub revision: u32,
    pub principal: Principal,
    pub link_type: IdentityLinkType,
    pub owner: LinkOwner,
}

impl IdentityLink {
    pub fn new(owner: LinkOwner, principal: Principal, link_type: IdentityLinkType) -> Self {
        Self {
            id: IdentityLinkId::generate(),
            revision: 0,
            principal,
            link_type,
            owner,
        }
    }

    pub fn is_user(&self) -> bool {
        matches!(self.principal, Principal::User(_))
    }

    pub fn is_group(&self) -> bool {
        matches!(self.principal, Principal::Group(_))
    }

    pub fn same_tuple(&self, principal: &Principal, link_type: &IdentityLinkType) -> bool {
        &self.principal == principal && &self.link_type == link_type
    }
}

impl PersistentEntity for IdentityLink {
    const KIND: EntityKind = EntityKind::IdentityLink;

    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn revision(&self) -> u32 {
        self.revision
    }

    fn set_revision(&mut self, revision: u32) {
        self.revision = revision;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_principal_requires_exactly_one() {
        assert!(Principal::from_parts(Some("bob"), None, "t1").is_ok());
        assert!(Principal::from_parts(None, Some("sales"), "t1").is_ok());
        assert!(Principal::from_parts(Some("bob"), Some("sales"), "t1").is_err());
        assert!(Principal::from_parts(None, None, "t1").is_err());
    }

    #[test]
    fn test_link_type_string_form() {
        assert_eq!(
            serde_json::to_value(IdentityLinkType::Candidate).unwrap(),
            json!("candidate")
        );
        let custom: IdentityLinkType = serde_json::from_value(json!("reviewer")).unwrap();
        assert_eq!(custom, IdentityLinkType::Custom("reviewer".into()));
        let known: IdentityLinkType = "participant".into();
        assert_eq!(known, IdentityLinkType::Participant);
    }

    #[test]
    fn test_same_tuple() {
        let link = IdentityLink::new(
            LinkOwner::Task(TaskId::new("t1")),
            Principal::User("bob".into()),
            IdentityLinkType::Candidate,
        );
        assert!(link.same_tuple(&Principal::User("bob".into()), &IdentityLinkType::Candidate));
        assert!(!link.same_tuple(&Principal::Group("bob".into()), &IdentityLinkType::Candidate));
        assert!(link.is_user());
    }
}
