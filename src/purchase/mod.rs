pub mod desk;
mod storage;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

pub use desk::{DeskConfig, PurchaseDesk};
#[cfg(test)]
pub(crate) use storage::temp_datadir;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Staff,
    Manager,
    Owner,
}

impl Role {
    /// Name shown to employees.
    pub fn title(&self) -> &'static str {
        match self {
            Role::Staff => "family",
            Role::Manager => "secretary",
            Role::Owner => "master",
        }
    }

    pub fn can_submit(&self) -> bool {
        *self != Role::Owner
    }

    pub fn can_review(&self) -> bool {
        matches!(self, Role::Manager | Role::Owner)
    }

    /// Managers decide on staff requests; the owner decides on everything.
    pub fn can_decide_for(&self, requester: Role) -> bool {
        match self {
            Role::Owner => true,
            Role::Manager => requester == Role::Staff,
            Role::Staff => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Employee {
    pub id: usize,
    pub name: String,
    pub role: Role,
    pin_salt: String,
    pin_hash: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Employee {
    fn new(id: usize, name: &str, role: Role, pin: &str) -> Self {
        let pin_salt = uuid::Uuid::new_v4().simple().to_string();
        let pin_hash = hash_pin(&pin_salt, pin);
        Self {
            id,
            name: name.to_string(),
            role,
            pin_salt,
            pin_hash,
            active: true,
            created_at: Utc::now(),
        }
    }

    fn verify_pin(&self, pin: &str) -> bool {
        hash_pin(&self.pin_salt, pin) == self.pin_hash
    }

    fn set_pin(&mut self, pin: &str) {
        self.pin_salt = uuid::Uuid::new_v4().simple().to_string();
        self.pin_hash = hash_pin(&self.pin_salt, pin);
    }

    pub fn view(&self) -> EmployeeView {
        EmployeeView {
            id: self.id,
            name: self.name.clone(),
            role: self.role,
            title: self.role.title(),
        }
    }
}

fn hash_pin(salt: &str, pin: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(pin.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Employee as exposed over the API, without credentials.
#[derive(Debug, Clone, Serialize)]
pub struct EmployeeView {
    pub id: usize,
    pub name: String,
    pub role: Role,
    pub title: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pending,
    Approved,
    Rejected,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRequest {
    pub id: usize,
    pub requester_id: usize,
    pub requester_name: String,
    pub requester_role: Role,
    pub item_name: String,
    pub quantity: u32,
    pub amount: u64,
    pub photo_url: String,
    pub note: Option<String>,
    pub status: Status,
    pub decided_by: Option<String>,
    pub decision_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPurchase {
    #[serde(default)]
    pub item_name: String,
    #[serde(default = "one")]
    pub quantity: u32,
    #[serde(default)]
    pub amount: u64,
    #[serde(default)]
    pub photo_url: String,
    pub note: Option<String>,
}

fn one() -> u32 {
    1
}

#[derive(Error, Debug)]
pub enum PurchaseError {
    #[error("이름 또는 비밀번호가 올바르지 않습니다.")]
    InvalidCredentials,
    #[error("로그인이 필요합니다.")]
    SessionExpired,
    #[error("권한이 없습니다: {0}")]
    Forbidden(&'static str),
    #[error("{0} {1}을(를) 찾을 수 없습니다.")]
    NotFound(&'static str, usize),
    #[error("{0}")]
    Invalid(String),
    #[error("{0}")]
    Conflict(String),
    #[error("storage failure: {0}")]
    Storage(#[from] anyhow::Error),
}

/// PINs are exactly four ASCII digits.
pub fn validate_pin(pin: &str) -> Result<(), PurchaseError> {
    if pin.len() == 4 && pin.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(PurchaseError::Invalid(
            "비밀번호는 4자리 숫자여야 합니다.".to_string(),
        ))
    }
}
