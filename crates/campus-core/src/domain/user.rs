use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Student,
    Teacher,
    Admin,
}

/// A campus account. The id is the institutional user id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub role: UserRole,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub department_id: Option<String>,
    /// Students only, set on admission.
    pub current_semester: Option<String>,
    #[serde(default)]
    pub is_advisor: bool,
    #[serde(default)]
    pub is_department_head: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        id: impl Into<String>,
        role: UserRole,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        department_id: Option<String>,
    ) -> Self {
        let id = id.into();
        let now = Utc::now();
        Self {
            email: format!("{}@campus.edu", id.to_lowercase()),
            id,
            role,
            first_name: first_name.into(),
            last_name: last_name.into(),
            department_id,
            current_semester: None,
            is_advisor: false,
            is_department_head: false,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn advisor(mut self) -> Self {
        self.is_advisor = true;
        self
    }

    pub fn department_head(mut self) -> Self {
        self.is_department_head = true;
        self
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Department heads may act on registrations of their own department.
    pub fn heads_department(&self, department_id: &str) -> bool {
        self.role == UserRole::Teacher
            && self.is_department_head
            && self.department_id.as_deref() == Some(department_id)
    }
}

/// A catalogue course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: String,
    pub code: String,
    pub title: String,
    pub credits: u32,
    pub department_id: String,
}

impl Course {
    pub fn new(
        code: impl Into<String>,
        title: impl Into<String>,
        credits: u32,
        department_id: impl Into<String>,
    ) -> Self {
        Self {
            id: super::new_id(),
            code: code.into(),
            title: title.into(),
            credits,
            department_id: department_id.into(),
        }
    }
}
