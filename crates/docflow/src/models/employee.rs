//! Directory record for a potential share recipient

use serde::{Deserialize, Serialize};

/// Employee record (read-only from this crate's point of view)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub department: String,
    /// Lowercase form of `department`
    #[serde(default)]
    pub department_key: String,
    #[serde(default)]
    pub title: Option<String>,
}

impl Employee {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        department: impl Into<String>,
    ) -> Self {
        let department = department.into();
        Self {
            id: id.into(),
            name: name.into(),
            department_key: department.to_lowercase(),
            department,
            title: None,
        }
    }
}

/// Recipient echoed back to the caller after a share
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedRecipient {
    pub id: String,
    pub name: String,
    pub department: String,
}

impl From<&Employee> for ResolvedRecipient {
    fn from(e: &Employee) -> Self {
        Self {
            id: e.id.clone(),
            name: e.name.clone(),
            department: e.department.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_department_key_is_lowercase() {
        let e = Employee::new("e1", "Asha", "Rolling Stock");
        assert_eq!(e.department_key, "rolling stock");
        assert_eq!(e.department, "Rolling Stock");
    }

    #[test]
    fn test_older_record_without_key_loads() {
        let e: Employee = bson::from_document(bson::doc! {
            "_id": "e2",
            "name": "Ravi",
            "department": "HR",
        })
        .unwrap();
        assert_eq!(e.department, "HR");
        assert!(e.department_key.is_empty());
    }
}
