use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::person::InstructorSummary;

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Department {
    pub department_id: i32,
    pub name: String,
    pub budget: Decimal,
    pub start_date: NaiveDate,
    pub instructor_id: Option<i32>,
    pub row_version: i64,
}

/// The columns a client may write. `row_version` is never part of it; the
/// database bumps it on every update.
#[derive(Debug, Clone, PartialEq)]
pub struct DepartmentFields {
    pub name: String,
    pub budget: Decimal,
    pub start_date: NaiveDate,
    pub instructor_id: Option<i32>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct DepartmentWithAdministrator {
    #[serde(flatten)]
    pub department: Department,
    pub administrator: Option<InstructorSummary>,
}

#[derive(sqlx::FromRow, Debug)]
pub struct DepartmentAdministratorRow {
    #[sqlx(flatten)]
    pub department: Department,
    pub administrator_last_name: Option<String>,
    pub administrator_first_mid_name: Option<String>,
}

impl From<DepartmentAdministratorRow> for DepartmentWithAdministrator {
    fn from(row: DepartmentAdministratorRow) -> Self {
        let administrator = match (
            row.department.instructor_id,
            row.administrator_last_name,
            row.administrator_first_mid_name,
        ) {
            (Some(id), Some(last_name), Some(first_mid_name)) => Some(InstructorSummary {
                id,
                full_name: format!("{}, {}", last_name, first_mid_name),
            }),
            _ => None,
        };

        DepartmentWithAdministrator {
            department: row.department,
            administrator,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn history(instructor_id: Option<i32>) -> Department {
        Department {
            department_id: 1,
            name: "History".to_string(),
            budget: dec!(350000),
            start_date: NaiveDate::from_ymd_opt(2007, 9, 1).unwrap(),
            instructor_id,
            row_version: 1,
        }
    }

    #[test]
    fn administrator_is_built_from_joined_name_columns() {
        let row = DepartmentAdministratorRow {
            department: history(Some(3)),
            administrator_last_name: Some("Kapoor".to_string()),
            administrator_first_mid_name: Some("Candace".to_string()),
        };

        let view = DepartmentWithAdministrator::from(row);
        let administrator = view.administrator.expect("administrator joined");
        assert_eq!(administrator.id, 3);
        assert_eq!(administrator.full_name, "Kapoor, Candace");
    }

    #[test]
    fn department_without_instructor_has_no_administrator() {
        let row = DepartmentAdministratorRow {
            department: history(None),
            administrator_last_name: None,
            administrator_first_mid_name: None,
        };

        assert!(DepartmentWithAdministrator::from(row).administrator.is_none());
    }
}
