use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

pub const INSTRUCTOR_DISCRIMINATOR: &str = "Instructor";
pub const STUDENT_DISCRIMINATOR: &str = "Student";

/// Instructors and students share the `person` table; the discriminator
/// column decides which of the date columns is meaningful.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "discriminator")]
pub enum PersonKind {
    Instructor { hire_date: NaiveDate },
    Student { enrollment_date: NaiveDate },
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Person {
    pub id: i32,
    pub last_name: String,
    pub first_mid_name: String,
    #[serde(flatten)]
    pub kind: PersonKind,
    pub row_version: i64,
}

impl Person {
    pub fn full_name(&self) -> String {
        format!("{}, {}", self.last_name, self.first_mid_name)
    }
}

/// Flat shape of a `person` row as the database returns it.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct PersonRow {
    pub id: i32,
    pub last_name: String,
    pub first_mid_name: String,
    pub discriminator: String,
    pub hire_date: Option<NaiveDate>,
    pub enrollment_date: Option<NaiveDate>,
    pub row_version: i64,
}

#[derive(Debug, PartialEq)]
pub enum PersonRowError {
    UnknownDiscriminator { id: i32, discriminator: String },
    MissingDate { id: i32, column: &'static str },
}

impl fmt::Display for PersonRowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersonRowError::UnknownDiscriminator { id, discriminator } => {
                write!(f, "person {} has unknown discriminator '{}'", id, discriminator)
            }
            PersonRowError::MissingDate { id, column } => {
                write!(f, "person {} is missing {}", id, column)
            }
        }
    }
}

impl std::error::Error for PersonRowError {}

impl TryFrom<PersonRow> for Person {
    type Error = PersonRowError;

    fn try_from(row: PersonRow) -> Result<Self, Self::Error> {
        let kind = match row.discriminator.as_str() {
            INSTRUCTOR_DISCRIMINATOR => PersonKind::Instructor {
                hire_date: row.hire_date.ok_or(PersonRowError::MissingDate {
                    id: row.id,
                    column: "hire_date",
                })?,
            },
            STUDENT_DISCRIMINATOR => PersonKind::Student {
                enrollment_date: row.enrollment_date.ok_or(PersonRowError::MissingDate {
                    id: row.id,
                    column: "enrollment_date",
                })?,
            },
            _ => {
                return Err(PersonRowError::UnknownDiscriminator {
                    id: row.id,
                    discriminator: row.discriminator,
                })
            }
        };

        Ok(Person {
            id: row.id,
            last_name: row.last_name,
            first_mid_name: row.first_mid_name,
            kind,
            row_version: row.row_version,
        })
    }
}

/// Entry of the administrator selector and the embedded administrator of a department.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct InstructorSummary {
    pub id: i32,
    pub full_name: String,
}

impl From<&Person> for InstructorSummary {
    fn from(person: &Person) -> Self {
        InstructorSummary {
            id: person.id,
            full_name: person.full_name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(discriminator: &str) -> PersonRow {
        PersonRow {
            id: 7,
            last_name: "Alexander".to_string(),
            first_mid_name: "Carson".to_string(),
            discriminator: discriminator.to_string(),
            hire_date: None,
            enrollment_date: None,
            row_version: 1,
        }
    }

    #[test]
    fn instructor_row_keeps_hire_date() {
        let mut instructor = row(INSTRUCTOR_DISCRIMINATOR);
        instructor.hire_date = NaiveDate::from_ymd_opt(2002, 7, 6);

        let person = Person::try_from(instructor).unwrap();
        assert_eq!(
            person.kind,
            PersonKind::Instructor {
                hire_date: NaiveDate::from_ymd_opt(2002, 7, 6).unwrap()
            }
        );
    }

    #[test]
    fn student_row_keeps_enrollment_date_only() {
        let mut student = row(STUDENT_DISCRIMINATOR);
        student.enrollment_date = NaiveDate::from_ymd_opt(2010, 9, 1);
        // hire_date is ignored for students even if a stray value is present
        student.hire_date = NaiveDate::from_ymd_opt(1999, 1, 1);

        let person = Person::try_from(student).unwrap();
        assert_eq!(
            person.kind,
            PersonKind::Student {
                enrollment_date: NaiveDate::from_ymd_opt(2010, 9, 1).unwrap()
            }
        );
    }

    #[test]
    fn row_missing_the_date_for_its_kind_is_rejected() {
        let err = Person::try_from(row(INSTRUCTOR_DISCRIMINATOR)).unwrap_err();
        assert_eq!(
            err,
            PersonRowError::MissingDate {
                id: 7,
                column: "hire_date"
            }
        );
    }

    #[test]
    fn unknown_discriminator_is_rejected() {
        let err = Person::try_from(row("Staff")).unwrap_err();
        assert!(matches!(err, PersonRowError::UnknownDiscriminator { .. }));
    }

    #[test]
    fn full_name_is_last_name_first() {
        let mut instructor = row(INSTRUCTOR_DISCRIMINATOR);
        instructor.hire_date = NaiveDate::from_ymd_opt(2002, 7, 6);
        let person = Person::try_from(instructor).unwrap();

        assert_eq!(person.full_name(), "Alexander, Carson");
        assert_eq!(InstructorSummary::from(&person).full_name, "Alexander, Carson");
    }

    #[test]
    fn person_serializes_discriminator_inline() {
        let mut instructor = row(INSTRUCTOR_DISCRIMINATOR);
        instructor.hire_date = NaiveDate::from_ymd_opt(2002, 7, 6);
        let person = Person::try_from(instructor).unwrap();

        let value = serde_json::to_value(&person).unwrap();
        assert_eq!(value["discriminator"], "Instructor");
        assert_eq!(value["hire_date"], "2002-07-06");
        assert_eq!(value["last_name"], "Alexander");
    }
}
