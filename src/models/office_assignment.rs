use serde::{Deserialize, Serialize};

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct OfficeAssignment {
    pub instructor_id: i32,
    pub location: String,
}
