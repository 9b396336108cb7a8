pub mod course;
pub mod course_assignment;
pub mod department;
pub mod enrollment;
pub mod instructor;
pub mod office_assignment;
pub mod person;
