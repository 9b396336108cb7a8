pub mod course_assignments;
pub mod courses;
pub mod departments;
pub mod enrollments;
pub mod people;

use log::info;
use sqlx::migrate::{MigrateError, Migrator};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::config::Settings;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

pub async fn create_pool(settings: &Settings) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .connect(&settings.database_url)
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), MigrateError> {
    info!("Applying {} schema migrations", MIGRATOR.iter().count());
    MIGRATOR.run(pool).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::Executor;

    const INITIAL_SCHEMA: &str = include_str!("../../migrations/20170316000000_initial_schema.sql");
    const PERSON_INHERITANCE: &str =
        include_str!("../../migrations/20170420002710_person_inheritance.sql");
    const PERSON_ROW_VERSION: &str =
        include_str!("../../migrations/20170421000000_person_row_version.sql");

    #[test]
    fn migrations_are_embedded_in_order() {
        let versions: Vec<i64> = MIGRATOR.iter().map(|m| m.version).collect();
        assert_eq!(versions, vec![20170316000000, 20170420002710, 20170421000000]);
    }

    #[sqlx::test(migrations = false)]
    #[ignore = "requires a Postgres DATABASE_URL"]
    async fn person_merge_keeps_enrollments_pointing_at_the_same_students(pool: PgPool) {
        pool.execute(INITIAL_SCHEMA).await.unwrap();

        // Instructor and student ids overlap before the merge.
        pool.execute(
            "INSERT INTO instructor (last_name, first_mid_name, hire_date) VALUES \
                 ('Abercrombie', 'Kim', '1995-03-11'), ('Fakhouri', 'Fadi', '2002-07-06'); \
             INSERT INTO student (id, last_name, first_mid_name, enrollment_date) VALUES \
                 (1, 'Alexander', 'Carson', '2010-09-01'), (2, 'Alonso', 'Meredith', '2012-09-01'); \
             INSERT INTO department (name, budget, start_date, instructor_id) VALUES \
                 ('English', 350000, '2007-09-01', 1); \
             INSERT INTO course (course_id, title, credits, department_id) \
                 SELECT 2021, 'Composition', 3, department_id FROM department; \
             INSERT INTO enrollment (course_id, student_id, grade) VALUES (2021, 2, 'B'); \
             INSERT INTO course_assignment (instructor_id, course_id) VALUES (1, 2021);",
        )
        .await
        .unwrap();

        pool.execute(PERSON_INHERITANCE).await.unwrap();
        pool.execute(PERSON_ROW_VERSION).await.unwrap();

        let (last_name, discriminator): (String, String) = sqlx::query_as(
            "SELECT p.last_name, p.discriminator FROM enrollment e JOIN person p ON p.id = e.student_id",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(last_name, "Alonso");
        assert_eq!(discriminator, "Student");

        let instructors: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM person WHERE discriminator = 'Instructor'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(instructors, 2);

        let student_table: Option<String> =
            sqlx::query_scalar("SELECT to_regclass('student')::TEXT")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(student_table, None);

        let mut foreign_keys: Vec<String> = sqlx::query_scalar(
            "SELECT conname::TEXT FROM pg_constraint \
             WHERE contype = 'f' AND confrelid = 'person'::regclass",
        )
        .fetch_all(&pool)
        .await
        .unwrap();
        foreign_keys.sort();
        assert_eq!(
            foreign_keys,
            vec![
                "fk_course_assignment_person_instructor_id",
                "fk_department_person_instructor_id",
                "fk_enrollment_person_student_id",
                "fk_office_assignment_person_instructor_id",
            ]
        );

        // New rows get ids past the copied students.
        let next_id: i32 = sqlx::query_scalar(
            "INSERT INTO person (last_name, first_mid_name, hire_date) VALUES ('Zheng', 'Roger', '2004-02-12') RETURNING id",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert!(next_id > 4);
    }
}
