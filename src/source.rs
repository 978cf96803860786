//! The data collaborator the reports pull records from.

use async_trait::async_trait;

use crate::error::SourceError;
use crate::filter::{filter_records, FilterSpec};
use crate::models::{
    AttendanceRecord, CourseDirectoryEntry, GradeRecord, ParticipationRecord,
    StudentDirectoryEntry, SubjectDirectoryEntry,
};

/// Record fetches may already be scoped by `spec`; callers still refine
/// the results with [`filter_records`].
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn fetch_grades(&self, spec: &FilterSpec) -> Result<Vec<GradeRecord>, SourceError>;

    async fn fetch_attendance(&self, spec: &FilterSpec)
        -> Result<Vec<AttendanceRecord>, SourceError>;

    async fn fetch_participation(
        &self,
        spec: &FilterSpec,
    ) -> Result<Vec<ParticipationRecord>, SourceError>;

    async fn fetch_courses(&self) -> Result<Vec<CourseDirectoryEntry>, SourceError>;

    async fn fetch_subjects(&self) -> Result<Vec<SubjectDirectoryEntry>, SourceError>;

    async fn fetch_students(&self) -> Result<Vec<StudentDirectoryEntry>, SourceError>;
}

#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    pub grades: Vec<GradeRecord>,
    pub attendance: Vec<AttendanceRecord>,
    pub participation: Vec<ParticipationRecord>,
    pub courses: Vec<CourseDirectoryEntry>,
    pub subjects: Vec<SubjectDirectoryEntry>,
    pub students: Vec<StudentDirectoryEntry>,
}

#[async_trait]
impl RecordSource for InMemorySource {
    async fn fetch_grades(&self, spec: &FilterSpec) -> Result<Vec<GradeRecord>, SourceError> {
        Ok(filter_records(&self.grades, spec))
    }

    async fn fetch_attendance(
        &self,
        spec: &FilterSpec,
    ) -> Result<Vec<AttendanceRecord>, SourceError> {
        Ok(filter_records(&self.attendance, spec))
    }

    async fn fetch_participation(
        &self,
        spec: &FilterSpec,
    ) -> Result<Vec<ParticipationRecord>, SourceError> {
        Ok(filter_records(&self.participation, spec))
    }

    async fn fetch_courses(&self) -> Result<Vec<CourseDirectoryEntry>, SourceError> {
        Ok(self.courses.clone())
    }

    async fn fetch_subjects(&self) -> Result<Vec<SubjectDirectoryEntry>, SourceError> {
        Ok(self.subjects.clone())
    }

    async fn fetch_students(&self) -> Result<Vec<StudentDirectoryEntry>, SourceError> {
        Ok(self.students.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_source_is_object_safe() {
        fn _takes_boxed(_: Box<dyn RecordSource>) {}
    }

    #[tokio::test]
    async fn in_memory_source_scopes_by_spec() {
        let source = InMemorySource {
            students: vec![StudentDirectoryEntry {
                id: "S1".to_string(),
                full_name: "Kiara Patel".to_string(),
            }],
            ..InMemorySource::default()
        };
        let spec = FilterSpec::for_student("S1");
        assert!(source.fetch_grades(&spec).await.unwrap().is_empty());
        assert_eq!(source.fetch_students().await.unwrap().len(), 1);
    }
}
