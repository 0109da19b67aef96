use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::db::repository;
use crate::error::CatalogError;
use crate::models::Course;

/// Source of course definitions. Courses are shared read-only between rounds.
#[async_trait]
pub trait CourseCatalog: Send + Sync {
    async fn get_course(&self, id: &str) -> Result<Arc<Course>, CatalogError>;
    async fn list_courses(&self) -> Result<Vec<Course>, CatalogError>;
    async fn add_course(&self, course: Course) -> Result<Course, CatalogError>;
}

/// Validates and orders a course before it enters any catalog.
fn prepare(mut course: Course) -> Result<Course, CatalogError> {
    course.normalize();
    course.validate().map_err(CatalogError::InvalidCourse)?;

    let hole_par = course.par_of_holes();
    if hole_par != course.par {
        warn!(
            "course {} declares par {} but its holes sum to {}",
            course.id, course.par, hole_par
        );
    }
    Ok(course)
}

/// Reads a JSON array of courses, e.g. the file named by `COURSES_FILE`.
pub fn load_courses_file(path: &Path) -> Result<Vec<Course>, CatalogError> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        CatalogError::InvalidCourse(format!("cannot read {}: {e}", path.display()))
    })?;
    serde_json::from_str(&raw).map_err(|e| {
        CatalogError::InvalidCourse(format!("cannot parse {}: {e}", path.display()))
    })
}

pub struct SqliteCatalog {
    db: SqlitePool,
}

impl SqliteCatalog {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn seed(&self, courses: Vec<Course>) -> Result<usize, CatalogError> {
        let mut count = 0;
        for course in courses {
            self.add_course(course).await?;
            count += 1;
        }
        info!("Seeded {} courses into catalog", count);
        Ok(count)
    }
}

#[async_trait]
impl CourseCatalog for SqliteCatalog {
    async fn get_course(&self, id: &str) -> Result<Arc<Course>, CatalogError> {
        repository::find_course_by_id(&self.db, id)
            .await?
            .map(Arc::new)
            .ok_or_else(|| CatalogError::CourseNotFound(id.to_string()))
    }

    async fn list_courses(&self) -> Result<Vec<Course>, CatalogError> {
        Ok(repository::fetch_courses(&self.db).await?)
    }

    async fn add_course(&self, course: Course) -> Result<Course, CatalogError> {
        let course = prepare(course)?;
        let mut tx = self.db.begin().await?;
        repository::insert_course(&mut tx, &course).await?;
        tx.commit().await?;
        Ok(course)
    }
}

/// In-memory catalog for tests and offline use.
#[derive(Default)]
pub struct StaticCatalog {
    courses: RwLock<BTreeMap<String, Arc<Course>>>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_courses(courses: Vec<Course>) -> Result<Self, CatalogError> {
        let catalog = Self::new();
        {
            let mut map = catalog
                .courses
                .write()
                .map_err(|_| CatalogError::Corrupt("catalog lock poisoned".to_string()))?;
            for course in courses {
                let course = prepare(course)?;
                map.insert(course.id.clone(), Arc::new(course));
            }
        }
        Ok(catalog)
    }
}

#[async_trait]
impl CourseCatalog for StaticCatalog {
    async fn get_course(&self, id: &str) -> Result<Arc<Course>, CatalogError> {
        let map = self
            .courses
            .read()
            .map_err(|_| CatalogError::Corrupt("catalog lock poisoned".to_string()))?;
        map.get(id)
            .cloned()
            .ok_or_else(|| CatalogError::CourseNotFound(id.to_string()))
    }

    async fn list_courses(&self) -> Result<Vec<Course>, CatalogError> {
        let map = self
            .courses
            .read()
            .map_err(|_| CatalogError::Corrupt("catalog lock poisoned".to_string()))?;
        Ok(map.values().map(|c| Course::clone(c)).collect())
    }

    async fn add_course(&self, course: Course) -> Result<Course, CatalogError> {
        let course = prepare(course)?;
        let mut map = self
            .courses
            .write()
            .map_err(|_| CatalogError::Corrupt("catalog lock poisoned".to_string()))?;
        map.insert(course.id.clone(), Arc::new(course.clone()));
        Ok(course)
    }
}
