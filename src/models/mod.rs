pub mod academic_year;
pub mod course;

pub use academic_year::{academic_year_label, validate_academic_year};
pub use course::{CourseChange, CourseRecord, YearSemester};
