//! University timetable handling: the data model, the semester calendar, and
//! extraction of group schedules from timetable workbooks.

pub mod cache;
pub mod calendar;
pub mod cell_parser;
pub mod extractor;
pub mod model;
pub mod sheet;
pub mod source;

pub use cache::ScheduleCache;
pub use model::{EducationalActivity, Group, GroupSchedule};
pub use source::ScheduleSource;
