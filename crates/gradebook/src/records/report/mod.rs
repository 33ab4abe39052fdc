mod summary;
pub mod views;

pub use summary::summarize;
pub use views::{
    ClassificationPreview, GradePreview, HonoursCount, RecordsSummary, StudentStanding,
};
