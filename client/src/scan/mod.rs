//! Scan submission and progress tracking.

mod image;
mod tracker;
mod upload;
mod view;

pub use image::{mime_for_extension, ImageFile};
pub use tracker::{SaveAction, ScanTracker, SubmitOutcome, NOTHING_TO_SAVE, SAVE_SUCCEEDED};
pub use upload::{submit, UploadRequest};
pub use view::{Notice, NoticeKind, ScanPhase, ScanView};
