pub mod captcha_solver;
pub mod course_parser;
pub mod glyph_segmenter;
pub mod portal_page;
pub mod warn_notifier;

pub use captcha_solver::CaptchaSolver;
pub use course_parser::{parse_course_page, PageParse, RejectReason, RowRejection};
pub use glyph_segmenter::{GlyphSegmenter, GlyphTensor};
pub use warn_notifier::{NotifyOutcome, WarnNotifier};
