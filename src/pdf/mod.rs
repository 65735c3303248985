pub mod merger;
pub mod page_range;

pub use merger::{
    combine, extract, merge, page_count, save_atomically, ExtractedPages, MergeSummary, PdfPart,
};
pub use page_range::{PageRange, PageSelection};
