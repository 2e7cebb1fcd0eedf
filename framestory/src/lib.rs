pub mod app;
pub mod config;
pub mod extractor;
pub mod folder;
pub mod metadata;
pub mod output;
pub mod prompt;
pub mod story;

pub use config::Config;
pub use extractor::{Disposition, FrameError, FrameErrorKind, extract_frame_metadata};
pub use folder::{list_images, process_images_in_folder};
pub use metadata::{FrameMetadata, parse_or_fallback};
pub use output::{Event, StoryOutput, assemble_story, build_output_format, write_output};
pub use story::{generate_story, generate_title};
