pub mod input;
pub mod outputs;
pub mod result;
pub mod stage;
pub mod template;

pub use input::{InputError, Job, ParsedInput};
pub use result::JobResult;
pub use stage::{JobTrace, Stage};
pub use template::Resolution;
