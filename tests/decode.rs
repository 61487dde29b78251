#[path = "decode/errors.rs"]
mod errors;
#[path = "decode/resume.rs"]
mod resume;
