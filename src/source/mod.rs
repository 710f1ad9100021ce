//! Program sources: the author's original text and its wrapped, runnable form

pub mod position;
pub mod wrap;

pub use position::PositionMapper;

/// Original and wrapped text of one program
#[derive(Debug, Clone)]
pub struct ProgramSource {
    pub original: String,
    pub wrapped: String,
    pub header_lines: usize,
}

impl ProgramSource {
    /// Wrap an author's function body
    pub fn from_body(body: &str, bindings_name: &str) -> Self {
        ProgramSource {
            original: body.to_string(),
            wrapped: wrap::wrap(body, bindings_name),
            header_lines: wrap::HEADER_LINES,
        }
    }

    pub fn mapper(&self) -> PositionMapper {
        PositionMapper::new(&self.wrapped, &self.original, self.header_lines)
    }
}
